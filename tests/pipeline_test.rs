use anyhow::Result;
use catalog_etl::config::Config;
use catalog_etl::error::EtlError;
use catalog_etl::pipeline::orchestrator;
use catalog_etl::storage::{CatalogStore, InMemoryCatalog};
use std::collections::HashMap;
use std::io::Write;
use tempfile::NamedTempFile;

const HEADER: &str =
    "ProductID,ProductName,ProductBrand,Gender,Price (INR),Rating,NumImages,Description,PrimaryColor";

fn write_csv(rows: &[&str]) -> Result<NamedTempFile> {
    let mut file = NamedTempFile::new()?;
    writeln!(file, "{HEADER}")?;
    for row in rows {
        writeln!(file, "{row}")?;
    }
    Ok(file)
}

fn config_for(csv_path: &str) -> Config {
    let vars: HashMap<String, String> = [
        ("USERNAME", "etl"),
        ("PASSWORD", "secret"),
        ("HOST", "localhost"),
        ("PORT", "5432"),
        ("DATABASE", "catalog"),
        ("CSV_PATH", csv_path),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();

    Config::from_lookup(|k| vars.get(k).cloned()).expect("test config is complete")
}

#[tokio::test]
async fn full_run_loads_accepted_rows_and_reports_counters() -> Result<()> {
    let file = write_csv(&[
        "P1 , Shirt,Acme,Men,19.99,,2,Soft cotton shirt,Blue",
        ",Shoes,Acme,Men,49.99,4.1,3,Running shoes,White",
        "P3,Scarf,Acme,Women,9.99,3.5,1,Wool scarf,Red",
    ])?;
    let config = config_for(file.path().to_str().unwrap());
    let store = InMemoryCatalog::new();

    let summary = orchestrator::run(&config, &store).await?;

    assert_eq!(summary.rows_read, 3);
    assert_eq!(summary.accepted, 2);
    assert_eq!(summary.rejected, 1);
    assert_eq!(summary.inserted, 2);
    assert_eq!(store.count_products().await?, 2);
    Ok(())
}

#[tokio::test]
async fn rerunning_the_same_csv_is_idempotent() -> Result<()> {
    let file = write_csv(&[
        "P1,Shirt,Acme,Men,19.99,4.0,2,Soft cotton shirt,Blue",
        "P2,Scarf,Acme,Women,9.99,3.5,1,Wool scarf,Red",
    ])?;
    let config = config_for(file.path().to_str().unwrap());
    let store = InMemoryCatalog::new();

    let first = orchestrator::run(&config, &store).await?;
    let second = orchestrator::run(&config, &store).await?;

    assert_eq!(first.inserted, 2);
    assert_eq!(second.inserted, 2);
    // Upsert-on-conflict: two runs, still two rows.
    assert_eq!(store.count_products().await?, 2);
    Ok(())
}

#[tokio::test]
async fn in_run_duplicate_ids_insert_once() -> Result<()> {
    let file = write_csv(&[
        "P1,Shirt,Acme,Men,19.99,4.0,2,First,Blue",
        "P1,Shirt again,Acme,Men,21.99,4.0,2,Repeat,Blue",
        "P2,Scarf,Acme,Women,9.99,3.5,1,Wool scarf,Red",
    ])?;
    let config = config_for(file.path().to_str().unwrap());
    let store = InMemoryCatalog::new();

    let summary = orchestrator::run(&config, &store).await?;

    assert_eq!(summary.accepted, 2);
    assert_eq!(summary.duplicates, 1);
    assert_eq!(store.count_products().await?, 2);
    Ok(())
}

#[tokio::test]
async fn malformed_row_is_skipped_and_the_rest_loads() -> Result<()> {
    let file = write_csv(&[
        "P1,Shirt,Acme,Men,19.99,4.0,2,Soft cotton shirt,Blue",
        "P2,broken,row,with,too,many,fields,entirely,oops,extra,columns",
        "P3,Scarf,Acme,Women,9.99,3.5,1,Wool scarf,Red",
    ])?;
    let config = config_for(file.path().to_str().unwrap());
    let store = InMemoryCatalog::new();

    let summary = orchestrator::run(&config, &store).await?;

    assert_eq!(summary.rows_read, 3);
    assert_eq!(summary.malformed, 1);
    assert_eq!(summary.accepted, 2);
    assert_eq!(store.count_products().await?, 2);
    Ok(())
}

#[tokio::test]
async fn missing_input_file_fails_the_run() {
    let config = config_for("/definitely/not/here/products.csv");
    let store = InMemoryCatalog::new();

    let err = orchestrator::run(&config, &store).await.unwrap_err();
    assert!(matches!(err, EtlError::InputFile { .. }), "got: {err}");
    assert_eq!(err.exit_code(), 3);
}

#[tokio::test]
async fn missing_required_header_fails_before_reading_rows() -> Result<()> {
    let mut file = NamedTempFile::new()?;
    writeln!(file, "ProductName,Price (INR)")?;
    writeln!(file, "Shirt,19.99")?;
    let config = config_for(file.path().to_str().unwrap());
    let store = InMemoryCatalog::new();

    let err = orchestrator::run(&config, &store).await.unwrap_err();
    assert!(matches!(err, EtlError::Config(_)), "got: {err}");
    assert_eq!(err.exit_code(), 2);
    Ok(())
}

#[tokio::test]
async fn dry_run_reports_counters_without_a_store() -> Result<()> {
    let file = write_csv(&[
        "P1,Shirt,Acme,Men,19.99,4.0,2,Soft cotton shirt,Blue",
        ",Shoes,Acme,Men,49.99,4.1,3,No id here,White",
    ])?;
    let config = config_for(file.path().to_str().unwrap());

    let summary = orchestrator::dry_run(&config)?;

    assert_eq!(summary.rows_read, 2);
    assert_eq!(summary.accepted, 1);
    assert_eq!(summary.rejected, 1);
    assert_eq!(summary.inserted, 0);
    Ok(())
}

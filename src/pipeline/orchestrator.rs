use crate::config::Config;
use crate::domain::{Product, RunSummary};
use crate::error::Result;
use crate::pipeline::extract::CsvExtractor;
use crate::pipeline::load::Loader;
use crate::pipeline::transform;
use crate::storage::CatalogStore;
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// The full pipeline: extract, transform, categorize, load. Short-circuits on
/// the first fatal failure; per-row problems only move counters.
pub async fn run(config: &Config, store: &dyn CatalogStore) -> Result<RunSummary> {
    let (mut summary, mut accepted) = extract_and_transform(config)?;
    transform::categorize_prices(&mut accepted);

    summary.inserted = Loader::new(store).load(&accepted).await?;
    Ok(summary)
}

/// Extract + transform only. Validates configuration, headers and every row,
/// and reports the same counters as a real run without touching a database.
pub fn dry_run(config: &Config) -> Result<RunSummary> {
    let (summary, mut accepted) = extract_and_transform(config)?;
    transform::categorize_prices(&mut accepted);
    Ok(summary)
}

fn extract_and_transform(config: &Config) -> Result<(RunSummary, Vec<Product>)> {
    let mut summary = RunSummary::default();
    let mut accepted: Vec<Product> = Vec::new();
    let mut seen_ids: HashSet<String> = HashSet::new();

    let extractor = CsvExtractor::new(&config.csv_path);
    for item in extractor.open(transform::REQUIRED_COLUMNS)? {
        summary.rows_read += 1;

        let raw = match item {
            Ok(raw) => raw,
            Err(e) => {
                // Skip-and-continue policy for structurally broken rows.
                summary.malformed += 1;
                warn!("Skipping malformed row: {e}");
                continue;
            }
        };

        match transform::normalize(&raw) {
            Ok(product) => {
                if !seen_ids.insert(product.product_id.clone()) {
                    summary.duplicates += 1;
                    debug!(line = raw.line, product_id = %product.product_id, "Skipping in-run duplicate");
                    continue;
                }
                summary.accepted += 1;
                accepted.push(product);
            }
            Err(reason) => {
                summary.rejected += 1;
                debug!(line = raw.line, "Rejected record: {reason}");
            }
        }
    }

    info!(
        rows_read = summary.rows_read,
        malformed = summary.malformed,
        accepted = summary.accepted,
        rejected = summary.rejected,
        duplicates = summary.duplicates,
        "Transform complete"
    );

    Ok((summary, accepted))
}

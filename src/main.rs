use catalog_etl::config::Config;
use catalog_etl::domain::RunSummary;
use catalog_etl::error::Result;
use catalog_etl::logging;
use catalog_etl::pipeline::orchestrator;
use catalog_etl::storage::postgres::{PostgresCatalog, RetryPolicy};
use clap::{Parser, Subcommand};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "catalog_etl")]
#[command(about = "Batch ETL: product catalog CSV into the catalog database")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full extract-transform-load pipeline
    Run,
    /// Extract and transform only; print counters without touching the database
    Check,
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    let guard = logging::init_logging();

    let cli = Cli::parse();
    // A container run with no arguments means a full pipeline run.
    let command = cli.command.unwrap_or(Commands::Run);

    if let Err(e) = execute(command).await {
        error!("Run failed: {e}");
        eprintln!("❌ {e}");
        let code = e.exit_code();
        drop(guard);
        std::process::exit(code);
    }
}

async fn execute(command: Commands) -> Result<()> {
    let config = Config::from_env()?;

    match command {
        Commands::Run => {
            println!("🔄 Running catalog ETL...");
            info!(
                csv = %config.csv_path.display(),
                target_db = %config.db.display_target(),
                "Starting pipeline"
            );
            let store = PostgresCatalog::connect(&config.db, &RetryPolicy::default()).await?;
            let summary = orchestrator::run(&config, &store).await?;
            print_summary(&summary, true);
            println!("✅ ETL completed successfully");
        }
        Commands::Check => {
            println!("🔎 Checking catalog CSV (no database writes)...");
            let summary = orchestrator::dry_run(&config)?;
            print_summary(&summary, false);
            println!("✅ Check completed");
        }
    }
    Ok(())
}

fn print_summary(summary: &RunSummary, loaded: bool) {
    println!("\n📊 Run summary:");
    println!("   Rows read:          {}", summary.rows_read);
    println!("   Malformed, skipped: {}", summary.malformed);
    println!("   Accepted:           {}", summary.accepted);
    println!("   Rejected:           {}", summary.rejected);
    println!("   Duplicates skipped: {}", summary.duplicates);
    if loaded {
        println!("   Rows written:       {}", summary.inserted);
    }
}

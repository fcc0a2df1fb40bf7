use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pulse_adapters::default_adapters;
use pulse_storage::{EventStore, MemoryStore, PageFetcher, PgStore};
use pulse_sync::{cleanup_old_events, Orchestrator, Scheduler, SyncConfig};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "pulse-cli")]
#[command(about = "Sydney Event Pulse command-line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run one sync pass, optionally restricted to a single source
    Sync { source: Option<String> },
    /// Run the recurring scrape + cleanup schedule in the foreground
    Schedule,
    /// Delete old inactive events past the retention cutoff
    Cleanup {
        #[arg(long)]
        days: Option<i64>,
    },
    /// Create the events schema if it does not exist
    Migrate,
}

async fn build_store(config: &SyncConfig) -> Result<Arc<dyn EventStore>> {
    if std::env::var("PULSE_STORE").as_deref() == Ok("memory") {
        return Ok(Arc::new(MemoryStore::new()));
    }
    let store = PgStore::connect(&config.database_url)
        .await
        .context("connecting to postgres")?;
    store.ensure_schema().await.context("preparing events schema")?;
    Ok(Arc::new(store))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = SyncConfig::from_env();

    match cli.command.unwrap_or(Commands::Sync { source: None }) {
        Commands::Sync { source } => {
            let store = build_store(&config).await?;
            let fetcher = PageFetcher::new(config.fetcher_config())?;
            let orchestrator = Orchestrator::new(default_adapters(), store, fetcher);

            let stats = match source {
                Some(name) => orchestrator.run_one(&name).await?,
                None => orchestrator.run_all().await?,
            };
            println!(
                "sync complete: scraped={} created={} updated={} unchanged={} inactive={} errors={}",
                stats.total_scraped,
                stats.created,
                stats.updated,
                stats.unchanged,
                stats.inactive,
                stats.errors
            );
        }
        Commands::Schedule => {
            let store = build_store(&config).await?;
            let fetcher = PageFetcher::new(config.fetcher_config())?;
            let orchestrator =
                Arc::new(Orchestrator::new(default_adapters(), store.clone(), fetcher));

            let mut scheduler = Scheduler::new(orchestrator, store, config);
            scheduler.start_all().await?;

            tokio::signal::ctrl_c().await.context("waiting for ctrl-c")?;
            scheduler.stop_all().await?;
        }
        Commands::Cleanup { days } => {
            let store = build_store(&config).await?;
            let deleted =
                cleanup_old_events(store.as_ref(), days.unwrap_or(config.cleanup_days_old)).await?;
            println!("cleanup complete: deleted={deleted}");
        }
        Commands::Migrate => {
            let store = PgStore::connect(&config.database_url)
                .await
                .context("connecting to postgres")?;
            store.ensure_schema().await.context("preparing events schema")?;
            println!("events schema ready");
        }
    }

    Ok(())
}

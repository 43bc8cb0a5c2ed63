//! Print the project dashboard as JSON.
//!
//! Required environment variables:
//! - DATABASE_URL
//!
//! Optional:
//! - STATS_DB_MAX_CONNECTIONS (defaults to 5)
//! - STATS_QUERY_TIMEOUT_SECS (defaults to 5)
//! - STATS_RETRY_ATTEMPTS (defaults to 3)
//! - STATS_MAX_CONCURRENT_READS (defaults to 16)

use anyhow::{Context, Result};
use l10n_stats::{config::Config, Aggregator, Dashboard, PgSource};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (ignored in production)
    let _ = dotenvy::dotenv();

    // Logs go to stderr so stdout stays valid JSON
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("l10n_stats=info".parse()?),
        )
        .init();

    let config = Config::from_env()?;

    info!("Connecting to project database");
    let source = PgSource::connect(&config.database_url, config.pg_options())
        .await
        .context("Failed to connect to project database")?;

    let aggregator =
        Aggregator::new(source.clone()).with_concurrency(config.max_concurrent_reads);

    let dashboard = Dashboard::from_catalog(&source, &aggregator)
        .await
        .context("Failed to build project dashboard")?;

    for (metric, winner) in dashboard.top.iter() {
        match winner {
            Some(project) => info!("{}: {} ({})", metric, project.name, project.link()),
            None => info!("{}: no projects", metric),
        }
    }

    println!("{}", serde_json::to_string_pretty(&dashboard)?);
    Ok(())
}

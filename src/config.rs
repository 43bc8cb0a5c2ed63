use anyhow::{Context, Result};
use std::time::Duration;

use crate::aggregate::Aggregator;
use crate::retry::RetryConfig;
use crate::source::PgSourceOptions;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    // Database
    pub database_url: String,
    pub db_max_connections: u32,
    pub query_timeout_secs: u64,
    pub retry_attempts: u32,

    // Aggregation
    pub max_concurrent_reads: usize,
}

/// Parse an optional numeric variable, falling back to `default`.
fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            database_url: std::env::var("DATABASE_URL").context("DATABASE_URL not set")?,
            db_max_connections: env_or("STATS_DB_MAX_CONNECTIONS", 5u32).max(1),
            query_timeout_secs: env_or("STATS_QUERY_TIMEOUT_SECS", 5u64).max(1),
            retry_attempts: env_or("STATS_RETRY_ATTEMPTS", 3u32).max(1),
            max_concurrent_reads: env_or(
                "STATS_MAX_CONCURRENT_READS",
                Aggregator::DEFAULT_CONCURRENCY,
            )
            .max(1),
        })
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }

    pub fn pg_options(&self) -> PgSourceOptions {
        let defaults = RetryConfig::database_read();
        PgSourceOptions {
            max_connections: self.db_max_connections,
            query_timeout: self.query_timeout(),
            retry: RetryConfig::new(self.retry_attempts, defaults.initial_delay)
                .with_max_delay(defaults.max_delay),
        }
    }
}

//! Translation progress statistics for a localization dashboard.
//!
//! For a set of projects the crate reads per-project string counters,
//! sums them into a combined total, and picks the leading project for each
//! leaderboard metric.
//!
//! # Architecture
//!
//! - `model`: projects and their counters
//! - `source`: read-only catalog and count collaborators (memory, PostgreSQL)
//! - `aggregate`: per-project stats and combined totals
//! - `ranking`: top project per metric with a deterministic tie-break
//! - `dashboard`: aggregation and ranking in one call for the presentation layer
//!
//! # Example
//!
//! ```rust,ignore
//! use l10n_stats::{Aggregator, Dashboard, MemorySource};
//!
//! let source = MemorySource::new().with_project(project, counts);
//! let aggregator = Aggregator::new(source.clone());
//! let dashboard = Dashboard::from_catalog(&source, &aggregator).await?;
//! ```

pub mod aggregate;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod model;
pub mod ranking;
pub mod retry;
pub mod source;

pub use aggregate::{Aggregation, Aggregator};
pub use dashboard::{Dashboard, DashboardRow};
pub use error::{DataSourceError, InvalidStatsError, ModelError, StatsError};
pub use model::{CombinedStats, Project, ProjectId, ProjectStats, ProjectStatsEntry, RawCounts};
pub use ranking::{select_top, Metric, RankingResult};
pub use source::{CountSource, MemorySource, PgSource, PgSourceOptions, ProjectCatalog};

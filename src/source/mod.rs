//! Read-only collaborators that feed the aggregator.
//!
//! - `memory`: in-process catalog and counts, for fixtures and embedding
//! - `postgres`: PostgreSQL-backed catalog and counts via sqlx
//!
//! The aggregator only ever reads through [`CountSource`]; where the
//! numbers live is up to the implementation.

mod memory;
mod postgres;

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::DataSourceError;
use crate::model::{Project, ProjectId, RawCounts};

pub use memory::MemorySource;
pub use postgres::{PgSource, PgSourceOptions};

/// Supplies the ordered project set for a dashboard scope.
#[async_trait]
pub trait ProjectCatalog: Send + Sync {
    async fn projects(&self) -> Result<Vec<Project>, DataSourceError>;
}

/// Supplies raw string counters keyed by project identifier.
#[async_trait]
pub trait CountSource: Send + Sync {
    /// Counters for one project.
    ///
    /// `Ok(None)` means the source has no record of the project, which the
    /// aggregator treats as all zeros.
    async fn counts(&self, project: ProjectId) -> Result<Option<RawCounts>, DataSourceError>;
}

/// Shared count source handle.
pub type SharedCountSource = Arc<dyn CountSource>;


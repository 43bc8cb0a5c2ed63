//! Error types for statistics aggregation and ranking.
//!
//! Aggregation failures come from the count source and abort the whole
//! call. Ranking failures mean the caller handed over statistics that break
//! the counter invariants.

use std::time::Duration;
use thiserror::Error;

use crate::model::ProjectId;

/// A read against a project catalog or count source failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DataSourceError {
    /// The backing store could not be reached.
    #[error("data source unavailable: {message}")]
    Unavailable { message: String },

    /// The store was reached but rejected the read (bad SQL, missing
    /// relation, misconfiguration).
    #[error("data source rejected query: {message}")]
    Query { message: String },

    /// The read did not finish within the configured bound.
    #[error("data source read timed out after {after:?}")]
    Timeout { after: Duration },

    /// The source returned data that cannot be turned into valid statistics.
    #[error("malformed data for project {project}: {reason}")]
    Malformed { project: ProjectId, reason: String },

    /// Summing the per-project counters exceeded `u64`.
    #[error("combined {field} count overflows")]
    Overflow { field: &'static str },
}

impl DataSourceError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    pub fn query(message: impl Into<String>) -> Self {
        Self::Query {
            message: message.into(),
        }
    }

    pub fn malformed(project: ProjectId, reason: impl Into<String>) -> Self {
        Self::Malformed {
            project,
            reason: reason.into(),
        }
    }

    /// Whether a retry could plausibly succeed.
    ///
    /// Rejected queries, malformed data and overflowing totals fail the
    /// same way on the next read.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable { .. } | Self::Timeout { .. })
    }
}

/// Statistics passed to the ranking selector violate the counter invariants.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid stats for project '{slug}': {reason}")]
pub struct InvalidStatsError {
    pub slug: String,
    pub reason: String,
}

/// A project record failed validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("invalid project slug '{0}': expected lowercase letters, digits and single '-', '_' or '.' separators")]
    InvalidSlug(String),
}

/// Any failure while building a dashboard.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StatsError {
    #[error(transparent)]
    DataSource(#[from] DataSourceError),

    #[error(transparent)]
    InvalidStats(#[from] InvalidStatsError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DataSourceError::unavailable("connection refused");
        assert_eq!(
            err.to_string(),
            "data source unavailable: connection refused"
        );

        let err = DataSourceError::malformed(ProjectId::new(7), "negative total");
        assert_eq!(err.to_string(), "malformed data for project 7: negative total");

        let err = InvalidStatsError {
            slug: "firefox".to_string(),
            reason: "counters exceed total".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "invalid stats for project 'firefox': counters exceed total"
        );
    }

    #[test]
    fn test_is_transient() {
        assert!(DataSourceError::unavailable("down").is_transient());
        assert!(DataSourceError::Timeout {
            after: Duration::from_secs(5)
        }
        .is_transient());
        assert!(!DataSourceError::malformed(ProjectId::new(1), "bad").is_transient());
        assert!(!DataSourceError::query("relation does not exist").is_transient());
        assert!(!DataSourceError::Overflow { field: "total" }.is_transient());
    }

    #[test]
    fn test_overflow_display() {
        let err = DataSourceError::Overflow { field: "translated" };
        assert_eq!(err.to_string(), "combined translated count overflows");
    }

    #[test]
    fn test_stats_error_from() {
        let err: StatsError = DataSourceError::unavailable("down").into();
        assert!(matches!(err, StatsError::DataSource(_)));
        assert_eq!(err.to_string(), "data source unavailable: down");

        let err: StatsError = InvalidStatsError {
            slug: "a".to_string(),
            reason: "r".to_string(),
        }
        .into();
        assert!(matches!(err, StatsError::InvalidStats(_)));
    }
}

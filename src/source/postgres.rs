use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info};

use super::{CountSource, ProjectCatalog};
use crate::error::DataSourceError;
use crate::model::{Project, ProjectId, RawCounts};
use crate::retry::{with_retry_if, RetryConfig};

const PROJECTS_QUERY: &str = "SELECT id, slug, name, latest_activity FROM projects ORDER BY slug";

const COUNTS_QUERY: &str = "SELECT total, translated, unreviewed, missing \
     FROM project_string_counts \
     WHERE project_id = $1";

/// Connection and read settings for [`PgSource`].
#[derive(Debug, Clone, PartialEq)]
pub struct PgSourceOptions {
    pub max_connections: u32,
    /// Upper bound for a single query, including waiting for a connection
    pub query_timeout: Duration,
    pub retry: RetryConfig,
}

impl Default for PgSourceOptions {
    fn default() -> Self {
        Self {
            max_connections: 5,
            query_timeout: Duration::from_secs(5),
            retry: RetryConfig::database_read(),
        }
    }
}

/// Project catalog and string counts stored in PostgreSQL.
///
/// Reads `projects(id, slug, name, latest_activity)` and
/// `project_string_counts(project_id, total, translated, unreviewed, missing)`.
/// Transient failures are retried here, never in the aggregator.
#[derive(Clone)]
pub struct PgSource {
    pool: PgPool,
    options: PgSourceOptions,
}

impl PgSource {
    /// Open a connection pool against `database_url`.
    pub async fn connect(
        database_url: &str,
        options: PgSourceOptions,
    ) -> Result<Self, DataSourceError> {
        let pool = PgPoolOptions::new()
            .max_connections(options.max_connections)
            .acquire_timeout(options.query_timeout)
            .connect(database_url)
            .await
            .map_err(map_sqlx_error)?;

        info!(
            "Connected to PostgreSQL (max {} connections)",
            options.max_connections
        );

        Ok(Self::from_pool(pool, options))
    }

    /// Wrap an existing pool.
    pub fn from_pool(pool: PgPool, options: PgSourceOptions) -> Self {
        Self { pool, options }
    }

    /// Run one read with the configured timeout and retry policy.
    async fn read<T, F, Fut>(&self, operation_name: &str, mut query: F) -> Result<T, DataSourceError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, DataSourceError>>,
    {
        let limit = self.options.query_timeout;
        with_retry_if(
            &self.options.retry,
            operation_name,
            || {
                let attempt = query();
                async move {
                    tokio::time::timeout(limit, attempt)
                        .await
                        .unwrap_or(Err(DataSourceError::Timeout { after: limit }))
                }
            },
            DataSourceError::is_transient,
        )
        .await
    }
}

/// Classify a query-level failure.
///
/// Connection trouble is `Unavailable` and gets retried; anything the
/// server or driver rejected outright is `Query` and does not.
fn map_sqlx_error(err: sqlx::Error) -> DataSourceError {
    match err {
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::Protocol(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => DataSourceError::unavailable(err.to_string()),
        _ => DataSourceError::query(err.to_string()),
    }
}

/// Classify a failure to read a column from a row belonging to `project`.
fn map_row_error(project: ProjectId, err: sqlx::Error) -> DataSourceError {
    match err {
        sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::ColumnIndexOutOfBounds { .. } => {
            DataSourceError::malformed(project, err.to_string())
        }
        _ => map_sqlx_error(err),
    }
}

fn row_to_project(row: &PgRow) -> Result<Project, DataSourceError> {
    // Without a readable id the row cannot be attributed to a project
    let id: i64 = row.try_get("id").map_err(map_sqlx_error)?;
    let id = ProjectId::new(id);

    let slug: String = row.try_get("slug").map_err(|e| map_row_error(id, e))?;
    let name: String = row.try_get("name").map_err(|e| map_row_error(id, e))?;
    let latest_activity: Option<DateTime<Utc>> = row
        .try_get("latest_activity")
        .map_err(|e| map_row_error(id, e))?;

    Project::new(id, slug, name, latest_activity)
        .map_err(|e| DataSourceError::malformed(id, e.to_string()))
}

fn row_to_counts(project: ProjectId, row: &PgRow) -> Result<RawCounts, DataSourceError> {
    let column = |name: &str| -> Result<i64, DataSourceError> {
        row.try_get(name).map_err(|e| map_row_error(project, e))
    };

    Ok(RawCounts {
        total: column("total")?,
        translated: column("translated")?,
        unreviewed: column("unreviewed")?,
        missing: column("missing")?,
    })
}

#[async_trait]
impl ProjectCatalog for PgSource {
    async fn projects(&self) -> Result<Vec<Project>, DataSourceError> {
        let pool = &self.pool;
        let rows = self
            .read("list projects", move || async move {
                sqlx::query(PROJECTS_QUERY)
                    .fetch_all(pool)
                    .await
                    .map_err(map_sqlx_error)
            })
            .await?;

        debug!("Loaded {} projects from catalog", rows.len());
        rows.iter().map(row_to_project).collect()
    }
}

#[async_trait]
impl CountSource for PgSource {
    async fn counts(&self, project: ProjectId) -> Result<Option<RawCounts>, DataSourceError> {
        let pool = &self.pool;
        let row = self
            .read("project counts", move || async move {
                sqlx::query(COUNTS_QUERY)
                    .bind(project.get())
                    .fetch_optional(pool)
                    .await
                    .map_err(map_sqlx_error)
            })
            .await?;

        row.as_ref()
            .map(|row| row_to_counts(project, row))
            .transpose()
    }
}

//! Everything the project listing page renders, built in one call.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::aggregate::Aggregator;
use crate::error::StatsError;
use crate::model::{CombinedStats, Project, ProjectStats, ProjectStatsEntry};
use crate::ranking::{select_top, RankingResult};
use crate::source::ProjectCatalog;

/// One project row of the listing, with the derived progress figures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardRow {
    pub project: Project,
    pub stats: ProjectStats,
    pub completion_percent: f64,
    /// Strings neither translated, suggested nor flagged missing
    pub untouched: u64,
}

impl From<ProjectStatsEntry> for DashboardRow {
    fn from(entry: ProjectStatsEntry) -> Self {
        Self {
            completion_percent: entry.stats.completion_percent(),
            untouched: entry.stats.untouched(),
            project: entry.project,
            stats: entry.stats,
        }
    }
}

/// Per-project stats, combined stats and leaderboard for one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dashboard {
    /// Catalog order
    pub projects: Vec<DashboardRow>,
    pub combined: CombinedStats,
    pub completion_percent: f64,
    pub top: RankingResult,
    pub generated_at: DateTime<Utc>,
}

impl Dashboard {
    /// Aggregate `projects` and rank the result.
    pub async fn build(aggregator: &Aggregator, projects: &[Project]) -> Result<Self, StatsError> {
        let aggregation = aggregator.aggregate(projects).await?;
        let top = select_top(&aggregation.per_project)?;

        info!(
            "Built dashboard for {} projects ({} of {} strings translated)",
            aggregation.len(),
            aggregation.combined.translated,
            aggregation.combined.total
        );

        Ok(Self {
            projects: aggregation
                .per_project
                .into_iter()
                .map(DashboardRow::from)
                .collect(),
            completion_percent: aggregation.combined.completion_percent(),
            combined: aggregation.combined,
            top,
            generated_at: Utc::now(),
        })
    }

    /// Load the project set from `catalog`, then build.
    pub async fn from_catalog(
        catalog: &dyn ProjectCatalog,
        aggregator: &Aggregator,
    ) -> Result<Self, StatsError> {
        let projects = catalog.projects().await?;
        Self::build(aggregator, &projects).await
    }

    /// Entries with the most recently active project first; projects
    /// without activity go last, ties keep catalog order.
    pub fn sorted_by_activity(&self) -> Vec<&DashboardRow> {
        let mut entries: Vec<&DashboardRow> = self.projects.iter().collect();
        entries.sort_by(|a, b| b.project.latest_activity.cmp(&a.project.latest_activity));
        entries
    }
}

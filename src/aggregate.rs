//! Per-project statistics and their combined total.
//!
//! Counts are read concurrently, but every read has finished before the
//! combined total is summed, so `combined` always equals the sum of the
//! returned per-project rows. One failed read, or a combined counter that
//! no longer fits in `u64`, fails the whole call.

use futures::stream::{self, StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::DataSourceError;
use crate::model::{CombinedStats, Project, ProjectId, ProjectStats, ProjectStatsEntry};
use crate::source::{CountSource, SharedCountSource};

/// Result of one aggregation call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Aggregation {
    /// One entry per distinct input project, in input order
    pub per_project: Vec<ProjectStatsEntry>,
    pub combined: CombinedStats,
}

impl Aggregation {
    pub fn stats_for(&self, project: ProjectId) -> Option<&ProjectStats> {
        self.per_project
            .iter()
            .find(|entry| entry.project.id == project)
            .map(|entry| &entry.stats)
    }

    pub fn len(&self) -> usize {
        self.per_project.len()
    }

    pub fn is_empty(&self) -> bool {
        self.per_project.is_empty()
    }
}

/// Reads counts for a project set and sums them.
#[derive(Clone)]
pub struct Aggregator {
    source: SharedCountSource,
    concurrency: usize,
}

impl Aggregator {
    pub const DEFAULT_CONCURRENCY: usize = 16;

    pub fn new<S: CountSource + 'static>(source: S) -> Self {
        Self::from_shared(Arc::new(source))
    }

    pub fn from_shared(source: SharedCountSource) -> Self {
        Self {
            source,
            concurrency: Self::DEFAULT_CONCURRENCY,
        }
    }

    /// Limit the number of reads in flight at once (at least 1).
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Compute stats for every project and the combined total.
    ///
    /// Projects without recorded counts get all-zero stats. A repeated
    /// project identifier is only counted once.
    pub async fn aggregate(&self, projects: &[Project]) -> Result<Aggregation, DataSourceError> {
        let mut seen = HashSet::with_capacity(projects.len());
        let unique: Vec<&Project> = projects
            .iter()
            .filter(|project| {
                let first = seen.insert(project.id);
                if !first {
                    warn!(
                        "Project {} ({}) listed more than once, counting it once",
                        project.id, project.slug
                    );
                }
                first
            })
            .collect();

        let reads: Vec<_> = unique
            .into_iter()
            .map(|project| self.read_stats(project))
            .collect();
        let per_project: Vec<ProjectStatsEntry> = stream::iter(reads)
            .buffered(self.concurrency)
            .try_collect()
            .await?;

        let combined = per_project
            .iter()
            .try_fold(CombinedStats::default(), |acc, entry| acc.checked_add(&entry.stats))
            .map_err(|field| DataSourceError::Overflow { field })?;

        debug!(
            "Aggregated {} projects: total={} translated={} unreviewed={} missing={}",
            per_project.len(),
            combined.total,
            combined.translated,
            combined.unreviewed,
            combined.missing
        );

        Ok(Aggregation {
            per_project,
            combined,
        })
    }

    async fn read_stats(&self, project: &Project) -> Result<ProjectStatsEntry, DataSourceError> {
        let stats = match self.source.counts(project.id).await? {
            Some(raw) => raw.into_stats(project.id)?,
            None => ProjectStats::default(),
        };

        Ok(ProjectStatsEntry {
            project: project.clone(),
            stats,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RawCounts;
    use crate::source::MemorySource;
    use async_trait::async_trait;
    use proptest::prelude::*;
    use std::time::Duration;

    fn project(id: i64, slug: &str) -> Project {
        Project::new(ProjectId::new(id), slug, slug.to_uppercase(), None).unwrap()
    }

    fn two_project_source() -> MemorySource {
        MemorySource::new()
            .with_project(project(1, "a"), RawCounts::new(100, 80, 5, 15))
            .with_project(project(2, "b"), RawCounts::new(50, 10, 30, 10))
    }

    // ==================== Basic Aggregation ====================

    #[tokio::test]
    async fn test_two_project_scenario() {
        let aggregator = Aggregator::new(two_project_source());
        let projects = vec![project(1, "a"), project(2, "b")];

        let result = aggregator.aggregate(&projects).await.unwrap();

        assert_eq!(result.combined, ProjectStats::new(150, 90, 35, 25));
        assert_eq!(
            result.stats_for(ProjectId::new(1)),
            Some(&ProjectStats::new(100, 80, 5, 15))
        );
        assert_eq!(
            result.stats_for(ProjectId::new(2)),
            Some(&ProjectStats::new(50, 10, 30, 10))
        );
    }

    #[tokio::test]
    async fn test_empty_project_set() {
        let aggregator = Aggregator::new(two_project_source());

        let result = aggregator.aggregate(&[]).await.unwrap();

        assert!(result.is_empty());
        assert_eq!(result.combined, ProjectStats::default());
    }

    #[tokio::test]
    async fn test_project_without_counts_is_zero() {
        let aggregator = Aggregator::new(two_project_source());
        let projects = vec![project(1, "a"), project(3, "fresh")];

        let result = aggregator.aggregate(&projects).await.unwrap();

        assert_eq!(result.len(), 2);
        assert_eq!(
            result.stats_for(ProjectId::new(3)),
            Some(&ProjectStats::default())
        );
        assert_eq!(result.combined, ProjectStats::new(100, 80, 5, 15));
    }

    #[tokio::test]
    async fn test_preserves_input_order() {
        let aggregator = Aggregator::new(two_project_source());
        let projects = vec![project(2, "b"), project(1, "a")];

        let result = aggregator.aggregate(&projects).await.unwrap();

        let slugs: Vec<_> = result
            .per_project
            .iter()
            .map(|entry| entry.project.slug.as_str())
            .collect();
        assert_eq!(slugs, vec!["b", "a"]);
    }

    #[tokio::test]
    async fn test_duplicate_projects_counted_once() {
        let aggregator = Aggregator::new(two_project_source());
        let projects = vec![project(1, "a"), project(2, "b"), project(1, "a")];

        let result = aggregator.aggregate(&projects).await.unwrap();

        assert_eq!(result.len(), 2);
        assert_eq!(result.combined, ProjectStats::new(150, 90, 35, 25));
    }

    // ==================== Failure Handling ====================

    #[tokio::test]
    async fn test_unreachable_source_fails_whole_call() {
        let aggregator = Aggregator::new(two_project_source().unreachable("connection refused"));
        let projects = vec![project(1, "a"), project(2, "b")];

        let err = aggregator.aggregate(&projects).await.unwrap_err();

        assert_eq!(err, DataSourceError::unavailable("connection refused"));
    }

    #[tokio::test]
    async fn test_single_failed_read_fails_whole_call() {
        let source = two_project_source()
            .with_failing_project(ProjectId::new(2), DataSourceError::unavailable("shard down"));
        let aggregator = Aggregator::new(source);
        let projects = vec![project(1, "a"), project(2, "b")];

        let err = aggregator.aggregate(&projects).await.unwrap_err();

        assert_eq!(err, DataSourceError::unavailable("shard down"));
    }

    #[tokio::test]
    async fn test_malformed_counts_fail_whole_call() {
        let source = two_project_source()
            .with_project(project(3, "broken"), RawCounts::new(10, -4, 0, 0));
        let aggregator = Aggregator::new(source);
        let projects = vec![project(1, "a"), project(3, "broken")];

        let err = aggregator.aggregate(&projects).await.unwrap_err();

        assert!(matches!(
            err,
            DataSourceError::Malformed { project, .. } if project == ProjectId::new(3)
        ));
    }

    #[tokio::test]
    async fn test_combined_overflow_fails_whole_call() {
        let mut source = MemorySource::new();
        let mut projects = Vec::new();
        for id in 1..=3 {
            let p = project(id, &format!("huge-{}", id));
            source = source.with_project(p.clone(), RawCounts::new(i64::MAX, 0, 0, 0));
            projects.push(p);
        }

        let err = Aggregator::new(source)
            .aggregate(&projects)
            .await
            .unwrap_err();

        assert_eq!(err, DataSourceError::Overflow { field: "total" });
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn test_two_max_projects_still_fit() {
        let source = MemorySource::new()
            .with_project(project(1, "a"), RawCounts::new(i64::MAX, i64::MAX, 0, 0))
            .with_project(project(2, "b"), RawCounts::new(i64::MAX, i64::MAX, 0, 0));
        let projects = vec![project(1, "a"), project(2, "b")];

        let result = Aggregator::new(source).aggregate(&projects).await.unwrap();

        let expected = (i64::MAX as u64) * 2;
        assert_eq!(result.combined, ProjectStats::new(expected, expected, 0, 0));
    }

    // ==================== Concurrency ====================

    /// Answers slower for lower ids so reads complete out of order.
    struct SlowSource;

    #[async_trait]
    impl CountSource for SlowSource {
        async fn counts(&self, project: ProjectId) -> Result<Option<RawCounts>, DataSourceError> {
            let id = project.get();
            tokio::time::sleep(Duration::from_millis((10 - id as u64) * 5)).await;
            Ok(Some(RawCounts::new(id * 10, id, id, id)))
        }
    }

    #[tokio::test]
    async fn test_concurrent_reads_complete_before_combining() {
        let projects: Vec<Project> = (1..=9)
            .map(|id| project(id, &format!("p{}", id)))
            .collect();

        let result = Aggregator::new(SlowSource)
            .with_concurrency(9)
            .aggregate(&projects)
            .await
            .unwrap();

        assert_eq!(result.len(), 9);
        assert_eq!(result.per_project[0].project.slug, "p1");
        assert_eq!(result.combined, ProjectStats::new(450, 45, 45, 45));
    }

    #[test]
    fn test_concurrency_is_at_least_one() {
        let aggregator = Aggregator::new(MemorySource::new()).with_concurrency(0);
        assert_eq!(aggregator.concurrency(), 1);
        assert_eq!(
            Aggregator::new(MemorySource::new()).concurrency(),
            Aggregator::DEFAULT_CONCURRENCY
        );
    }

    // ==================== Properties ====================

    fn counts_strategy() -> impl Strategy<Value = RawCounts> {
        (0i64..1_000, 0i64..1_000, 0i64..1_000, 0i64..1_000).prop_map(
            |(translated, unreviewed, missing, untouched)| {
                RawCounts::new(
                    translated + unreviewed + missing + untouched,
                    translated,
                    unreviewed,
                    missing,
                )
            },
        )
    }

    proptest! {
        #[test]
        fn prop_combined_is_field_wise_sum(
            counts in prop::collection::vec(prop::option::of(counts_strategy()), 0..20),
            concurrency in 1usize..8,
        ) {
            let mut source = MemorySource::new();
            let mut projects = Vec::new();
            for (i, count) in counts.iter().enumerate() {
                let p = project(i as i64, &format!("p{}", i));
                source = match count {
                    Some(raw) => source.with_project(p.clone(), *raw),
                    None => source.with_uncounted_project(p.clone()),
                };
                projects.push(p);
            }

            let aggregator = Aggregator::new(source).with_concurrency(concurrency);
            let result = tokio_test::block_on(aggregator.aggregate(&projects)).unwrap();

            prop_assert_eq!(result.len(), projects.len());

            let mut expected = ProjectStats::default();
            for entry in &result.per_project {
                let stats = entry.stats;
                prop_assert!(stats.translated + stats.unreviewed + stats.missing <= stats.total);
                expected.total += stats.total;
                expected.translated += stats.translated;
                expected.unreviewed += stats.unreviewed;
                expected.missing += stats.missing;
            }
            prop_assert_eq!(result.combined, expected);
        }
    }
}

use async_trait::async_trait;
use std::collections::HashMap;

use super::{CountSource, ProjectCatalog};
use crate::error::DataSourceError;
use crate::model::{Project, ProjectId, RawCounts};

/// Catalog and counts held in memory.
///
/// Projects are returned in insertion order. A source can be marked
/// unreachable to exercise failure paths.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    projects: Vec<Project>,
    counts: HashMap<ProjectId, RawCounts>,
    failing: HashMap<ProjectId, DataSourceError>,
    unreachable: Option<String>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a project together with its counters.
    pub fn with_project(mut self, project: Project, counts: RawCounts) -> Self {
        self.counts.insert(project.id, counts);
        self.projects.push(project);
        self
    }

    /// Add a project the count store has never heard of.
    pub fn with_uncounted_project(mut self, project: Project) -> Self {
        self.projects.push(project);
        self
    }

    /// Make every read for `project` fail with `error`.
    pub fn with_failing_project(mut self, project: ProjectId, error: DataSourceError) -> Self {
        self.failing.insert(project, error);
        self
    }

    /// Make every read fail as if the store were down.
    pub fn unreachable(mut self, message: impl Into<String>) -> Self {
        self.unreachable = Some(message.into());
        self
    }

    fn check_reachable(&self) -> Result<(), DataSourceError> {
        match &self.unreachable {
            Some(message) => Err(DataSourceError::unavailable(message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ProjectCatalog for MemorySource {
    async fn projects(&self) -> Result<Vec<Project>, DataSourceError> {
        self.check_reachable()?;
        Ok(self.projects.clone())
    }
}

#[async_trait]
impl CountSource for MemorySource {
    async fn counts(&self, project: ProjectId) -> Result<Option<RawCounts>, DataSourceError> {
        self.check_reachable()?;
        if let Some(err) = self.failing.get(&project) {
            return Err(err.clone());
        }
        Ok(self.counts.get(&project).copied())
    }
}

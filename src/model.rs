//! Project records and the translation-progress counters derived for them.

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

use crate::error::{DataSourceError, ModelError};

/// Lowercase URL-safe slug: alphanumeric runs joined by single separators.
static SLUG_PATTERN: OnceLock<Regex> = OnceLock::new();

fn slug_pattern() -> &'static Regex {
    SLUG_PATTERN.get_or_init(|| {
        Regex::new(r"^[a-z0-9]+(?:[-_.][a-z0-9]+)*$").expect("slug pattern is a valid regex")
    })
}

/// Stable identifier of a project in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(i64);

impl ProjectId {
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A translatable project as supplied by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub slug: String,
    pub name: String,
    /// `None` until the project sees its first translation activity
    pub latest_activity: Option<DateTime<Utc>>,
}

impl Project {
    /// Create a project, rejecting slugs that are not URL-safe.
    pub fn new(
        id: ProjectId,
        slug: impl Into<String>,
        name: impl Into<String>,
        latest_activity: Option<DateTime<Utc>>,
    ) -> Result<Self, ModelError> {
        let slug = slug.into();
        if !slug_pattern().is_match(&slug) {
            return Err(ModelError::InvalidSlug(slug));
        }

        Ok(Self {
            id,
            slug,
            name: name.into(),
            latest_activity,
        })
    }

    /// Dashboard path of the project page.
    pub fn link(&self) -> String {
        format!("/projects/{}/", self.slug)
    }
}

/// Counters exactly as a count source stores them.
///
/// Stores hand back signed integers, so nothing here is trusted until
/// [`RawCounts::into_stats`] has checked it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawCounts {
    pub total: i64,
    pub translated: i64,
    pub unreviewed: i64,
    pub missing: i64,
}

impl RawCounts {
    pub const fn new(total: i64, translated: i64, unreviewed: i64, missing: i64) -> Self {
        Self {
            total,
            translated,
            unreviewed,
            missing,
        }
    }

    /// Validate the counters read for `project`.
    pub fn into_stats(self, project: ProjectId) -> Result<ProjectStats, DataSourceError> {
        let field = |name: &str, value: i64| {
            u64::try_from(value).map_err(|_| {
                DataSourceError::malformed(project, format!("negative {} count ({})", name, value))
            })
        };

        let stats = ProjectStats {
            total: field("total", self.total)?,
            translated: field("translated", self.translated)?,
            unreviewed: field("unreviewed", self.unreviewed)?,
            missing: field("missing", self.missing)?,
        };

        stats
            .validate()
            .map_err(|reason| DataSourceError::malformed(project, reason))?;

        Ok(stats)
    }
}

/// Translation progress of one project.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProjectStats {
    /// All strings in scope for translation
    pub total: u64,
    pub translated: u64,
    /// Suggestions awaiting review
    pub unreviewed: u64,
    pub missing: u64,
}

/// Field-wise sum of [`ProjectStats`] over a project set.
pub type CombinedStats = ProjectStats;

impl ProjectStats {
    pub const fn new(total: u64, translated: u64, unreviewed: u64, missing: u64) -> Self {
        Self {
            total,
            translated,
            unreviewed,
            missing,
        }
    }

    /// Check `translated + unreviewed + missing <= total`.
    pub fn validate(&self) -> Result<(), String> {
        let flagged = self
            .translated
            .checked_add(self.unreviewed)
            .and_then(|sum| sum.checked_add(self.missing));

        match flagged {
            Some(flagged) if flagged <= self.total => Ok(()),
            Some(flagged) => Err(format!(
                "translated + unreviewed + missing ({}) exceeds total ({})",
                flagged, self.total
            )),
            None => Err("counter sum overflows".to_string()),
        }
    }

    /// Strings that are neither translated, suggested, nor flagged missing.
    pub fn untouched(&self) -> u64 {
        self.total
            .saturating_sub(self.translated)
            .saturating_sub(self.unreviewed)
            .saturating_sub(self.missing)
    }

    /// Translated share of all strings, 0 for an empty project.
    pub fn completion_percent(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        (self.translated as f64 / self.total as f64) * 100.0
    }

    /// Field-wise sum, or the name of the first counter that overflows.
    pub fn checked_add(&self, other: &ProjectStats) -> Result<ProjectStats, &'static str> {
        let add = |field: &'static str, a: u64, b: u64| a.checked_add(b).ok_or(field);

        Ok(ProjectStats {
            total: add("total", self.total, other.total)?,
            translated: add("translated", self.translated, other.translated)?,
            unreviewed: add("unreviewed", self.unreviewed, other.unreviewed)?,
            missing: add("missing", self.missing, other.missing)?,
        })
    }
}

/// One row of the project → stats mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectStatsEntry {
    pub project: Project,
    pub stats: ProjectStats,
}

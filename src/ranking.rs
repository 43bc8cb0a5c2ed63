//! Leaderboard selection: the top project for each dashboard metric.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;

use crate::error::InvalidStatsError;
use crate::model::{Project, ProjectStats, ProjectStatsEntry};

/// The fixed set of leaderboard metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// Most translated strings
    MostTranslations,
    /// Most suggestions awaiting review
    MostSuggestions,
    /// Most missing strings
    MostMissing,
    /// Most strings enabled for translation
    MostStrings,
}

impl Metric {
    pub const ALL: [Metric; 4] = [
        Metric::MostTranslations,
        Metric::MostSuggestions,
        Metric::MostMissing,
        Metric::MostStrings,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Metric::MostTranslations => "most_translations",
            Metric::MostSuggestions => "most_suggestions",
            Metric::MostMissing => "most_missing",
            Metric::MostStrings => "most_strings",
        }
    }

    /// The counter this metric ranks by.
    pub fn counter(self, stats: &ProjectStats) -> u64 {
        match self {
            Metric::MostTranslations => stats.translated,
            Metric::MostSuggestions => stats.unreviewed,
            Metric::MostMissing => stats.missing,
            Metric::MostStrings => stats.total,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Winning project per metric, `None` when there was nothing to rank.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankingResult {
    pub most_translations: Option<Project>,
    pub most_suggestions: Option<Project>,
    pub most_missing: Option<Project>,
    pub most_strings: Option<Project>,
}

impl RankingResult {
    pub fn get(&self, metric: Metric) -> Option<&Project> {
        match metric {
            Metric::MostTranslations => self.most_translations.as_ref(),
            Metric::MostSuggestions => self.most_suggestions.as_ref(),
            Metric::MostMissing => self.most_missing.as_ref(),
            Metric::MostStrings => self.most_strings.as_ref(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Metric, Option<&Project>)> + '_ {
        Metric::ALL.into_iter().map(move |metric| (metric, self.get(metric)))
    }

    /// True when no metric has a winner.
    pub fn is_empty(&self) -> bool {
        self.iter().all(|(_, winner)| winner.is_none())
    }
}

/// Higher counter wins; on a tie the smaller slug (then smaller id) wins.
fn rank(metric: Metric, a: &ProjectStatsEntry, b: &ProjectStatsEntry) -> Ordering {
    metric
        .counter(&a.stats)
        .cmp(&metric.counter(&b.stats))
        .then_with(|| b.project.slug.cmp(&a.project.slug))
        .then_with(|| b.project.id.cmp(&a.project.id))
}

/// Pick the top project for every metric.
///
/// The result depends only on the entries, not on their order. Entries
/// whose counters break `translated + unreviewed + missing <= total`, or
/// that repeat a project id, are rejected before anything is ranked.
pub fn select_top(entries: &[ProjectStatsEntry]) -> Result<RankingResult, InvalidStatsError> {
    let mut seen = HashSet::with_capacity(entries.len());
    for entry in entries {
        entry
            .stats
            .validate()
            .map_err(|reason| InvalidStatsError {
                slug: entry.project.slug.clone(),
                reason,
            })?;

        if !seen.insert(entry.project.id) {
            return Err(InvalidStatsError {
                slug: entry.project.slug.clone(),
                reason: format!("project id {} appears more than once", entry.project.id),
            });
        }
    }

    let winner = |metric: Metric| {
        entries
            .iter()
            .max_by(|a, b| rank(metric, a, b))
            .map(|entry| entry.project.clone())
    };

    Ok(RankingResult {
        most_translations: winner(Metric::MostTranslations),
        most_suggestions: winner(Metric::MostSuggestions),
        most_missing: winner(Metric::MostMissing),
        most_strings: winner(Metric::MostStrings),
    })
}

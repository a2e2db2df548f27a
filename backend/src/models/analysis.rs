//! Repository analysis model
//!
//! The aggregate produced from one fetch run, and the frozen insights
//! snapshot that is stored with each story.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::github::{ContributorRecord, LanguageBreakdown, RepositoryMetadata};

/// Total commit count together with where it came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "provenance", content = "value", rename_all = "lowercase")]
pub enum CommitCount {
    /// Sum of GitHub's weekly commit-activity buckets
    Authoritative(u64),
    /// Derived from repository age because GitHub returned no buckets
    Estimated(u64),
}

impl CommitCount {
    pub fn value(&self) -> u64 {
        match self {
            Self::Authoritative(n) | Self::Estimated(n) => *n,
        }
    }

    pub fn is_estimated(&self) -> bool {
        matches!(self, Self::Estimated(_))
    }
}

/// Lifetime of a repository, from creation to last push
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timespan {
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    /// Whole days between the two, never negative
    pub duration_days: i64,
}

/// Normalized analysis of one repository
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryAnalysis {
    /// URL as submitted by the user
    pub url: String,
    pub metadata: RepositoryMetadata,
    pub contributors: Vec<ContributorRecord>,
    pub languages: LanguageBreakdown,
    pub commits: CommitCount,
    pub timespan: Timespan,
    pub top_languages: Vec<String>,
    pub formatted_timespan: String,
}

/// Statistics captured when a story is generated. Never recomputed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryInsights {
    pub total_commits: u64,
    #[serde(default)]
    pub commits_estimated: bool,
    pub contributors: usize,
    pub top_languages: Vec<String>,
    pub timespan: String,
    #[serde(default)]
    pub stars: u64,
    #[serde(default)]
    pub forks: u64,
}

impl StoryInsights {
    pub fn from_analysis(analysis: &RepositoryAnalysis) -> Self {
        Self {
            total_commits: analysis.commits.value(),
            commits_estimated: analysis.commits.is_estimated(),
            contributors: analysis.contributors.len(),
            top_languages: analysis.top_languages.clone(),
            timespan: analysis.formatted_timespan.clone(),
            stars: analysis.metadata.stargazers_count,
            forks: analysis.metadata.forks_count,
        }
    }
}

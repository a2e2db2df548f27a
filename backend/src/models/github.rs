//! GitHub API payloads
//!
//! Shapes returned by the GitHub REST API, trimmed to the fields the
//! analysis uses. Field names follow the upstream JSON.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Owner and name parsed out of a repository URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepoRef {
    pub owner: String,
    pub repo: String,
}

impl RepoRef {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
        }
    }

    /// API path prefix, `/repos/{owner}/{repo}`
    pub fn api_path(&self) -> String {
        format!("/repos/{}/{}", self.owner, self.repo)
    }
}

/// Account that owns a repository
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryOwner {
    pub login: String,
}

/// Repository metadata from `GET /repos/{owner}/{repo}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryMetadata {
    pub id: u64,
    pub name: String,
    pub full_name: String,
    pub owner: RepositoryOwner,
    pub html_url: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub stargazers_count: u64,
    #[serde(default)]
    pub forks_count: u64,
    #[serde(default)]
    pub open_issues_count: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub pushed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub private: bool,
    #[serde(default)]
    pub default_branch: Option<String>,
}

/// Entry from `GET /repos/{owner}/{repo}/contributors`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContributorRecord {
    pub login: String,
    pub contributions: u64,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(rename = "type", default)]
    pub account_type: Option<String>,
}

/// Language name to byte count, from `GET /repos/{owner}/{repo}/languages`
pub type LanguageBreakdown = BTreeMap<String, u64>;

/// Weekly bucket from `GET /repos/{owner}/{repo}/stats/commit_activity`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitActivityWeek {
    /// Unix timestamp of the start of the week
    pub week: i64,
    pub total: u64,
    #[serde(default)]
    pub days: Vec<u64>,
}

/// Everything the fetcher gathered for one repository.
///
/// Only `metadata` is guaranteed; the rest degrade to empty values when
/// their calls fail.
#[derive(Debug, Clone)]
pub struct RawRepositoryData {
    pub metadata: RepositoryMetadata,
    pub contributors: Vec<ContributorRecord>,
    pub languages: LanguageBreakdown,
    /// `None` when GitHub had no commit statistics to give
    pub commit_activity: Option<Vec<CommitActivityWeek>>,
}

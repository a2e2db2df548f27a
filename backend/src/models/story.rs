//! Story and stored repository models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::analysis::StoryInsights;

/// Repository row, owned by exactly one user
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct StoredRepository {
    pub repo_id: String,
    pub owner_id: String,
    pub url: String,
    pub full_name: String,
    pub description: Option<String>,
    pub language: Option<String>,
    pub stars: i64,
    pub forks: i64,
    pub created_at: DateTime<Utc>,
}

/// Story row
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredStory {
    pub story_id: String,
    pub owner_id: String,
    pub repository_id: Option<String>,
    pub title: String,
    pub content: String,
    pub insights: StoryInsights,
    pub created_at: DateTime<Utc>,
}

/// Story with its repository resolved
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryWithRepository {
    #[serde(flatten)]
    pub story: StoredStory,
    pub repository: Option<StoredRepository>,
}

/// Values for a story insert
#[derive(Debug, Clone)]
pub struct NewStory {
    pub repository_id: Option<String>,
    pub title: String,
    pub content: String,
    pub insights: StoryInsights,
}

/// Request payload carrying a repository URL
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryUrlRequest {
    pub url: String,
}

/// Document format for story export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Markdown,
    Text,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Markdown => "md",
            Self::Text => "txt",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Markdown => "text/markdown; charset=utf-8",
            Self::Text => "text/plain; charset=utf-8",
        }
    }
}

/// Query string for the export endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct ExportQuery {
    #[serde(default)]
    pub format: ExportFormat,
}

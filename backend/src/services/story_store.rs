//! Story persistence
//!
//! Owner-scoped storage for analyzed repositories and generated stories.
//! Every operation takes the caller's `UserContext`; rows belonging to
//! other users are never visible.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    NewStory, RepositoryAnalysis, StoredRepository, StoredStory, StoryInsights,
    StoryWithRepository,
};
use crate::services::auth::UserContext;

/// Errors that can occur during story persistence
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Repository not found: {0}")]
    RepositoryNotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Storage for repositories and stories
#[async_trait]
pub trait StoryStore: Send + Sync {
    /// Return the id of the user's repository row for `analysis.url`,
    /// inserting it first if the user has none. Repeated calls for the same
    /// user and URL always yield the same id.
    async fn find_or_create_repository(
        &self,
        user: &UserContext,
        analysis: &RepositoryAnalysis,
    ) -> Result<String, StoreError>;

    async fn insert_story(
        &self,
        user: &UserContext,
        story: NewStory,
    ) -> Result<StoredStory, StoreError>;

    /// Newest first, with repositories resolved
    async fn list_stories(&self, user: &UserContext)
    -> Result<Vec<StoryWithRepository>, StoreError>;

    async fn get_story(
        &self,
        user: &UserContext,
        story_id: &str,
    ) -> Result<Option<StoryWithRepository>, StoreError>;

    /// Newest first
    async fn list_repositories(
        &self,
        user: &UserContext,
    ) -> Result<Vec<StoredRepository>, StoreError>;
}

/// Story row joined with its (optional) repository
#[derive(Debug, FromRow)]
struct StoryRow {
    story_id: String,
    owner_id: String,
    repository_id: Option<String>,
    title: String,
    content: String,
    insights: Json<StoryInsights>,
    created_at: DateTime<Utc>,
    r_repo_id: Option<String>,
    r_owner_id: Option<String>,
    r_url: Option<String>,
    r_full_name: Option<String>,
    r_description: Option<String>,
    r_language: Option<String>,
    r_stars: Option<i64>,
    r_forks: Option<i64>,
    r_created_at: Option<DateTime<Utc>>,
}

impl From<StoryRow> for StoryWithRepository {
    fn from(row: StoryRow) -> Self {
        let repository = match (row.r_repo_id, row.r_owner_id, row.r_url, row.r_full_name) {
            (Some(repo_id), Some(owner_id), Some(url), Some(full_name)) => Some(StoredRepository {
                repo_id,
                owner_id,
                url,
                full_name,
                description: row.r_description,
                language: row.r_language,
                stars: row.r_stars.unwrap_or_default(),
                forks: row.r_forks.unwrap_or_default(),
                created_at: row.r_created_at.unwrap_or(row.created_at),
            }),
            _ => None,
        };

        StoryWithRepository {
            story: StoredStory {
                story_id: row.story_id,
                owner_id: row.owner_id,
                repository_id: row.repository_id,
                title: row.title,
                content: row.content,
                insights: row.insights.0,
                created_at: row.created_at,
            },
            repository,
        }
    }
}

const STORY_SELECT: &str = r#"
    SELECT
        s.story_id, s.owner_id, s.repository_id, s.title, s.content, s.insights, s.created_at,
        r.repo_id AS r_repo_id,
        r.owner_id AS r_owner_id,
        r.url AS r_url,
        r.full_name AS r_full_name,
        r.description AS r_description,
        r.language AS r_language,
        r.stars AS r_stars,
        r.forks AS r_forks,
        r.created_at AS r_created_at
    FROM stories s
    LEFT JOIN repositories r ON r.repo_id = s.repository_id
"#;

/// `StoryStore` on PostgreSQL
#[derive(Debug, Clone)]
pub struct PgStoryStore {
    pool: PgPool,
}

impl PgStoryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StoryStore for PgStoryStore {
    async fn find_or_create_repository(
        &self,
        user: &UserContext,
        analysis: &RepositoryAnalysis,
    ) -> Result<String, StoreError> {
        let meta = &analysis.metadata;

        // Single statement so concurrent submissions cannot both insert
        let repo_id: String = sqlx::query_scalar(
            r#"
            INSERT INTO repositories
                (repo_id, owner_id, url, full_name, description, language, stars, forks, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (owner_id, url) DO UPDATE SET url = EXCLUDED.url
            RETURNING repo_id
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&user.user_id)
        .bind(&analysis.url)
        .bind(&meta.full_name)
        .bind(&meta.description)
        .bind(&meta.language)
        .bind(meta.stargazers_count as i64)
        .bind(meta.forks_count as i64)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(repo_id)
    }

    async fn insert_story(
        &self,
        user: &UserContext,
        story: NewStory,
    ) -> Result<StoredStory, StoreError> {
        if let Some(ref repo_id) = story.repository_id {
            let owned: Option<String> = sqlx::query_scalar(
                "SELECT repo_id FROM repositories WHERE repo_id = $1 AND owner_id = $2",
            )
            .bind(repo_id)
            .bind(&user.user_id)
            .fetch_optional(&self.pool)
            .await?;

            if owned.is_none() {
                return Err(StoreError::RepositoryNotFound(repo_id.clone()));
            }
        }

        let stored = StoredStory {
            story_id: Uuid::new_v4().to_string(),
            owner_id: user.user_id.clone(),
            repository_id: story.repository_id,
            title: story.title,
            content: story.content,
            insights: story.insights,
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO stories
                (story_id, owner_id, repository_id, title, content, insights, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(&stored.story_id)
        .bind(&stored.owner_id)
        .bind(&stored.repository_id)
        .bind(&stored.title)
        .bind(&stored.content)
        .bind(Json(&stored.insights))
        .bind(stored.created_at)
        .execute(&self.pool)
        .await?;

        Ok(stored)
    }

    async fn list_stories(
        &self,
        user: &UserContext,
    ) -> Result<Vec<StoryWithRepository>, StoreError> {
        let query = format!("{STORY_SELECT} WHERE s.owner_id = $1 ORDER BY s.created_at DESC");
        let rows: Vec<StoryRow> = sqlx::query_as(&query)
            .bind(&user.user_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn get_story(
        &self,
        user: &UserContext,
        story_id: &str,
    ) -> Result<Option<StoryWithRepository>, StoreError> {
        let query = format!("{STORY_SELECT} WHERE s.story_id = $1 AND s.owner_id = $2");
        let row: Option<StoryRow> = sqlx::query_as(&query)
            .bind(story_id)
            .bind(&user.user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Into::into))
    }

    async fn list_repositories(
        &self,
        user: &UserContext,
    ) -> Result<Vec<StoredRepository>, StoreError> {
        let repositories = sqlx::query_as::<_, StoredRepository>(
            r#"
            SELECT repo_id, owner_id, url, full_name, description, language, stars, forks, created_at
            FROM repositories
            WHERE owner_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(&user.user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(repositories)
    }
}

//! Story Service
//!
//! Drives one story request end to end: fetch the repository, aggregate
//! the analysis, generate the narrative, then persist the repository and
//! the story. Any failure before the final insert leaves no story behind.

use std::sync::Arc;

use thiserror::Error;
use tracing::{error, info};

use crate::models::{
    ExportFormat, NewStory, RepositoryAnalysis, StoredRepository, StoryInsights,
    StoryWithRepository,
};
use crate::services::auth::UserContext;
use crate::services::export::{ExportDocument, export_story};
use crate::services::github::{FetchError, GitHubFetcher};
use crate::services::insights::aggregate;
use crate::services::narrative::{
    GenerationError, NarrativeGenerator, build_prompt, story_title,
};
use crate::services::story_store::{StoreError, StoryStore};

/// Errors that can occur while producing or reading stories
#[derive(Debug, Error)]
pub enum StoryError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Story not found: {0}")]
    StoryNotFound(String),
}

/// Service for generating and retrieving repository stories
#[derive(Clone)]
pub struct StoryService {
    fetcher: GitHubFetcher,
    generator: Arc<dyn NarrativeGenerator>,
    store: Arc<dyn StoryStore>,
    max_tokens: u32,
}

impl StoryService {
    pub fn new(
        fetcher: GitHubFetcher,
        generator: Arc<dyn NarrativeGenerator>,
        store: Arc<dyn StoryStore>,
        max_tokens: u32,
    ) -> Self {
        Self {
            fetcher,
            generator,
            store,
            max_tokens,
        }
    }

    /// Fetch and aggregate without generating or persisting anything
    pub async fn analyze(&self, url: &str) -> Result<RepositoryAnalysis, StoryError> {
        let url = url.trim();
        let raw = self.fetcher.fetch(url).await?;
        Ok(aggregate(url, raw))
    }

    /// Analyze the repository at `url`, generate its story and store both
    pub async fn create_story(
        &self,
        user: &UserContext,
        url: &str,
    ) -> Result<StoryWithRepository, StoryError> {
        let result = self.run_pipeline(user, url).await;
        if let Err(ref e) = result {
            error!(user_id = %user.user_id, url = %url, error = %e, "Story generation aborted");
        }
        result
    }

    async fn run_pipeline(
        &self,
        user: &UserContext,
        url: &str,
    ) -> Result<StoryWithRepository, StoryError> {
        let analysis = self.analyze(url).await?;
        info!(
            user_id = %user.user_id,
            repository = %analysis.metadata.full_name,
            commits = analysis.commits.value(),
            commits_estimated = analysis.commits.is_estimated(),
            contributors = analysis.contributors.len(),
            "Repository analyzed"
        );

        let prompt = build_prompt(&analysis);
        let content = self.generator.generate(&prompt, self.max_tokens).await?;
        info!(
            user_id = %user.user_id,
            chars = content.len(),
            "Story text generated"
        );

        let repository_id = self
            .store
            .find_or_create_repository(user, &analysis)
            .await?;

        let story = self
            .store
            .insert_story(
                user,
                NewStory {
                    repository_id: Some(repository_id),
                    title: story_title(&analysis),
                    content,
                    insights: StoryInsights::from_analysis(&analysis),
                },
            )
            .await?;
        info!(user_id = %user.user_id, story_id = %story.story_id, "Story saved");

        self.get_story(user, &story.story_id).await
    }

    pub async fn list_stories(
        &self,
        user: &UserContext,
    ) -> Result<Vec<StoryWithRepository>, StoryError> {
        Ok(self.store.list_stories(user).await?)
    }

    pub async fn get_story(
        &self,
        user: &UserContext,
        story_id: &str,
    ) -> Result<StoryWithRepository, StoryError> {
        self.store
            .get_story(user, story_id)
            .await?
            .ok_or_else(|| StoryError::StoryNotFound(story_id.to_string()))
    }

    pub async fn export_story(
        &self,
        user: &UserContext,
        story_id: &str,
        format: ExportFormat,
    ) -> Result<ExportDocument, StoryError> {
        let story = self.get_story(user, story_id).await?;
        Ok(export_story(&story, format))
    }

    pub async fn list_repositories(
        &self,
        user: &UserContext,
    ) -> Result<Vec<StoredRepository>, StoryError> {
        Ok(self.store.list_repositories(user).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{
        CannedGenerator, InMemoryStoryStore, StaticFetch, TEST_API_BASE, github_fixture,
        story_service,
    };

    const URL: &str = "https://github.com/octo/demo";

    #[actix_rt::test]
    async fn test_create_story_persists_repository_and_story() {
        let store = Arc::new(InMemoryStoryStore::new());
        let generator = Arc::new(CannedGenerator::new("Once upon a time."));
        let service = story_service(github_fixture("octo", "demo"), generator.clone(), store.clone());
        let user = UserContext::new("user-1");

        let story = service.create_story(&user, URL).await.unwrap();

        assert_eq!(story.story.title, "The Story of octo/demo");
        assert_eq!(story.story.content, "Once upon a time.");
        assert_eq!(story.story.owner_id, "user-1");
        let repository = story.repository.expect("repository joined");
        assert_eq!(repository.url, URL);
        assert_eq!(repository.full_name, "octo/demo");

        assert_eq!(story.story.insights.total_commits, 8);
        assert!(!story.story.insights.commits_estimated);
        assert_eq!(story.story.insights.contributors, 2);
        assert_eq!(story.story.insights.top_languages, vec!["Rust", "Shell"]);

        let prompts = generator.prompts();
        assert_eq!(prompts.len(), 1);
        assert_eq!(prompts[0].1, 1200);
        assert_eq!(store.repository_count(), 1);
        assert_eq!(store.story_count(), 1);
    }

    #[actix_rt::test]
    async fn test_not_found_creates_nothing() {
        let store = Arc::new(InMemoryStoryStore::new());
        let generator = Arc::new(CannedGenerator::new("unused"));
        let http = StaticFetch::new().with_response(
            &format!("{TEST_API_BASE}/repos/octo/gone"),
            404,
            r#"{"message":"Not Found"}"#,
        );
        let service = story_service(http, generator.clone(), store.clone());

        let result = service
            .create_story(&UserContext::new("user-1"), "https://github.com/octo/gone")
            .await;

        assert!(matches!(result, Err(StoryError::Fetch(FetchError::NotFound(_)))));
        assert!(generator.prompts().is_empty());
        assert_eq!(store.repository_count(), 0);
        assert_eq!(store.story_count(), 0);
    }

    #[actix_rt::test]
    async fn test_invalid_url_creates_nothing() {
        let store = Arc::new(InMemoryStoryStore::new());
        let http = StaticFetch::new();
        let service = story_service(http, Arc::new(CannedGenerator::new("unused")), store.clone());

        let result = service
            .create_story(&UserContext::new("user-1"), "ftp:/nowhere")
            .await;

        assert!(matches!(
            result,
            Err(StoryError::Fetch(FetchError::InvalidInput(_)))
        ));
        assert_eq!(store.repository_count(), 0);
    }

    #[actix_rt::test]
    async fn test_contributor_failure_records_zero_contributors() {
        let store = Arc::new(InMemoryStoryStore::new());
        let http = github_fixture("octo", "demo").with_response(
            &format!("{TEST_API_BASE}/repos/octo/demo/contributors?per_page=30"),
            500,
            "boom",
        );
        let service = story_service(http, Arc::new(CannedGenerator::new("Story")), store.clone());

        let story = service
            .create_story(&UserContext::new("user-1"), URL)
            .await
            .unwrap();

        assert_eq!(story.story.insights.contributors, 0);
        assert_eq!(store.story_count(), 1);
    }

    #[actix_rt::test]
    async fn test_missing_commit_stats_are_estimated() {
        let store = Arc::new(InMemoryStoryStore::new());
        let http = github_fixture("octo", "demo").with_response(
            &format!("{TEST_API_BASE}/repos/octo/demo/stats/commit_activity"),
            202,
            "{}",
        );
        let service = story_service(http, Arc::new(CannedGenerator::new("Story")), store);

        let story = service
            .create_story(&UserContext::new("user-1"), URL)
            .await
            .unwrap();

        // 400 days old: ceil(400 / 7) * 2 = 116
        assert_eq!(story.story.insights.total_commits, 116);
        assert!(story.story.insights.commits_estimated);
    }

    #[actix_rt::test]
    async fn test_generation_failure_saves_nothing() {
        let store = Arc::new(InMemoryStoryStore::new());
        let service = story_service(
            github_fixture("octo", "demo"),
            Arc::new(CannedGenerator::failing()),
            store.clone(),
        );

        let result = service.create_story(&UserContext::new("user-1"), URL).await;

        assert!(matches!(result, Err(StoryError::Generation(_))));
        assert_eq!(store.repository_count(), 0);
        assert_eq!(store.story_count(), 0);
    }

    #[actix_rt::test]
    async fn test_rerun_reuses_repository_and_adds_story() {
        let store = Arc::new(InMemoryStoryStore::new());
        let service = story_service(
            github_fixture("octo", "demo"),
            Arc::new(CannedGenerator::new("Story")),
            store.clone(),
        );
        let user = UserContext::new("user-1");

        let first = service.create_story(&user, URL).await.unwrap();
        let second = service.create_story(&user, URL).await.unwrap();

        assert_ne!(first.story.story_id, second.story.story_id);
        assert_eq!(first.story.repository_id, second.story.repository_id);
        assert_eq!(store.repository_count(), 1);
        assert_eq!(service.list_stories(&user).await.unwrap().len(), 2);
    }

    #[actix_rt::test]
    async fn test_stories_are_owner_scoped() {
        let store = Arc::new(InMemoryStoryStore::new());
        let service = story_service(
            github_fixture("octo", "demo"),
            Arc::new(CannedGenerator::new("Story")),
            store.clone(),
        );
        let alice = UserContext::new("alice");
        let bob = UserContext::new("bob");

        let story = service.create_story(&alice, URL).await.unwrap();
        service.create_story(&bob, URL).await.unwrap();

        // Same URL, independent rows per user
        assert_eq!(store.repository_count(), 2);
        assert_eq!(service.list_repositories(&alice).await.unwrap().len(), 1);
        assert!(matches!(
            service.get_story(&bob, &story.story.story_id).await,
            Err(StoryError::StoryNotFound(_))
        ));
    }

    #[actix_rt::test]
    async fn test_export_story() {
        let store = Arc::new(InMemoryStoryStore::new());
        let service = story_service(
            github_fixture("octo", "demo"),
            Arc::new(CannedGenerator::new("It began with a commit.")),
            store,
        );
        let user = UserContext::new("user-1");
        let story = service.create_story(&user, URL).await.unwrap();

        let doc = service
            .export_story(&user, &story.story.story_id, ExportFormat::Markdown)
            .await
            .unwrap();
        assert_eq!(doc.filename, "the-story-of-octo-demo.md");
        assert!(doc.body.starts_with("# The Story of octo/demo\n"));
        assert!(doc.body.contains("It began with a commit."));
        assert!(doc.body.contains(URL));
    }

    #[actix_rt::test]
    async fn test_analyze_does_not_persist() {
        let store = Arc::new(InMemoryStoryStore::new());
        let generator = Arc::new(CannedGenerator::new("unused"));
        let service = story_service(github_fixture("octo", "demo"), generator.clone(), store.clone());

        let analysis = service.analyze(URL).await.unwrap();
        assert_eq!(analysis.metadata.full_name, "octo/demo");
        assert_eq!(analysis.formatted_timespan, "1 year, 1 month");
        assert!(generator.prompts().is_empty());
        assert_eq!(store.repository_count(), 0);
    }
}

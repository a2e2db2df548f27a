//! Test doubles
//!
//! In-memory stand-ins for the outbound HTTP capability, the generation
//! backend, the story store and the token verifier, plus GitHub fixtures.
//! None of them touch the network or a database.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::config::Config;
use crate::models::{
    NewStory, RawRepositoryData, RepositoryAnalysis, StoredRepository, StoredStory,
    StoryWithRepository,
};
use crate::services::auth::{AuthError, TokenVerifier, UserContext};
use crate::services::github::{FetchError, FetchResponse, GitHubFetcher, HttpFetch};
use crate::services::insights::aggregate;
use crate::services::narrative::{DEFAULT_MAX_TOKENS, GenerationError, NarrativeGenerator};
use crate::services::story::StoryService;
use crate::services::story_store::{StoreError, StoryStore};

/// API base the fixtures are registered under
pub const TEST_API_BASE: &str = "https://api.github.test";

// ============================================================================
// HTTP
// ============================================================================

/// A GET seen by `StaticFetch`
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
}

/// `HttpFetch` answering from a fixed URL table. Unknown URLs get a 404.
#[derive(Debug, Default)]
pub struct StaticFetch {
    responses: HashMap<String, FetchResponse>,
    delays: HashMap<String, Duration>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl StaticFetch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the response for `url`
    pub fn with_response(mut self, url: &str, status: u16, body: &str) -> Self {
        self.responses
            .insert(url.to_string(), FetchResponse::new(status, body));
        self
    }

    /// Delay the response for `url`
    pub fn with_delay(mut self, url: &str, delay: Duration) -> Self {
        self.delays.insert(url.to_string(), delay);
        self
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl HttpFetch for StaticFetch {
    async fn get(&self, url: &str, headers: &[(&str, &str)]) -> Result<FetchResponse, FetchError> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(RecordedRequest {
                url: url.to_string(),
                headers: headers
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            });

        if let Some(delay) = self.delays.get(url) {
            tokio::time::sleep(*delay).await;
        }

        Ok(self
            .responses
            .get(url)
            .cloned()
            .unwrap_or_else(|| FetchResponse::new(404, r#"{"message":"Not Found"}"#)))
    }
}

/// Repository metadata body: created 2022-01-01, last pushed 2023-02-05
/// (400 days), 42 stars, 7 forks.
pub fn sample_metadata_json(owner: &str, repo: &str) -> String {
    serde_json::json!({
        "id": 1296269,
        "name": repo,
        "full_name": format!("{owner}/{repo}"),
        "owner": { "login": owner },
        "html_url": format!("https://github.com/{owner}/{repo}"),
        "description": "A demo repository",
        "language": "Rust",
        "size": 2048,
        "stargazers_count": 42,
        "forks_count": 7,
        "open_issues_count": 3,
        "created_at": "2022-01-01T00:00:00Z",
        "updated_at": "2023-01-20T00:00:00Z",
        "pushed_at": "2023-02-05T00:00:00Z",
        "private": false,
        "default_branch": "main"
    })
    .to_string()
}

const SAMPLE_CONTRIBUTORS: &str = r#"[
    {"login": "alice", "contributions": 40, "avatar_url": "https://avatars.test/alice", "type": "User"},
    {"login": "bob", "contributions": 12, "avatar_url": "https://avatars.test/bob", "type": "User"}
]"#;

const SAMPLE_LANGUAGES: &str = r#"{"Rust": 9000, "Shell": 100}"#;

const SAMPLE_COMMIT_ACTIVITY: &str = r#"[
    {"week": 1672531200, "total": 3, "days": [0, 1, 2, 0, 0, 0, 0]},
    {"week": 1673136000, "total": 5, "days": [1, 1, 1, 1, 1, 0, 0]}
]"#;

/// All four GitHub endpoints answering successfully for `owner/repo`.
/// Individual entries can be overridden with `with_response`.
pub fn github_fixture(owner: &str, repo: &str) -> StaticFetch {
    let base = format!("{TEST_API_BASE}/repos/{owner}/{repo}");
    StaticFetch::new()
        .with_response(&base, 200, &sample_metadata_json(owner, repo))
        .with_response(
            &format!("{base}/contributors?per_page=30"),
            200,
            SAMPLE_CONTRIBUTORS,
        )
        .with_response(&format!("{base}/languages"), 200, SAMPLE_LANGUAGES)
        .with_response(
            &format!("{base}/stats/commit_activity"),
            200,
            SAMPLE_COMMIT_ACTIVITY,
        )
}

/// Analysis built from the `github_fixture("octo", "demo")` payloads
pub fn sample_analysis(url: &str) -> RepositoryAnalysis {
    let raw = RawRepositoryData {
        metadata: serde_json::from_str(&sample_metadata_json("octo", "demo"))
            .unwrap_or_else(|e| panic!("invalid metadata fixture: {e}")),
        contributors: serde_json::from_str(SAMPLE_CONTRIBUTORS)
            .unwrap_or_else(|e| panic!("invalid contributors fixture: {e}")),
        languages: serde_json::from_str(SAMPLE_LANGUAGES)
            .unwrap_or_else(|e| panic!("invalid languages fixture: {e}")),
        commit_activity: serde_json::from_str(SAMPLE_COMMIT_ACTIVITY)
            .unwrap_or_else(|e| panic!("invalid commit activity fixture: {e}")),
    };
    aggregate(url, raw)
}

// ============================================================================
// Generation
// ============================================================================

/// `NarrativeGenerator` returning fixed text and recording prompts
#[derive(Debug, Default)]
pub struct CannedGenerator {
    text: Option<String>,
    prompts: Mutex<Vec<(String, u32)>>,
}

impl CannedGenerator {
    pub fn new(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// A generator whose every call fails
    pub fn failing() -> Self {
        Self::default()
    }

    /// Prompts and token budgets received so far
    pub fn prompts(&self) -> Vec<(String, u32)> {
        self.prompts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl NarrativeGenerator for CannedGenerator {
    async fn generate(&self, prompt: &str, max_tokens: u32) -> Result<String, GenerationError> {
        self.prompts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((prompt.to_string(), max_tokens));

        self.text.clone().ok_or(GenerationError::Status {
            status: 503,
            body: "generator unavailable".to_string(),
        })
    }
}

// ============================================================================
// Storage
// ============================================================================

#[derive(Debug, Default)]
struct StoreState {
    repositories: Vec<StoredRepository>,
    stories: Vec<StoredStory>,
}

/// `StoryStore` kept in process memory
#[derive(Debug, Default)]
pub struct InMemoryStoryStore {
    state: Mutex<StoreState>,
}

impl InMemoryStoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn repository_count(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .repositories
            .len()
    }

    pub fn story_count(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .stories
            .len()
    }

    fn join(state: &StoreState, story: &StoredStory) -> StoryWithRepository {
        let repository = story.repository_id.as_ref().and_then(|id| {
            state
                .repositories
                .iter()
                .find(|r| &r.repo_id == id)
                .cloned()
        });
        StoryWithRepository {
            story: story.clone(),
            repository,
        }
    }
}

#[async_trait]
impl StoryStore for InMemoryStoryStore {
    async fn find_or_create_repository(
        &self,
        user: &UserContext,
        analysis: &RepositoryAnalysis,
    ) -> Result<String, StoreError> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());

        if let Some(existing) = state
            .repositories
            .iter()
            .find(|r| r.owner_id == user.user_id && r.url == analysis.url)
        {
            return Ok(existing.repo_id.clone());
        }

        let meta = &analysis.metadata;
        let repository = StoredRepository {
            repo_id: Uuid::new_v4().to_string(),
            owner_id: user.user_id.clone(),
            url: analysis.url.clone(),
            full_name: meta.full_name.clone(),
            description: meta.description.clone(),
            language: meta.language.clone(),
            stars: meta.stargazers_count as i64,
            forks: meta.forks_count as i64,
            created_at: Utc::now(),
        };
        let repo_id = repository.repo_id.clone();
        state.repositories.push(repository);
        Ok(repo_id)
    }

    async fn insert_story(
        &self,
        user: &UserContext,
        story: NewStory,
    ) -> Result<StoredStory, StoreError> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());

        if let Some(ref repo_id) = story.repository_id {
            let owned = state
                .repositories
                .iter()
                .any(|r| &r.repo_id == repo_id && r.owner_id == user.user_id);
            if !owned {
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
        state.stories.push(stored.clone());
        Ok(stored)
    }

    async fn list_stories(
        &self,
        user: &UserContext,
    ) -> Result<Vec<StoryWithRepository>, StoreError> {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        // Insertion order is creation order; newest first
        Ok(state
            .stories
            .iter()
            .rev()
            .filter(|s| s.owner_id == user.user_id)
            .map(|s| Self::join(&state, s))
            .collect())
    }

    async fn get_story(
        &self,
        user: &UserContext,
        story_id: &str,
    ) -> Result<Option<StoryWithRepository>, StoreError> {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        Ok(state
            .stories
            .iter()
            .find(|s| s.story_id == story_id && s.owner_id == user.user_id)
            .map(|s| Self::join(&state, s)))
    }

    async fn list_repositories(
        &self,
        user: &UserContext,
    ) -> Result<Vec<StoredRepository>, StoreError> {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        Ok(state
            .repositories
            .iter()
            .rev()
            .filter(|r| r.owner_id == user.user_id)
            .cloned()
            .collect())
    }
}

// ============================================================================
// Auth
// ============================================================================

/// `TokenVerifier` over a fixed token table
#[derive(Debug, Default)]
pub struct StaticTokenVerifier {
    tokens: HashMap<String, String>,
}

impl StaticTokenVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(mut self, token: &str, user_id: &str) -> Self {
        self.tokens.insert(token.to_string(), user_id.to_string());
        self
    }
}

#[async_trait]
impl TokenVerifier for StaticTokenVerifier {
    async fn verify(&self, token: &str) -> Result<UserContext, AuthError> {
        self.tokens
            .get(token)
            .map(UserContext::new)
            .ok_or(AuthError::InvalidToken)
    }
}

// ============================================================================
// Wiring
// ============================================================================

/// `StoryService` over the given doubles, with the production token budget
pub fn story_service(
    http: StaticFetch,
    generator: Arc<CannedGenerator>,
    store: Arc<InMemoryStoryStore>,
) -> StoryService {
    let fetcher = GitHubFetcher::new(
        Arc::new(http),
        TEST_API_BASE,
        None,
        Duration::from_secs(5),
    );
    StoryService::new(fetcher, generator, store, DEFAULT_MAX_TOKENS)
}

/// Configuration pointing at the test API base; never used to open connections
pub fn test_config() -> Config {
    Config {
        database_url: String::new(),
        database_max_connections: 1,
        host: "127.0.0.1".to_string(),
        port: 8080,
        github_api_url: TEST_API_BASE.to_string(),
        github_token: None,
        github_secondary_timeout_secs: 5,
        generator_api_url: "https://generator.test/v1".to_string(),
        generator_api_key: "test-key".to_string(),
        generator_model: "test-model".to_string(),
        generator_max_tokens: DEFAULT_MAX_TOKENS,
        generator_timeout_secs: 5,
    }
}

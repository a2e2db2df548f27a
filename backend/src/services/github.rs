//! Remote Repository Fetcher
//!
//! Pulls repository metadata, contributors, languages and commit activity
//! from the GitHub REST API.
//!
//! Only the metadata call is required. The three secondary calls run
//! concurrently once metadata is in, each under its own timeout, and any
//! failure among them degrades that field instead of failing the fetch.
//! Nothing is retried.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::models::{
    CommitActivityWeek, ContributorRecord, LanguageBreakdown, RawRepositoryData, RepoRef,
    RepositoryMetadata,
};

/// Media type GitHub expects for v3 JSON responses
pub const GITHUB_ACCEPT: &str = "application/vnd.github.v3+json";

/// Contributors requested per analysis
pub const CONTRIBUTORS_PER_PAGE: u32 = 30;

const USER_AGENT: &str = concat!("gitstory/", env!("CARGO_PKG_VERSION"));

/// Errors that can occur while fetching repository data
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Invalid repository URL: {0}")]
    InvalidInput(String),

    #[error("{0}")]
    NotFound(String),

    #[error("GitHub API returned status {0}")]
    Upstream(u16),

    #[error("HTTP transport error: {0}")]
    Transport(String),

    #[error("Failed to decode GitHub response: {0}")]
    Decode(String),
}

/// Status and body of an outbound GET
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: u16,
    pub body: String,
}

impl FetchResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Outbound HTTP capability used by the fetcher.
///
/// Production uses `ReqwestFetch`; tests plug in canned responses.
#[async_trait]
pub trait HttpFetch: Send + Sync {
    async fn get(&self, url: &str, headers: &[(&str, &str)]) -> Result<FetchResponse, FetchError>;
}

/// `HttpFetch` over a shared reqwest client
#[derive(Debug, Clone)]
pub struct ReqwestFetch {
    client: reqwest::Client,
}

impl ReqwestFetch {
    pub fn new() -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpFetch for ReqwestFetch {
    async fn get(&self, url: &str, headers: &[(&str, &str)]) -> Result<FetchResponse, FetchError> {
        let mut request = self.client.get(url);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }

        let response = request
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        Ok(FetchResponse { status, body })
    }
}

/// Parse `owner` and `repo` out of a repository URL.
///
/// Accepts `[scheme://]host/owner/repo[.git]`, with optional trailing path
/// segments, slash, query or fragment. Everything else is `InvalidInput`.
pub fn parse_repo_url(url: &str) -> Result<RepoRef, FetchError> {
    let invalid = || FetchError::InvalidInput(url.to_string());

    let trimmed = url.trim();
    let without_scheme = match trimmed.split_once("://") {
        Some((scheme, rest)) if !scheme.is_empty() => rest,
        Some(_) => return Err(invalid()),
        None => trimmed,
    };
    let path = without_scheme
        .split(|c: char| c == '?' || c == '#')
        .next()
        .unwrap_or_default();

    let mut segments = path.split('/');
    let host = segments.next().unwrap_or_default();
    let owner = segments.next().unwrap_or_default();
    let repo = segments.next().unwrap_or_default();

    if host.is_empty() || host.contains(char::is_whitespace) {
        return Err(invalid());
    }

    let repo = repo.strip_suffix(".git").unwrap_or(repo);
    if !is_valid_name(owner) || !is_valid_name(repo) {
        return Err(invalid());
    }

    Ok(RepoRef::new(owner, repo))
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

/// Client for the GitHub repository endpoints
#[derive(Clone)]
pub struct GitHubFetcher {
    http: Arc<dyn HttpFetch>,
    api_base: String,
    token: Option<String>,
    secondary_timeout: Duration,
}

impl GitHubFetcher {
    pub fn new(
        http: Arc<dyn HttpFetch>,
        api_base: &str,
        token: Option<String>,
        secondary_timeout: Duration,
    ) -> Self {
        Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            token,
            secondary_timeout,
        }
    }

    /// Fetch everything needed to analyze the repository at `url`
    pub async fn fetch(&self, url: &str) -> Result<RawRepositoryData, FetchError> {
        let repo = parse_repo_url(url)?;
        info!(owner = %repo.owner, repo = %repo.repo, "Fetching repository metadata");

        let metadata = self.fetch_metadata(&repo).await?;

        let (contributors, languages, commit_activity) = tokio::join!(
            self.fetch_contributors(&repo),
            self.fetch_languages(&repo),
            self.fetch_commit_activity(&repo),
        );

        debug!(
            full_name = %metadata.full_name,
            contributors = contributors.len(),
            languages = languages.len(),
            has_commit_activity = commit_activity.is_some(),
            "Repository fetch complete"
        );

        Ok(RawRepositoryData {
            metadata,
            contributors,
            languages,
            commit_activity,
        })
    }

    /// Required call: any non-200 aborts the fetch
    pub async fn fetch_metadata(&self, repo: &RepoRef) -> Result<RepositoryMetadata, FetchError> {
        match self.get_json(&repo.api_path()).await {
            Err(FetchError::Upstream(404)) => Err(FetchError::NotFound(
                "Repository not found or not public".to_string(),
            )),
            other => other,
        }
    }

    pub async fn fetch_contributors(&self, repo: &RepoRef) -> Vec<ContributorRecord> {
        let path = format!(
            "{}/contributors?per_page={CONTRIBUTORS_PER_PAGE}",
            repo.api_path()
        );
        self.fetch_secondary(&path, "contributors")
            .await
            .unwrap_or_default()
    }

    pub async fn fetch_languages(&self, repo: &RepoRef) -> LanguageBreakdown {
        let path = format!("{}/languages", repo.api_path());
        self.fetch_secondary(&path, "languages")
            .await
            .unwrap_or_default()
    }

    /// `None` covers GitHub's 202 "still computing" answer as well as any
    /// failure or non-array body.
    pub async fn fetch_commit_activity(&self, repo: &RepoRef) -> Option<Vec<CommitActivityWeek>> {
        let path = format!("{}/stats/commit_activity", repo.api_path());
        self.fetch_secondary(&path, "commit activity").await
    }

    async fn fetch_secondary<T: DeserializeOwned>(&self, path: &str, what: &str) -> Option<T> {
        match tokio::time::timeout(self.secondary_timeout, self.get_json::<T>(path)).await {
            Ok(Ok(value)) => Some(value),
            Ok(Err(FetchError::Upstream(202))) => {
                info!(path = %path, "GitHub is still computing {}, skipping", what);
                None
            }
            Ok(Err(e)) => {
                warn!(path = %path, error = %e, "Failed to fetch {}, continuing without it", what);
                None
            }
            Err(_) => {
                warn!(
                    path = %path,
                    timeout_secs = self.secondary_timeout.as_secs(),
                    "Timed out fetching {}, continuing without it",
                    what
                );
                None
            }
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, FetchError> {
        let url = format!("{}{}", self.api_base, path);
        let authorization = self.token.as_ref().map(|t| format!("Bearer {t}"));

        let mut headers = vec![("Accept", GITHUB_ACCEPT), ("User-Agent", USER_AGENT)];
        if let Some(ref value) = authorization {
            headers.push(("Authorization", value.as_str()));
        }

        let response = self.http.get(&url, &headers).await?;
        if response.status != 200 {
            return Err(FetchError::Upstream(response.status));
        }

        serde_json::from_str(&response.body).map_err(|e| FetchError::Decode(e.to_string()))
    }
}

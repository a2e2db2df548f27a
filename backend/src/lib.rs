//! GitStory - stories about GitHub repositories
//!
//! Fetches a public repository's history from the GitHub API, condenses it
//! into an analysis, asks a text generation backend to narrate it, and keeps
//! the result per user.

use std::sync::Arc;

use actix_web::HttpResponse;

pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod services;
pub mod testing;

pub use config::Config;
pub use error::AppError;

pub use models::{
    CommitCount, ExportFormat, RepositoryAnalysis, StoredRepository, StoredStory, StoryInsights,
    StoryWithRepository,
};
pub use services::{
    GitHubFetcher, NarrativeGenerator, StoryError, StoryService, StoryStore, TokenVerifier,
    UserContext,
};

/// Application state shared across handlers
pub struct AppState {
    pub config: Config,
    pub stories: StoryService,
    pub tokens: Arc<dyn TokenVerifier>,
}

/// Health check endpoint
pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "gitstory"
    }))
}

//! Narrative Generator
//!
//! Turns a `RepositoryAnalysis` into a prompt and hands it to a text
//! generation backend. Prompt construction is deterministic; the backend
//! sits behind the `NarrativeGenerator` trait.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::models::RepositoryAnalysis;

/// Output budget for one story
pub const DEFAULT_MAX_TOKENS: u32 = 1200;

/// Contributors named in the prompt
const PROMPT_CONTRIBUTORS: usize = 5;

/// Errors that can occur during story generation
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Generation request failed: {0}")]
    Request(String),

    #[error("Generation service returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to decode generation response: {0}")]
    Decode(String),

    #[error("Generation service returned no text")]
    EmptyResponse,
}

/// Text generation backend
#[async_trait]
pub trait NarrativeGenerator: Send + Sync {
    async fn generate(&self, prompt: &str, max_tokens: u32) -> Result<String, GenerationError>;
}

fn format_date(date: &DateTime<Utc>) -> String {
    date.format("%B %-d, %Y").to_string()
}

/// Title stored with a generated story
pub fn story_title(analysis: &RepositoryAnalysis) -> String {
    format!("The Story of {}", analysis.metadata.full_name)
}

/// Build the generation prompt for an analysis
pub fn build_prompt(analysis: &RepositoryAnalysis) -> String {
    let meta = &analysis.metadata;

    let commits = if analysis.commits.is_estimated() {
        format!(
            "approximately {} (estimated from repository age)",
            analysis.commits.value()
        )
    } else {
        analysis.commits.value().to_string()
    };

    let top_languages = if analysis.top_languages.is_empty() {
        "Unknown".to_string()
    } else {
        analysis.top_languages.join(", ")
    };

    let contributors = if analysis.contributors.is_empty() {
        "- No contributor data available".to_string()
    } else {
        analysis
            .contributors
            .iter()
            .take(PROMPT_CONTRIBUTORS)
            .map(|c| format!("- {} ({} contributions)", c.login, c.contributions))
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        "Write an engaging narrative about the GitHub repository \"{full_name}\".\n\
         \n\
         Repository details:\n\
         - Name: {name}\n\
         - Description: {description}\n\
         - Primary language: {language}\n\
         - Stars: {stars}\n\
         - Forks: {forks}\n\
         - Contributors: {contributor_count}\n\
         - Total commits: {commits}\n\
         - Top languages: {top_languages}\n\
         - Active for: {timespan}\n\
         - Created: {created}\n\
         - Last updated: {updated}\n\
         \n\
         Top contributors:\n\
         {contributors}\n\
         \n\
         Tell the story of how the project began, how it grew, and the people who built it. \
         Stay faithful to the details above, use a warm storytelling tone, \
         and organize the story into a few short sections with headings.",
        full_name = meta.full_name,
        name = meta.name,
        description = meta
            .description
            .as_deref()
            .filter(|d| !d.trim().is_empty())
            .unwrap_or("No description provided"),
        language = meta.language.as_deref().unwrap_or("Not specified"),
        stars = meta.stargazers_count,
        forks = meta.forks_count,
        contributor_count = analysis.contributors.len(),
        commits = commits,
        top_languages = top_languages,
        timespan = analysis.formatted_timespan,
        created = format_date(&analysis.timespan.first_seen),
        updated = format_date(&analysis.timespan.last_seen),
        contributors = contributors,
    )
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Pull the first choice's text out of a chat-completions response body
pub fn extract_completion_text(body: &str) -> Result<String, GenerationError> {
    let response: ChatCompletionResponse =
        serde_json::from_str(body).map_err(|e| GenerationError::Decode(e.to_string()))?;

    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
        .ok_or(GenerationError::EmptyResponse)
}

/// `NarrativeGenerator` for OpenAI-compatible chat-completions endpoints
#[derive(Debug, Clone)]
pub struct ChatCompletionsGenerator {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl ChatCompletionsGenerator {
    pub fn new(
        base_url: &str,
        api_key: &str,
        model: &str,
        timeout: Duration,
    ) -> Result<Self, GenerationError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GenerationError::Request(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        })
    }
}

#[async_trait]
impl NarrativeGenerator for ChatCompletionsGenerator {
    async fn generate(&self, prompt: &str, max_tokens: u32) -> Result<String, GenerationError> {
        let url = format!("{}/chat/completions", self.base_url);
        let request = ChatCompletionRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens,
        };

        debug!(model = %self.model, max_tokens, "Requesting story generation");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| GenerationError::Request(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GenerationError::Request(e.to_string()))?;

        if !status.is_success() {
            return Err(GenerationError::Status {
                status: status.as_u16(),
                body,
            });
        }

        extract_completion_text(&body)
    }
}

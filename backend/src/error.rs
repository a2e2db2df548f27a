use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;
use std::fmt;

use crate::services::github::FetchError;
use crate::services::story::StoryError;
use crate::services::story_store::StoreError;

/// Application-level error type
#[derive(Debug)]
pub enum AppError {
    /// Database error
    Database(sqlx::Error),
    /// Validation error (malformed repository URL, bad request body)
    Validation(String),
    /// Not found error
    NotFound(String),
    /// Authentication error
    Unauthorized(String),
    /// GitHub answered with an unexpected status or an unreadable body
    Upstream(String),
    /// The generation backend failed; details stay in the logs
    Generation(String),
    /// Internal server error
    Internal(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorBody,
    meta: ErrorMeta,
}

#[derive(Serialize)]
struct ErrorBody {
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

#[derive(Serialize)]
struct ErrorMeta {
    request_id: String,
}

impl AppError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Database(_) => "DATABASE_ERROR",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Upstream(_) => "UPSTREAM_ERROR",
            Self::Generation(_) => "GENERATION_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Message shown to clients
    fn public_message(&self) -> String {
        match self {
            Self::Database(_) => "A database error occurred".to_string(),
            Self::Generation(_) => "Failed to generate story, please try again later".to_string(),
            Self::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Database(e) => write!(f, "Database error: {e}"),
            Self::Validation(msg) => write!(f, "Validation error: {msg}"),
            Self::NotFound(msg) => write!(f, "Not found: {msg}"),
            Self::Unauthorized(msg) => write!(f, "Unauthorized: {msg}"),
            Self::Upstream(msg) => write!(f, "Upstream error: {msg}"),
            Self::Generation(msg) => write!(f, "Generation error: {msg}"),
            Self::Internal(msg) => write!(f, "Internal error: {msg}"),
        }
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        if matches!(
            self,
            Self::Database(_) | Self::Generation(_) | Self::Internal(_)
        ) {
            tracing::error!(error = %self, "Request failed");
        }

        let error_response = ErrorResponse {
            error: ErrorBody {
                code: self.error_code().to_string(),
                message: self.public_message(),
                details: None,
            },
            meta: ErrorMeta {
                request_id: uuid::Uuid::new_v4().to_string(),
            },
        };

        match self {
            Self::Database(_) | Self::Internal(_) => {
                HttpResponse::InternalServerError().json(error_response)
            }
            Self::Validation(_) => HttpResponse::BadRequest().json(error_response),
            Self::NotFound(_) => HttpResponse::NotFound().json(error_response),
            Self::Unauthorized(_) => HttpResponse::Unauthorized().json(error_response),
            Self::Upstream(_) | Self::Generation(_) => {
                HttpResponse::BadGateway().json(error_response)
            }
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(err)
    }
}

impl From<StoryError> for AppError {
    fn from(err: StoryError) -> Self {
        match err {
            StoryError::Fetch(e) => match e {
                FetchError::InvalidInput(_) => Self::Validation(e.to_string()),
                FetchError::NotFound(msg) => Self::NotFound(msg),
                FetchError::Upstream(_) | FetchError::Transport(_) | FetchError::Decode(_) => {
                    Self::Upstream(e.to_string())
                }
            },
            StoryError::Generation(e) => Self::Generation(e.to_string()),
            StoryError::Store(StoreError::Database(e)) => Self::Database(e),
            StoryError::Store(StoreError::RepositoryNotFound(id)) => {
                Self::NotFound(format!("Repository not found: {id}"))
            }
            StoryError::StoryNotFound(id) => Self::NotFound(format!("Story not found: {id}")),
        }
    }
}

//! User authentication
//!
//! Bearer tokens are issued by an external identity provider and recorded
//! in `user_tokens` by their SHA-256 hash. Each request resolves its token
//! into a `UserContext`, which is then passed explicitly to every
//! persistence call. No token is ever held in shared state.

use std::future::Future;
use std::pin::Pin;

use actix_web::{FromRequest, HttpRequest, dev::Payload, web};
use async_trait::async_trait;
use serde::Serialize;
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use thiserror::Error;

use crate::AppState;
use crate::error::AppError;

/// Errors that can occur while verifying a token
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid or missing authentication token")]
    InvalidToken,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// The authenticated caller of a request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserContext {
    pub user_id: String,
}

impl UserContext {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }
}

/// Resolves bearer tokens into users
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<UserContext, AuthError>;
}

/// Hex-encoded SHA-256 of a token, as stored in `user_tokens`
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// `TokenVerifier` backed by the `user_tokens` table
#[derive(Debug, Clone)]
pub struct PgTokenVerifier {
    pool: PgPool,
}

impl PgTokenVerifier {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TokenVerifier for PgTokenVerifier {
    async fn verify(&self, token: &str) -> Result<UserContext, AuthError> {
        let user_id: Option<String> = sqlx::query_scalar(
            r#"
            SELECT user_id FROM user_tokens
            WHERE token_hash = $1 AND (expires_at IS NULL OR expires_at > NOW())
            "#,
        )
        .bind(hash_token(token))
        .fetch_optional(&self.pool)
        .await?;

        user_id.map(UserContext::new).ok_or(AuthError::InvalidToken)
    }
}

/// Extract Bearer token from Authorization header
///
/// Expected format: "Bearer <token>"
fn extract_bearer_token(req: &HttpRequest) -> Option<String> {
    let auth_header = req.headers().get("Authorization")?;
    let auth_str = auth_header.to_str().ok()?;

    if auth_str.len() > 7 && auth_str[..7].eq_ignore_ascii_case("Bearer ") {
        let token = auth_str[7..].trim();
        (!token.is_empty()).then(|| token.to_string())
    } else {
        None
    }
}

impl FromRequest for UserContext {
    type Error = AppError;
    type Future = Pin<Box<dyn Future<Output = Result<Self, Self::Error>>>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let req = req.clone();

        Box::pin(async move {
            let state = req.app_data::<web::Data<AppState>>().ok_or_else(|| {
                tracing::error!("AppState not configured in app data");
                AppError::Internal("Authentication service not configured".to_string())
            })?;

            let token = extract_bearer_token(&req).ok_or_else(|| {
                tracing::debug!("Missing or invalid Authorization header");
                AppError::Unauthorized(AuthError::InvalidToken.to_string())
            })?;

            state.tokens.verify(&token).await.map_err(|e| match e {
                AuthError::InvalidToken => {
                    tracing::debug!("Unknown or expired token");
                    AppError::Unauthorized(e.to_string())
                }
                AuthError::Database(e) => AppError::Database(e),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn test_hash_token_is_sha256_hex() {
        assert_eq!(
            hash_token("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_extract_bearer_token() {
        let req = TestRequest::default()
            .insert_header(("Authorization", "Bearer tok-123"))
            .to_http_request();
        assert_eq!(extract_bearer_token(&req), Some("tok-123".to_string()));

        let req = TestRequest::default()
            .insert_header(("Authorization", "bearer tok-456"))
            .to_http_request();
        assert_eq!(extract_bearer_token(&req), Some("tok-456".to_string()));
    }

    #[test]
    fn test_extract_bearer_token_rejects_other_schemes() {
        let req = TestRequest::default()
            .insert_header(("Authorization", "Basic dXNlcjpwYXNz"))
            .to_http_request();
        assert_eq!(extract_bearer_token(&req), None);

        let req = TestRequest::default()
            .insert_header(("Authorization", "Bearer    "))
            .to_http_request();
        assert_eq!(extract_bearer_token(&req), None);

        let req = TestRequest::default().to_http_request();
        assert_eq!(extract_bearer_token(&req), None);
    }
}

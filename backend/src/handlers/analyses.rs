//! Analysis handlers
//!
//! Runs the fetch and aggregation steps alone, without generating or
//! storing a story.

use actix_web::{HttpResponse, web};
use tracing::info;

use crate::AppState;
use crate::error::AppError;
use crate::handlers::ApiResponse;
use crate::models::RepositoryUrlRequest;
use crate::services::UserContext;

/// POST /v1/analyses
pub async fn create_analysis(
    state: web::Data<AppState>,
    user: UserContext,
    body: web::Json<RepositoryUrlRequest>,
) -> Result<HttpResponse, AppError> {
    let url = require_url(&body.url)?;
    info!(user_id = %user.user_id, url = %url, "Analysis requested");

    let analysis = state.stories.analyze(url).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::new(analysis)))
}

/// Reject blank URLs before anything reaches GitHub
pub(crate) fn require_url(url: &str) -> Result<&str, AppError> {
    let url = url.trim();
    if url.is_empty() {
        return Err(AppError::Validation("Repository URL is required".to_string()));
    }
    Ok(url)
}

/// Configure analysis routes
pub fn configure_analysis_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/analyses", web::post().to(create_analysis));
}

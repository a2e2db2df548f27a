//! Story handlers
//!
//! HTTP handlers for generating, listing, reading and exporting stories.
//! Every route requires a bearer token; stories are only visible to the
//! user who generated them.

use actix_web::{HttpResponse, http::header, web};
use tracing::info;

use crate::AppState;
use crate::error::AppError;
use crate::handlers::ApiResponse;
use crate::handlers::analyses::require_url;
use crate::models::{ExportQuery, RepositoryUrlRequest};
use crate::services::UserContext;

/// POST /v1/stories
///
/// Analyze the repository, generate its story and save it.
/// Responds 201 with the stored story and its repository.
pub async fn create_story(
    state: web::Data<AppState>,
    user: UserContext,
    body: web::Json<RepositoryUrlRequest>,
) -> Result<HttpResponse, AppError> {
    let url = require_url(&body.url)?;
    info!(user_id = %user.user_id, url = %url, "Story requested");

    let story = state.stories.create_story(&user, url).await?;

    Ok(HttpResponse::Created().json(ApiResponse::new(story)))
}

/// GET /v1/stories
pub async fn list_stories(
    state: web::Data<AppState>,
    user: UserContext,
) -> Result<HttpResponse, AppError> {
    let stories = state.stories.list_stories(&user).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::new(stories)))
}

/// GET /v1/stories/{storyId}
pub async fn get_story(
    state: web::Data<AppState>,
    user: UserContext,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let story_id = path.into_inner();
    let story = state.stories.get_story(&user, &story_id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::new(story)))
}

/// GET /v1/stories/{storyId}/export?format=markdown|text
///
/// Served as an attachment; defaults to Markdown.
pub async fn export_story(
    state: web::Data<AppState>,
    user: UserContext,
    path: web::Path<String>,
    query: web::Query<ExportQuery>,
) -> Result<HttpResponse, AppError> {
    let story_id = path.into_inner();
    let document = state
        .stories
        .export_story(&user, &story_id, query.format)
        .await?;

    Ok(HttpResponse::Ok()
        .content_type(document.content_type)
        .insert_header((
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", document.filename),
        ))
        .body(document.body))
}

/// Configure story routes
pub fn configure_story_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/stories")
            .route("", web::post().to(create_story))
            .route("", web::get().to(list_stories))
            .route("/{storyId}", web::get().to(get_story))
            .route("/{storyId}/export", web::get().to(export_story)),
    );
}

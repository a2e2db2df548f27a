use actix_web::{HttpResponse, web};

use crate::AppState;
use crate::error::AppError;
use crate::handlers::ApiResponse;
use crate::services::UserContext;

/// GET /v1/repositories
///
/// Repositories the caller has generated stories for, newest first.
pub async fn list_repositories(
    state: web::Data<AppState>,
    user: UserContext,
) -> Result<HttpResponse, AppError> {
    let repositories = state.stories.list_repositories(&user).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::new(repositories)))
}

/// Configure repository routes
pub fn configure_repository_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/repositories", web::get().to(list_repositories));
}

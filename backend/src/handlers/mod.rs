pub mod analyses;
pub mod repositories;
pub mod stories;


use serde::Serialize;

pub use analyses::configure_analysis_routes;
pub use repositories::configure_repository_routes;
pub use stories::configure_story_routes;

/// Standard API response wrapper
#[derive(Serialize)]
pub(crate) struct ApiResponse<T: Serialize> {
    data: T,
    meta: ResponseMeta,
}

#[derive(Serialize)]
struct ResponseMeta {
    request_id: String,
}

impl<T: Serialize> ApiResponse<T> {
    pub(crate) fn new(data: T) -> Self {
        Self {
            data,
            meta: ResponseMeta {
                request_id: uuid::Uuid::new_v4().to_string(),
            },
        }
    }
}

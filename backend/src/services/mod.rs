pub mod auth;
pub mod export;
pub mod github;
pub mod insights;
pub mod narrative;
pub mod story;
pub mod story_store;

pub use auth::{AuthError, PgTokenVerifier, TokenVerifier, UserContext, hash_token};
pub use export::{ExportDocument, export_filename, export_story, render_export};
pub use github::{
    FetchError, FetchResponse, GitHubFetcher, HttpFetch, ReqwestFetch, parse_repo_url,
};
pub use insights::{
    aggregate, compute_timespan, estimate_commits, format_timespan, top_languages, total_commits,
};
pub use narrative::{
    ChatCompletionsGenerator, GenerationError, NarrativeGenerator, build_prompt, story_title,
};
pub use story::{StoryError, StoryService};
pub use story_store::{PgStoryStore, StoreError, StoryStore};

use std::sync::Arc;
use std::time::Duration;

use actix_web::{App, HttpServer, middleware, web};
use sqlx::postgres::PgPoolOptions;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gitstory::services::{
    ChatCompletionsGenerator, GitHubFetcher, PgStoryStore, PgTokenVerifier, ReqwestFetch,
    StoryService,
};
use gitstory::{AppState, Config, handlers, health_check};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gitstory=debug,actix_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().map_err(std::io::Error::other)?;

    info!("Starting GitStory server on {}:{}", config.host, config.port);

    // Create database connection pool
    let db_pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await
        .map_err(std::io::Error::other)?;

    info!("Database connection pool established");

    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .map_err(std::io::Error::other)?;

    info!("Database migrations completed");

    let http = ReqwestFetch::new().map_err(std::io::Error::other)?;
    let fetcher = GitHubFetcher::new(
        Arc::new(http),
        &config.github_api_url,
        config.github_token.clone(),
        Duration::from_secs(config.github_secondary_timeout_secs),
    );
    if config.github_token.is_none() {
        tracing::warn!("GITHUB_TOKEN not set, GitHub requests are unauthenticated");
    }

    let generator = ChatCompletionsGenerator::new(
        &config.generator_api_url,
        &config.generator_api_key,
        &config.generator_model,
        Duration::from_secs(config.generator_timeout_secs),
    )
    .map_err(std::io::Error::other)?;
    info!(model = %config.generator_model, "Story generator initialized");

    let stories = StoryService::new(
        fetcher,
        Arc::new(generator),
        Arc::new(PgStoryStore::new(db_pool.clone())),
        config.generator_max_tokens,
    );

    let server_addr = format!("{}:{}", config.host, config.port);

    let app_state = web::Data::new(AppState {
        config,
        stories,
        tokens: Arc::new(PgTokenVerifier::new(db_pool)),
    });

    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .route("/health", web::get().to(health_check))
            .service(
                web::scope("/v1")
                    .configure(handlers::configure_analysis_routes)
                    .configure(handlers::configure_story_routes)
                    .configure(handlers::configure_repository_routes),
            )
    })
    .bind(&server_addr)?
    .run()
    .await
}

use std::env;
use std::str::FromStr;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Database connection URL
    pub database_url: String,
    /// Maximum database connections in pool
    pub database_max_connections: u32,
    /// Server host address
    pub host: String,
    /// Server port
    pub port: u16,
    /// GitHub REST API base (default: https://api.github.com)
    pub github_api_url: String,
    /// Optional GitHub token, raises the unauthenticated rate limit
    pub github_token: Option<String>,
    /// Per-call timeout for contributors, languages and commit activity
    pub github_secondary_timeout_secs: u64,
    /// Chat-completions base URL
    pub generator_api_url: String,
    pub generator_api_key: String,
    pub generator_model: String,
    /// Output budget per story (default: 1200)
    pub generator_max_tokens: u32,
    pub generator_timeout_secs: u64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = env::var("DATABASE_URL")
            .map_err(|_| ConfigError::MissingEnvVar("DATABASE_URL"))?;

        let database_max_connections = parse_var("DATABASE_MAX_CONNECTIONS", "10")?;

        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

        let port = parse_var("PORT", "8080")?;

        let github_api_url =
            env::var("GITHUB_API_URL").unwrap_or_else(|_| "https://api.github.com".to_string());

        let github_token = env::var("GITHUB_TOKEN")
            .ok()
            .filter(|token| !token.trim().is_empty());

        let github_secondary_timeout_secs = parse_var("GITHUB_SECONDARY_TIMEOUT_SECS", "10")?;

        let generator_api_url = env::var("GENERATOR_API_URL")
            .unwrap_or_else(|_| "https://api.openai.com/v1".to_string());

        let generator_api_key = env::var("GENERATOR_API_KEY")
            .map_err(|_| ConfigError::MissingEnvVar("GENERATOR_API_KEY"))?;

        let generator_model =
            env::var("GENERATOR_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());

        let generator_max_tokens = parse_var("GENERATOR_MAX_TOKENS", "1200")?;

        let generator_timeout_secs = parse_var("GENERATOR_TIMEOUT_SECS", "120")?;

        Ok(Self {
            database_url,
            database_max_connections,
            host,
            port,
            github_api_url,
            github_token,
            github_secondary_timeout_secs,
            generator_api_url,
            generator_api_key,
            generator_model,
            generator_max_tokens,
            generator_timeout_secs,
        })
    }
}

fn parse_var<T: FromStr>(name: &'static str, default: &str) -> Result<T, ConfigError> {
    env::var(name)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .map_err(|_| ConfigError::InvalidValue(name))
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(&'static str),
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(&'static str),
}

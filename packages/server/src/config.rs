use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;
use std::time::Duration;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub port: u16,
    pub openai_api_key: String,
    pub openai_model: String,
    pub openai_base_url: Option<String>,
    pub openai_temperature: f32,
    /// Shared secret required on write requests. Empty disables auth.
    pub api_key: Option<String>,
    /// Allowed CORS origins. Empty means any origin.
    pub cors_origins: Vec<String>,
    /// Run the job runner inside the API process.
    pub run_job_runner: bool,
    pub job_poll_interval: Duration,
    pub generate_quizzes: bool,
    pub discovery: DiscoveryConfig,
}

/// Base URLs of the public search endpoints used for resource discovery.
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    pub wikipedia_api_url: String,
    pub brave_search_url: String,
    pub yahoo_search_url: String,
    pub youtube_search_url: String,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            wikipedia_api_url: "https://en.wikipedia.org/w/api.php".to_string(),
            brave_search_url: "https://search.brave.com/search".to_string(),
            yahoo_search_url: "https://search.yahoo.com/search".to_string(),
            youtube_search_url: "https://www.youtube.com/results".to_string(),
        }
    }
}

impl DiscoveryConfig {
    fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            wikipedia_api_url: env::var("WIKIPEDIA_API_URL")
                .unwrap_or(defaults.wikipedia_api_url),
            brave_search_url: env::var("BRAVE_SEARCH_URL").unwrap_or(defaults.brave_search_url),
            yahoo_search_url: env::var("YAHOO_SEARCH_URL").unwrap_or(defaults.yahoo_search_url),
            youtube_search_url: env::var("YOUTUBE_SEARCH_URL")
                .unwrap_or(defaults.youtube_search_url),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            database_max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .context("DATABASE_MAX_CONNECTIONS must be a valid number")?,
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("PORT must be a valid number")?,
            openai_api_key: env::var("OPENAI_API_KEY").context("OPENAI_API_KEY must be set")?,
            openai_model: env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            openai_base_url: env::var("OPENAI_BASE_URL").ok().filter(|v| !v.is_empty()),
            openai_temperature: env::var("OPENAI_TEMPERATURE")
                .unwrap_or_else(|_| "0.3".to_string())
                .parse()
                .context("OPENAI_TEMPERATURE must be a number")?,
            api_key: parse_api_key(env::var("API_KEY").ok()),
            cors_origins: parse_list(&env::var("CORS_ORIGINS").unwrap_or_default()),
            run_job_runner: parse_bool(env::var("RUN_JOB_RUNNER").ok().as_deref(), true),
            job_poll_interval: Duration::from_millis(
                env::var("JOB_POLL_INTERVAL_MS")
                    .unwrap_or_else(|_| "2000".to_string())
                    .parse()
                    .context("JOB_POLL_INTERVAL_MS must be a valid number")?,
            ),
            generate_quizzes: parse_bool(env::var("GENERATE_QUIZZES").ok().as_deref(), false),
            discovery: DiscoveryConfig::from_env(),
        })
    }
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Presented keys are compared trimmed, so the configured one is too.
fn parse_api_key(raw: Option<String>) -> Option<String> {
    raw.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parse_bool(raw: Option<&str>, default: bool) -> bool {
    match raw.map(|v| v.trim().to_ascii_lowercase()) {
        Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => true,
        Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => false,
        _ => default,
    }
}

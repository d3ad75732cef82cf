use anyhow::{Context, Result};

const DEFAULT_VAPI_API_URL: &str = "https://api.vapi.ai";

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing. The analysis key is optional.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub vapi_api_key: String,
    pub vapi_phone_number_id: String,
    pub vapi_api_url: String,
    /// Absent key means every analysis ends in `error` instead of a startup crash.
    pub anthropic_api_key: Option<String>,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            redis_url: require_env("REDIS_URL")?,
            vapi_api_key: require_env("VAPI_API_KEY")?,
            vapi_phone_number_id: require_env("VAPI_PHONE_NUMBER_ID")?,
            vapi_api_url: optional_env("VAPI_API_URL")
                .unwrap_or_else(|| DEFAULT_VAPI_API_URL.to_string()),
            anthropic_api_key: optional_env("ANTHROPIC_API_KEY"),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

/// Treats unset and blank values the same.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

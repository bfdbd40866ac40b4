//! Runtime configuration loaded from the environment.

use crate::error::CoaptError;

/// Default model used for filter/spec extraction
pub const DEFAULT_MODEL: &str = "claude-haiku-4-5-20251001";

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";
const DEFAULT_DATABASE_URL: &str = "postgresql://localhost:5432/coapt";

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub anthropic_api_key: String,
    pub model: String,
    pub bind_addr: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// `ANTHROPIC_API_KEY` is required; everything else has a default.
    pub fn from_env() -> Result<Self, CoaptError> {
        let anthropic_api_key = std::env::var("ANTHROPIC_API_KEY")
            .map_err(|_| CoaptError::Config("ANTHROPIC_API_KEY environment variable not set".into()))?;

        Ok(Self {
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string()),
            anthropic_api_key,
            model: std::env::var("COAPT_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            bind_addr: std::env::var("COAPT_BIND_ADDR")
                .unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string()),
        })
    }
}

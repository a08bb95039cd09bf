//! Store configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `WICKER_API_URL` - Base URL of the catalog/stock service
//!
//! ## Optional
//! - `WICKER_STORAGE_DIR` - Directory for persisted cart snapshots
//!   (default: .wicker)

use std::path::PathBuf;

use thiserror::Error;
use url::Url;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Cart store configuration.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Base URL of the remote catalog/stock service.
    pub api_url: Url,
    /// Directory the persisted cart snapshot lives in.
    pub storage_dir: PathBuf,
}

impl StoreConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let api_url = parse_base_url(&get_required_env("WICKER_API_URL")?)
            .map_err(|e| ConfigError::InvalidEnvVar("WICKER_API_URL".to_string(), e.to_string()))?;
        let storage_dir = PathBuf::from(get_env_or_default("WICKER_STORAGE_DIR", ".wicker"));

        Ok(Self {
            api_url,
            storage_dir,
        })
    }

    /// Build a configuration directly, bypassing the environment.
    #[must_use]
    pub fn new(api_url: Url, storage_dir: impl Into<PathBuf>) -> Self {
        Self {
            api_url,
            storage_dir: storage_dir.into(),
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse a base URL, forcing a trailing slash so endpoint joins append to
/// the path instead of replacing its last segment.
fn parse_base_url(raw: &str) -> Result<Url, url::ParseError> {
    if raw.ends_with('/') {
        Url::parse(raw)
    } else {
        Url::parse(&format!("{raw}/"))
    }
}

//! Application configuration loaded from environment variables.
//!
//! Values are read once at startup. Secrets (the JWT signing key) are
//! injected as environment variables by the deployment.

use std::env;
use std::str::FromStr;

use crate::models::streak::{StreakDefaults, MAX_DAILY_THRESHOLD, MIN_DAILY_THRESHOLD};
use crate::time_utils::parse_timezone;

/// Which streak/progress store backs the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Firestore,
    /// Process-local store, contents lost on restart
    Memory,
}

impl FromStr for StorageBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "firestore" => Ok(Self::Firestore),
            "memory" => Ok(Self::Memory),
            other => Err(ConfigError::Invalid("STORAGE", other.to_string())),
        }
    }
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Frontend URL allowed by CORS
    pub frontend_url: String,
    /// GCP project ID
    pub gcp_project_id: String,
    /// Server port
    pub port: u16,
    /// Storage backend for streaks and progress
    pub storage: StorageBackend,
    /// When false, every request operates on the single global streak
    pub multi_user: bool,
    /// Timezone given to newly created streak records
    pub default_timezone: String,
    /// Daily page threshold given to newly created streak records
    pub default_daily_threshold: u32,
    /// JWT signing key for session tokens (raw bytes)
    pub jwt_signing_key: Vec<u8>,
}

impl Config {
    /// Config for tests: in-memory storage, multi-user, UTC.
    pub fn test_default() -> Self {
        Self {
            frontend_url: "http://localhost:5173".to_string(),
            gcp_project_id: "test-project".to_string(),
            port: 8080,
            storage: StorageBackend::Memory,
            multi_user: true,
            default_timezone: "UTC".to_string(),
            default_daily_threshold: MIN_DAILY_THRESHOLD,
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// A `.env` file is honored for local development.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let default_timezone = env::var("DEFAULT_TIMEZONE").unwrap_or_else(|_| "UTC".to_string());
        parse_timezone(&default_timezone)
            .map_err(|_| ConfigError::Invalid("DEFAULT_TIMEZONE", default_timezone.clone()))?;

        let default_daily_threshold = match env::var("DEFAULT_DAILY_THRESHOLD") {
            Ok(raw) => parse_threshold(&raw)?,
            Err(_) => MIN_DAILY_THRESHOLD,
        };

        Ok(Self {
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            storage: env::var("STORAGE")
                .map(|v| v.parse())
                .unwrap_or(Ok(StorageBackend::Firestore))?,
            multi_user: env::var("MULTI_USER")
                .map(|v| !matches!(v.trim(), "0" | "false" | "no"))
                .unwrap_or(true),
            default_timezone,
            default_daily_threshold,
            jwt_signing_key: env::var("JWT_SIGNING_KEY")
                .map_err(|_| ConfigError::Missing("JWT_SIGNING_KEY"))?
                .into_bytes(),
        })
    }

    /// Settings applied to lazily created streak records.
    pub fn streak_defaults(&self) -> StreakDefaults {
        StreakDefaults {
            daily_threshold: self.default_daily_threshold,
            timezone: self.default_timezone.clone(),
        }
    }

    /// The streak owner for an authenticated user under the current mode.
    pub fn streak_owner(&self, user_id: u64) -> Option<u64> {
        self.multi_user.then_some(user_id)
    }
}

fn parse_threshold(raw: &str) -> Result<u32, ConfigError> {
    raw.trim()
        .parse::<u32>()
        .ok()
        .filter(|t| (MIN_DAILY_THRESHOLD..=MAX_DAILY_THRESHOLD).contains(t))
        .ok_or_else(|| ConfigError::Invalid("DEFAULT_DAILY_THRESHOLD", raw.to_string()))
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}

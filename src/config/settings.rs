//! Startup settings for the synchronization layer.
//!
//! Settings are read once from environment-style variables when the host
//! starts. Nothing here is written back anywhere.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::ServiceKey;

/// Base URL for the `/api/*` endpoints.
pub const ENV_API_BASE: &str = "MAILTRIAGE_API_BASE";
/// Health URL of the mail parser.
pub const ENV_MAIL_PARSER_HEALTH: &str = "MAILTRIAGE_MAIL_PARSER_HEALTH";
/// Health URL of the MetaMCP hub.
pub const ENV_METAMCP_HEALTH: &str = "MAILTRIAGE_METAMCP_HEALTH";
/// Selects the in-memory fixture backend.
pub const ENV_USE_FIXTURES: &str = "MAILTRIAGE_USE_FIXTURES";
/// Live request timeout in milliseconds.
pub const ENV_TIMEOUT_MS: &str = "MAILTRIAGE_TIMEOUT_MS";
/// Search debounce interval in milliseconds.
pub const ENV_SEARCH_DEBOUNCE_MS: &str = "MAILTRIAGE_SEARCH_DEBOUNCE_MS";

const DEFAULT_API_BASE: &str = "http://localhost";
const DEFAULT_METAMCP_HEALTH: &str = "http://localhost:3001/health";

/// Errors raised while reading settings.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A boolean variable held something other than true/false.
    #[error("{var}: expected true or false, got {value:?}")]
    InvalidBool { var: &'static str, value: String },

    /// A numeric variable could not be parsed.
    #[error("{var}: expected a non-negative integer, got {value:?}")]
    InvalidNumber { var: &'static str, value: String },

    /// A URL variable could not be parsed.
    #[error("{var}: invalid URL {value:?}: {reason}")]
    InvalidUrl {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Top-level settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Email API access.
    pub api: ApiSettings,
    /// Per-service health endpoints.
    pub health: HealthSettings,
    /// Search input behaviour.
    pub search: SearchSettings,
}

impl Default for Settings {
    fn default() -> Self {
        let api = ApiSettings::default();
        let health = HealthSettings::for_api_base(&api.base_url);
        Self {
            api,
            health,
            search: SearchSettings::default(),
        }
    }
}

/// Email API configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiSettings {
    /// Base URL; endpoint paths are appended to it.
    pub base_url: String,
    /// Bound on every live request.
    #[serde(with = "duration_ms")]
    pub timeout: Duration,
    /// Serve every call from the in-memory fixtures instead of the network.
    pub use_fixtures: bool,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE.to_string(),
            timeout: Duration::from_secs(10),
            use_fixtures: false,
        }
    }
}

/// Health endpoint for each known service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthSettings {
    pub mail_parser_url: String,
    pub metamcp_url: String,
}

impl HealthSettings {
    /// Defaults relative to the API base: the mail parser serves
    /// `/api/health` next to the email endpoints.
    pub fn for_api_base(base_url: &str) -> Self {
        Self {
            mail_parser_url: format!("{}/api/health", base_url.trim_end_matches('/')),
            metamcp_url: DEFAULT_METAMCP_HEALTH.to_string(),
        }
    }

    /// Returns the endpoint polled for `key`.
    pub fn url_for(&self, key: ServiceKey) -> &str {
        match key {
            ServiceKey::MailParser => &self.mail_parser_url,
            ServiceKey::MetaMcp => &self.metamcp_url,
        }
    }
}

/// Search input configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchSettings {
    /// Quiet period before a typed search is dispatched.
    #[serde(with = "duration_ms")]
    pub debounce: Duration,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(300),
        }
    }
}

impl Settings {
    /// Reads settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Reads settings through an arbitrary variable lookup.
    ///
    /// Unset or empty variables fall back to defaults; malformed values are
    /// errors.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let base_url = match get(ENV_API_BASE) {
            Some(url) => validate_url(ENV_API_BASE, url)?,
            None => DEFAULT_API_BASE.to_string(),
        };
        let defaults = HealthSettings::for_api_base(&base_url);

        let mail_parser_url = match get(ENV_MAIL_PARSER_HEALTH) {
            Some(url) => validate_url(ENV_MAIL_PARSER_HEALTH, url)?,
            None => defaults.mail_parser_url,
        };
        let metamcp_url = match get(ENV_METAMCP_HEALTH) {
            Some(url) => validate_url(ENV_METAMCP_HEALTH, url)?,
            None => defaults.metamcp_url,
        };

        let use_fixtures = match get(ENV_USE_FIXTURES) {
            Some(value) => parse_bool(ENV_USE_FIXTURES, value)?,
            None => false,
        };

        let timeout = match get(ENV_TIMEOUT_MS) {
            Some(value) => Duration::from_millis(parse_u64(ENV_TIMEOUT_MS, value)?),
            None => ApiSettings::default().timeout,
        };
        let debounce = match get(ENV_SEARCH_DEBOUNCE_MS) {
            Some(value) => Duration::from_millis(parse_u64(ENV_SEARCH_DEBOUNCE_MS, value)?),
            None => SearchSettings::default().debounce,
        };

        Ok(Self {
            api: ApiSettings {
                base_url,
                timeout,
                use_fixtures,
            },
            health: HealthSettings {
                mail_parser_url,
                metamcp_url,
            },
            search: SearchSettings { debounce },
        })
    }
}

fn parse_bool(var: &'static str, value: String) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(ConfigError::InvalidBool { var, value }),
    }
}

fn parse_u64(var: &'static str, value: String) -> Result<u64, ConfigError> {
    value
        .parse()
        .map_err(|_| ConfigError::InvalidNumber { var, value })
}

fn validate_url(var: &'static str, value: String) -> Result<String, ConfigError> {
    match url::Url::parse(&value) {
        Ok(_) => Ok(value),
        Err(e) => Err(ConfigError::InvalidUrl {
            var,
            value,
            reason: e.to_string(),
        }),
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

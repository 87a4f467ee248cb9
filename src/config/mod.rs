//! Configuration and settings.
//!
//! Settings are read once at startup from environment-style variables; see
//! [`Settings::from_env`].

mod settings;

pub use settings::{
    ApiSettings, ConfigError, HealthSettings, SearchSettings, Settings, ENV_API_BASE,
    ENV_MAIL_PARSER_HEALTH, ENV_METAMCP_HEALTH, ENV_SEARCH_DEBOUNCE_MS, ENV_TIMEOUT_MS,
    ENV_USE_FIXTURES,
};

//! Health types for the external services polled by the dashboard.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::types::timestamp;

/// The closed set of services the dashboard knows how to poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ServiceKey {
    /// The mail-parser API that also serves `/api/emails`.
    MailParser,
    /// The MetaMCP hub.
    #[serde(rename = "metamcp")]
    MetaMcp,
}

impl ServiceKey {
    /// Every known service, in display order.
    pub const ALL: [ServiceKey; 2] = [ServiceKey::MailParser, ServiceKey::MetaMcp];

    /// Stable machine key.
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceKey::MailParser => "mail-parser",
            ServiceKey::MetaMcp => "metamcp",
        }
    }

    /// Human-readable name.
    pub fn display_name(&self) -> &'static str {
        match self {
            ServiceKey::MailParser => "Mail Parser",
            ServiceKey::MetaMcp => "MetaMCP",
        }
    }

    /// Resolves a stable key or a display name, ignoring case.
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|key| {
            key.as_str().eq_ignore_ascii_case(name) || key.display_name().eq_ignore_ascii_case(name)
        })
    }
}

impl fmt::Display for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One health report returned by a service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub ok: bool,
    #[serde(
        default,
        rename = "service",
        skip_serializing_if = "Option::is_none"
    )]
    pub service_name: Option<String>,
    #[serde(
        default,
        deserialize_with = "timestamp::option::deserialize",
        skip_serializing_if = "Option::is_none"
    )]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Map<String, serde_json::Value>>,
}

impl HealthStatus {
    /// A healthy report stamped with the current time.
    pub fn healthy(service: ServiceKey) -> Self {
        Self {
            ok: true,
            service_name: Some(service.as_str().to_string()),
            timestamp: Some(Utc::now()),
            details: None,
        }
    }
}

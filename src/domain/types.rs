//! Core identifier and timestamp types for domain entities.
//!
//! Identifiers are newtype wrappers so an email id can never be passed where
//! an account id is expected.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier assigned to an email by the origin system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmailId(pub i64);

impl fmt::Display for EmailId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for EmailId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Unique identifier for a configured mailbox account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(pub String);

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for AccountId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for AccountId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Lenient ISO-8601 decoding.
///
/// The origin services emit both RFC 3339 timestamps and naive
/// `YYYY-MM-DDTHH:MM:SS[.fff]` values; naive values are read as UTC.
/// Serialization always produces RFC 3339 through chrono's own impl.
pub(crate) mod timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer};

    pub fn parse(value: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(value)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
                    .ok()
                    .map(|naive| naive.and_utc())
            })
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}")))
    }

    pub mod option {
        use chrono::{DateTime, Utc};
        use serde::{Deserialize, Deserializer};

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
        where
            D: Deserializer<'de>,
        {
            match Option::<String>::deserialize(deserializer)? {
                None => Ok(None),
                Some(raw) => super::parse(&raw).map(Some).ok_or_else(|| {
                    serde::de::Error::custom(format!("invalid timestamp: {raw}"))
                }),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn email_id_is_transparent_on_the_wire() {
        let id: EmailId = serde_json::from_str("42").unwrap();
        assert_eq!(id, EmailId(42));
        assert_eq!(serde_json::to_string(&id).unwrap(), "42");
        assert_eq!(id.to_string(), "42");
    }

    #[test]
    fn timestamp_accepts_rfc3339_and_naive() {
        let zulu = timestamp::parse("2024-09-15T14:30:00Z").unwrap();
        let naive = timestamp::parse("2024-09-15T14:30:00.123456").unwrap();

        assert_eq!(zulu.day(), 15);
        assert_eq!(zulu.hour(), 14);
        assert_eq!(naive.minute(), 30);
        assert!(timestamp::parse("yesterday").is_none());
    }

    #[test]
    fn timestamp_with_offset_is_normalized_to_utc() {
        let parsed = timestamp::parse("2024-09-15T16:30:00+02:00").unwrap();
        assert_eq!(parsed.hour(), 14);
    }
}

//! Mailbox account types.
//!
//! Accounts scope the email list: the active account's id is forwarded as the
//! `account` list parameter.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::types::timestamp;
use super::AccountId;

/// A mailbox the dashboard can triage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailAccount {
    /// Unique identifier for this account.
    pub id: AccountId,
    /// Display name shown in the sidebar.
    pub name: String,
    /// Mailbox address.
    pub email: String,
    /// Hosting provider.
    pub provider: AccountProvider,
    /// Whether fetching is enabled for this account.
    pub active: bool,
    /// Last successful fetch.
    #[serde(
        default,
        deserialize_with = "timestamp::option::deserialize",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_sync: Option<DateTime<Utc>>,
}

impl EmailAccount {
    /// Creates an active account whose provider is inferred from the address.
    pub fn new(id: impl Into<AccountId>, name: impl Into<String>, email: impl Into<String>) -> Self {
        let email = email.into();
        Self {
            id: id.into(),
            name: name.into(),
            provider: AccountProvider::from_address(&email),
            email,
            active: true,
            last_sync: None,
        }
    }
}

/// Hosting provider of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountProvider {
    Gmail,
    Outlook,
    Custom,
}

impl AccountProvider {
    /// Classifies an address by its domain.
    pub fn from_address(address: &str) -> Self {
        let address = address.to_ascii_lowercase();
        if address.contains("@gmail.com") {
            AccountProvider::Gmail
        } else if address.contains("@hotmail.com") || address.contains("@outlook.com") {
            AccountProvider::Outlook
        } else {
            AccountProvider::Custom
        }
    }
}

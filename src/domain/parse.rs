//! Submission of a raw email to the parse endpoint.

use serde::{Deserialize, Serialize};

use super::{EmailId, Provider};

/// Body of `POST /api/parse`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseEmailRequest {
    /// Full RFC 5322 message.
    pub raw_email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<Provider>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mailbox: Option<String>,
}

impl ParseEmailRequest {
    /// Creates a request carrying only the raw message.
    pub fn new(raw_email: impl Into<String>) -> Self {
        Self {
            raw_email: raw_email.into(),
            provider: None,
            external_id: None,
            mailbox: None,
        }
    }

    /// Tags the submission with its origin.
    pub fn provider(mut self, provider: Provider) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Sets the provider-side message id.
    pub fn external_id(mut self, external_id: impl Into<String>) -> Self {
        self.external_id = Some(external_id.into());
        self
    }

    /// Sets the mailbox name.
    pub fn mailbox(mut self, mailbox: impl Into<String>) -> Self {
        self.mailbox = Some(mailbox.into());
        self
    }
}

/// Result of a parse submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseEmailResponse {
    pub id: EmailId,
    pub from_addr: String,
    pub to_addr: String,
    pub subject: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub processed: bool,
    pub status: String,
}

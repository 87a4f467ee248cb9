//! Email domain types.
//!
//! Records as produced by the origin system, together with their optional
//! analysis and attachments. The client never edits these in place; a refetch
//! replaces them wholesale.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::types::timestamp;
use super::EmailId;

/// Observed analysis categories. The set is open; these are the values the
/// classifier is known to emit.
pub mod category {
    pub const FACTURE: &str = "facture";
    pub const COMMANDE: &str = "commande";
    pub const SUPPORT: &str = "support";
    pub const COMMERCIAL: &str = "commercial";
    pub const URGENT: &str = "urgent";
    pub const GENERAL: &str = "general";
}

/// Observed sentiment labels.
pub mod sentiment {
    pub const POSITIF: &str = "positif";
    pub const NEGATIF: &str = "negatif";
    pub const NEUTRE: &str = "neutre";
}

/// Origin of an email record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Gmail API ingestion.
    Gmail,
    /// Outlook / Microsoft Graph ingestion.
    Outlook,
    /// Generic IMAP fetcher.
    Imap,
    /// Submitted by hand through the parse endpoint.
    Manual,
}

/// An email record owned by the origin system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Email {
    /// Identifier assigned by the origin system.
    pub id: EmailId,
    /// Which ingestion path produced this record.
    pub provider: Provider,
    /// Provider-side message id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    /// Sender address.
    pub from_addr: String,
    /// Recipient address.
    pub to_addr: String,
    /// Carbon copy addresses, as one header value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cc_addr: Option<String>,
    /// Subject line.
    pub subject: String,
    /// When the sender sent it.
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub sent_at: DateTime<Utc>,
    /// When the fetcher received it.
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub received_at: DateTime<Utc>,
    /// Raw header block.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_headers: Option<String>,
    /// Raw body text.
    pub raw_body: String,
    /// Mailbox the record was fetched from.
    pub mailbox: String,
    /// Whether the analysis pipeline has run.
    pub processed: bool,
    /// When the analysis pipeline ran.
    #[serde(
        default,
        deserialize_with = "timestamp::option::deserialize",
        skip_serializing_if = "Option::is_none"
    )]
    pub processed_at: Option<DateTime<Utc>>,
    /// Processing failure, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Classifier output for one email.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailAnalysis {
    pub id: i64,
    pub email_id: EmailId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<String>,
    /// Confidence in `[0, 1]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub created_at: DateTime<Utc>,
}

/// A file attached to an email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailAttachment {
    pub id: i64,
    pub email_id: EmailId,
    pub filename: String,
    pub mime_type: String,
    pub size_bytes: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_uri: Option<String>,
}

/// Read-only composite of an email, its analysis and its attachments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailWithAnalysis {
    #[serde(flatten)]
    pub email: Email,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<EmailAnalysis>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub attachments: Vec<EmailAttachment>,
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

impl EmailWithAnalysis {
    /// Returns the record's identifier.
    pub fn id(&self) -> EmailId {
        self.email.id
    }

    /// Returns the analysis category, if the record has been classified.
    pub fn category(&self) -> Option<&str> {
        self.analysis.as_ref()?.category.as_deref()
    }

    /// Returns the analysis sentiment, if the record has been classified.
    pub fn sentiment(&self) -> Option<&str> {
        self.analysis.as_ref()?.sentiment.as_deref()
    }

    /// Checks the processing invariants of the record.
    ///
    /// A processed email carries `processed_at`; an unprocessed one carries
    /// no analysis and its score, when present, lies in `[0, 1]`.
    pub fn is_consistent(&self) -> bool {
        let timestamps_ok = !self.email.processed || self.email.processed_at.is_some();
        let analysis_ok = self.email.processed || self.analysis.is_none();
        let score_ok = self
            .analysis
            .as_ref()
            .and_then(|a| a.score)
            .map_or(true, |s| (0.0..=1.0).contains(&s));
        timestamps_ok && analysis_ok && score_ok
    }
}

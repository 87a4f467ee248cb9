//! Transport gateway trait definition.
//!
//! [`Gateway`] is the single seam between the stores and whatever answers
//! their requests. Every call resolves to a fully parsed payload or a
//! [`GatewayError`]; nothing partially decoded ever crosses this boundary and
//! no call is retried here.

use async_trait::async_trait;

use crate::domain::{
    EmailId, EmailListParams, EmailStats, EmailWithAnalysis, HealthStatus, PaginatedResponse,
    ParseEmailRequest, ParseEmailResponse, ServiceKey,
};

/// Result type alias for gateway operations.
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Normalized gateway failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    /// Timeout, refused connection or an unavailable server.
    #[error("network failure: {0}")]
    Network(String),

    /// The peer answered with something that is not the expected payload.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// The requested entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),
}

/// A page of analyzed emails.
pub type EmailPage = PaginatedResponse<EmailWithAnalysis>;

/// Transport contract shared by the live and fixture backends.
///
/// Callers hold an `Arc<dyn Gateway>` chosen once at startup and cannot tell
/// which backend answers.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Short backend name used in log lines.
    fn backend(&self) -> &'static str;

    /// Fetches one filtered page of emails.
    async fn fetch_emails(&self, params: &EmailListParams) -> Result<EmailPage>;

    /// Fetches a single email.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::NotFound`] when no email has this id.
    async fn fetch_email(&self, id: EmailId) -> Result<EmailWithAnalysis>;

    /// Fetches the origin system's counters.
    async fn fetch_stats(&self) -> Result<EmailStats>;

    /// Polls the health endpoint of one service.
    async fn fetch_health(&self, service: ServiceKey) -> Result<HealthStatus>;

    /// Submits a raw email for parsing and analysis.
    async fn parse_email(&self, request: &ParseEmailRequest) -> Result<ParseEmailResponse>;
}

//! Domain layer types for the triage dashboard.
//!
//! Analyzed-email records, list queries and their paginated envelope,
//! statistics, service health reports and mailbox accounts.

mod account;
mod email;
mod health;
mod parse;
mod query;
mod stats;
mod types;

pub use account::{AccountProvider, EmailAccount};
pub use email::{
    category, sentiment, Email, EmailAnalysis, EmailAttachment, EmailWithAnalysis, Provider,
};
pub use health::{HealthStatus, ServiceKey};
pub use parse::{ParseEmailRequest, ParseEmailResponse};
pub use query::{EmailListParams, PaginatedResponse, DEFAULT_LIMIT};
pub use stats::EmailStats;
pub use types::{AccountId, EmailId};

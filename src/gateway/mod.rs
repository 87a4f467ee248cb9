//! Transport gateway implementations.
//!
//! This module contains the [`Gateway`] trait and its two backends:
//!
//! - [`HttpGateway`] - live calls against the mail-parser API and health URLs
//! - [`FixtureGateway`] - deterministic in-memory dataset with simulated latency
//!
//! The backend is picked once, at startup, by [`connect`]. Stores only ever
//! see an `Arc<dyn Gateway>`.
//!
//! # Example
//!
//! ```no_run
//! use mailtriage::config::Settings;
//! use mailtriage::domain::EmailListParams;
//! use mailtriage::gateway;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = Settings::from_env()?;
//! let gateway = gateway::connect(&settings)?;
//!
//! let page = gateway
//!     .fetch_emails(&EmailListParams::new().category("support"))
//!     .await?;
//! println!("{} matching emails", page.total);
//! # Ok(())
//! # }
//! ```

mod fixture;
mod http;
mod traits;

use std::sync::Arc;

use crate::config::Settings;

pub use fixture::{sample_records, FixtureGateway, ITEM_LATENCY, LIST_LATENCY};
pub use http::HttpGateway;
#[cfg(test)]
pub use traits::MockGateway;
pub use traits::{EmailPage, Gateway, GatewayError, Result};

/// Builds the backend selected by `settings.api.use_fixtures`.
pub fn connect(settings: &Settings) -> Result<Arc<dyn Gateway>> {
    let gateway: Arc<dyn Gateway> = if settings.api.use_fixtures {
        Arc::new(FixtureGateway::new())
    } else {
        Arc::new(HttpGateway::new(settings)?)
    };

    tracing::info!(
        backend = gateway.backend(),
        base_url = %settings.api.base_url,
        "transport gateway ready"
    );
    Ok(gateway)
}

//! Stores and coordination services.
//!
//! Services own all mutable dashboard state and sit between the view layer
//! and the transport gateway:
//!
//! ```text
//! View Layer (subscribers, intents)
//!          |
//!          v
//!    Services Layer  <-- You are here
//!          |
//!          v
//!   Transport Gateway (HTTP or fixtures)
//! ```
//!
//! # Services Overview
//!
//! - [`EmailStore`]: current email page, selection, stats and lifecycle
//! - [`HealthMonitor`]: per-service health entries and the overall status
//! - [`InboxController`]: debounced search and filter chips feeding the store
//! - [`Debouncer`]: keyed cancellable timers

mod debounce;
mod email_store;
mod filters;
mod health_monitor;
mod inbox;

pub use debounce::Debouncer;
pub use email_store::{EmailState, EmailStore, Lifecycle, PageInfo};
pub use filters::{Dispatch, FilterIntent, InboxFilters};
pub use health_monitor::{
    CheckState, HealthError, HealthMonitor, OverallStatus, ServiceHealthEntry,
};
pub use inbox::InboxController;

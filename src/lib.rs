//! mailtriage - data synchronization layer for an analyzed-email triage dashboard
//!
//! This crate owns the dashboard's data: it fetches analyzed emails, stats and
//! service health through a swappable transport gateway (live HTTP or
//! fixtures) and exposes them as observable stores for a view layer.

pub mod app;
pub mod config;
pub mod domain;
pub mod gateway;
pub mod logging;
pub mod services;

pub use app::{AppState, Dashboard};

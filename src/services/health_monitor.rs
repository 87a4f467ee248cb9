//! Service health monitor.
//!
//! The [`HealthMonitor`] keeps one [`ServiceHealthEntry`] per registered
//! service and polls them independently: a slow or failing service never
//! affects another entry. [`HealthMonitor::check_all`] fans out to every
//! service concurrently and derives an [`OverallStatus`] once all checks
//! have settled.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use tokio::sync::watch;

use crate::domain::{HealthStatus, ServiceKey};
use crate::gateway::Gateway;

/// Result type alias for health operations.
pub type Result<T> = std::result::Result<T, HealthError>;

/// Errors raised by the health monitor itself.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HealthError {
    /// The requested service is not registered with this monitor.
    #[error("unknown service: {0}")]
    UnknownService(String),
}

/// Check state of a single service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CheckState {
    /// Never checked.
    #[default]
    Idle,
    /// A check is in flight.
    Checking,
    /// The service answered `ok: true`.
    Healthy,
    /// The service answered but reported `ok: false`.
    Unhealthy,
    /// The check itself failed.
    Error,
}

impl CheckState {
    /// Returns whether the state is a settled failure.
    pub fn is_failure(&self) -> bool {
        matches!(self, CheckState::Unhealthy | CheckState::Error)
    }
}

/// Aggregate status of every registered service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverallStatus {
    /// Some service has not settled yet.
    Pending,
    /// Every service is healthy.
    Healthy,
    /// At least one service is unhealthy or unreachable.
    Degraded,
}

impl OverallStatus {
    /// Folds per-service states into an aggregate.
    ///
    /// Unsettled services take precedence over failures.
    pub fn from_states(states: impl IntoIterator<Item = CheckState>) -> Self {
        let mut degraded = false;
        for state in states {
            match state {
                CheckState::Idle | CheckState::Checking => return OverallStatus::Pending,
                CheckState::Unhealthy | CheckState::Error => degraded = true,
                CheckState::Healthy => {}
            }
        }

        if degraded {
            OverallStatus::Degraded
        } else {
            OverallStatus::Healthy
        }
    }
}

/// Health record for one service.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceHealthEntry {
    pub key: ServiceKey,
    /// Human-readable service name.
    pub name: &'static str,
    /// Last report received, kept across failed checks.
    pub status: Option<HealthStatus>,
    pub state: CheckState,
    /// Message of the last failed check.
    pub error: Option<String>,
    /// When the last check settled.
    pub checked_at: Option<DateTime<Utc>>,
    epoch: u64,
}

impl ServiceHealthEntry {
    fn new(key: ServiceKey) -> Self {
        Self {
            key,
            name: key.display_name(),
            status: None,
            state: CheckState::Idle,
            error: None,
            checked_at: None,
            epoch: 0,
        }
    }

    /// Returns whether a check is in flight.
    pub fn is_checking(&self) -> bool {
        self.state == CheckState::Checking
    }
}

/// Polls the health endpoints of a fixed set of services.
pub struct HealthMonitor {
    gateway: Arc<dyn Gateway>,
    entries: watch::Sender<BTreeMap<ServiceKey, ServiceHealthEntry>>,
}

impl HealthMonitor {
    /// Creates a monitor for `services`, all starting idle.
    pub fn new(gateway: Arc<dyn Gateway>, services: impl IntoIterator<Item = ServiceKey>) -> Self {
        let entries = services
            .into_iter()
            .map(|key| (key, ServiceHealthEntry::new(key)))
            .collect();
        let (entries, _) = watch::channel(entries);
        Self { gateway, entries }
    }

    /// Creates a monitor for every known service.
    pub fn with_all_services(gateway: Arc<dyn Gateway>) -> Self {
        Self::new(gateway, ServiceKey::ALL)
    }

    /// Subscribes to entry snapshots.
    pub fn subscribe(&self) -> watch::Receiver<BTreeMap<ServiceKey, ServiceHealthEntry>> {
        self.entries.subscribe()
    }

    /// Returns the registered entries in display order.
    pub fn entries(&self) -> Vec<ServiceHealthEntry> {
        self.entries.borrow().values().cloned().collect()
    }

    /// Returns the entry for `key`, if registered.
    pub fn entry(&self, key: ServiceKey) -> Option<ServiceHealthEntry> {
        self.entries.borrow().get(&key).cloned()
    }

    /// Aggregate status of the current entries.
    pub fn overall(&self) -> OverallStatus {
        OverallStatus::from_states(self.entries.borrow().values().map(|entry| entry.state))
    }

    /// Checks a service identified by key or display name.
    pub async fn check_named(&self, name: &str) -> Result<CheckState> {
        let key =
            ServiceKey::parse(name).ok_or_else(|| HealthError::UnknownService(name.to_string()))?;
        self.check_one(key).await
    }

    /// Checks a single service and returns the state this check settled on.
    ///
    /// If another check of the same service is issued before this one
    /// settles, this result is not applied to the entry.
    ///
    /// # Errors
    ///
    /// Returns [`HealthError::UnknownService`] when `key` is not registered.
    /// Check failures are recorded on the entry, not returned.
    pub async fn check_one(&self, key: ServiceKey) -> Result<CheckState> {
        let epoch = self.begin(key)?;
        tracing::debug!(service = %key, epoch, "checking service health");

        let result = self.gateway.fetch_health(key).await;
        let state = match &result {
            Ok(status) if status.ok => CheckState::Healthy,
            Ok(_) => CheckState::Unhealthy,
            Err(_) => CheckState::Error,
        };

        self.entries.send_modify(|entries| {
            let Some(entry) = entries.get_mut(&key) else {
                return;
            };
            if entry.epoch != epoch {
                tracing::debug!(service = %key, epoch, "discarding stale health result");
                return;
            }

            entry.state = state;
            entry.checked_at = Some(Utc::now());
            match result {
                Ok(status) => {
                    if !status.ok {
                        tracing::warn!(service = %key, "service reports unhealthy");
                    }
                    entry.status = Some(status);
                }
                Err(e) => {
                    tracing::warn!(service = %key, error = %e, "health check failed");
                    entry.error = Some(e.to_string());
                }
            }
        });

        Ok(state)
    }

    /// Checks every registered service concurrently.
    ///
    /// Returns the aggregate of the entries once no check on any of them,
    /// including checks issued by other callers, is still in flight.
    pub async fn check_all(&self) -> OverallStatus {
        let keys: Vec<ServiceKey> = self.entries.borrow().keys().copied().collect();
        join_all(keys.into_iter().map(|key| self.check_one(key))).await;

        let mut entries = self.entries.subscribe();
        let overall = match entries
            .wait_for(|entries| !entries.values().any(ServiceHealthEntry::is_checking))
            .await
        {
            Ok(settled) => OverallStatus::from_states(settled.values().map(|entry| entry.state)),
            Err(_) => self.overall(),
        };
        tracing::info!(?overall, "health check round complete");
        overall
    }

    fn begin(&self, key: ServiceKey) -> Result<u64> {
        let mut epoch = None;
        self.entries.send_if_modified(|entries| match entries.get_mut(&key) {
            Some(entry) => {
                entry.epoch += 1;
                entry.state = CheckState::Checking;
                entry.error = None;
                epoch = Some(entry.epoch);
                true
            }
            None => false,
        });
        epoch.ok_or_else(|| HealthError::UnknownService(key.to_string()))
    }
}

//! Dashboard composition and host-level state.
//!
//! [`Dashboard`] wires the gateway, stores and inbox controller together for
//! an embedding view layer, and keeps [`AppState`] in step with the inbox
//! scope.

mod state;

use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use crate::config::Settings;
use crate::domain::{AccountId, EmailAccount};
use crate::gateway::{self, Gateway};
use crate::services::{EmailStore, HealthMonitor, InboxController, OverallStatus};

pub use state::AppState;

/// Entry point for a view layer.
pub struct Dashboard {
    state: RwLock<AppState>,
    /// Held across an account switch so `state` and the inbox scope change
    /// in the same order.
    switching: Mutex<()>,
    health: HealthMonitor,
    inbox: InboxController,
}

impl Dashboard {
    /// Builds a dashboard on the backend selected by `settings`.
    pub fn new(settings: Settings) -> gateway::Result<Self> {
        let gateway = gateway::connect(&settings)?;
        Ok(Self::with_gateway(settings, gateway))
    }

    /// Builds a dashboard on an existing gateway.
    pub fn with_gateway(settings: Settings, gateway: Arc<dyn Gateway>) -> Self {
        let store = Arc::new(EmailStore::new(Arc::clone(&gateway)));
        let inbox = InboxController::from_settings(store, &settings.search);
        let health = HealthMonitor::with_all_services(gateway);

        Self {
            state: RwLock::new(AppState::new(settings)),
            switching: Mutex::new(()),
            health,
            inbox,
        }
    }

    /// Loads the first page, stats and every health entry.
    ///
    /// Returns the overall health once all checks have settled.
    pub async fn start(&self) -> OverallStatus {
        tracing::info!("starting dashboard");
        let ((), overall) = tokio::join!(self.inbox.refresh(), self.health.check_all());
        overall
    }

    /// Replaces the account list and rescopes the inbox to the active one.
    pub async fn set_accounts(&self, accounts: Vec<EmailAccount>) {
        let _switching = self.switching.lock().await;
        let active = {
            let mut state = self.state.write().await;
            state.set_accounts(accounts);
            state.active_account_id.clone()
        };
        self.inbox.set_account(active).await;
    }

    /// Switches the active account.
    ///
    /// Returns `false` for an account that is not listed.
    pub async fn select_account(&self, account_id: Option<AccountId>) -> bool {
        let _switching = self.switching.lock().await;
        {
            let mut state = self.state.write().await;
            if !state.set_active_account(account_id.clone()) {
                tracing::warn!(?account_id, "ignoring unknown account");
                return false;
            }
        }
        self.inbox.set_account(account_id).await;
        true
    }

    /// Snapshot of the host state.
    pub async fn state(&self) -> AppState {
        self.state.read().await.clone()
    }

    pub fn emails(&self) -> &Arc<EmailStore> {
        self.inbox.store()
    }

    pub fn health(&self) -> &HealthMonitor {
        &self.health
    }

    pub fn inbox(&self) -> &InboxController {
        &self.inbox
    }
}

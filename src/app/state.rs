//! Application state management.
//!
//! Host-level state for the dashboard: settings and the mailbox accounts the
//! inbox can be scoped to.

use crate::config::Settings;
use crate::domain::{AccountId, EmailAccount};

/// Global application state.
#[derive(Debug, Clone, Default)]
pub struct AppState {
    /// Known accounts, in sidebar order.
    pub accounts: Vec<EmailAccount>,
    /// Currently active account, if any.
    pub active_account_id: Option<AccountId>,
    /// Application settings.
    pub settings: Settings,
}

impl AppState {
    /// Create a new application state with the given settings.
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            ..Default::default()
        }
    }

    /// Replace the account list.
    ///
    /// The first account becomes active when none is, or when the active one
    /// is no longer listed.
    pub fn set_accounts(&mut self, accounts: Vec<EmailAccount>) {
        self.accounts = accounts;

        let still_listed = self
            .active_account_id
            .as_ref()
            .is_some_and(|id| self.find(id).is_some());
        if !still_listed {
            self.active_account_id = self.accounts.first().map(|a| a.id.clone());
        }
    }

    /// Set the active account.
    ///
    /// Returns `false` and leaves the state unchanged for an unknown account.
    pub fn set_active_account(&mut self, account_id: Option<AccountId>) -> bool {
        if let Some(id) = &account_id {
            if self.find(id).is_none() {
                return false;
            }
        }
        self.active_account_id = account_id;
        true
    }

    /// The active account.
    pub fn active_account(&self) -> Option<&EmailAccount> {
        self.active_account_id.as_ref().and_then(|id| self.find(id))
    }

    fn find(&self, id: &AccountId) -> Option<&EmailAccount> {
        self.accounts.iter().find(|a| &a.id == id)
    }
}

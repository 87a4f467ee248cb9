//! Inbox search and filter coordination.
//!
//! The [`InboxController`] turns filter intents into list requests on the
//! [`EmailStore`]. Search text is debounced; chip toggles, account switches
//! and refreshes go out immediately and cancel any search still waiting.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::config::SearchSettings;
use crate::domain::{AccountId, EmailId, EmailListParams};

use super::debounce::Debouncer;
use super::email_store::EmailStore;
use super::filters::{Dispatch, FilterIntent, InboxFilters};

const SEARCH_KEY: &str = "search";

#[derive(Debug, Default)]
struct Scope {
    filters: InboxFilters,
    account: Option<AccountId>,
}

/// Coordinates inbox filters with the email store.
pub struct InboxController {
    store: Arc<EmailStore>,
    scope: Mutex<Scope>,
    debouncer: Debouncer<&'static str>,
    debounce: Duration,
}

impl InboxController {
    /// Creates a controller debouncing search input by `debounce`.
    pub fn new(store: Arc<EmailStore>, debounce: Duration) -> Self {
        Self {
            store,
            scope: Mutex::new(Scope::default()),
            debouncer: Debouncer::new(),
            debounce,
        }
    }

    pub fn from_settings(store: Arc<EmailStore>, settings: &SearchSettings) -> Self {
        Self::new(store, settings.debounce)
    }

    /// The store this controller drives.
    pub fn store(&self) -> &Arc<EmailStore> {
        &self.store
    }

    /// Current filters.
    pub fn filters(&self) -> InboxFilters {
        self.scope().filters.clone()
    }

    /// Account the list is scoped to.
    pub fn account(&self) -> Option<AccountId> {
        self.scope().account.clone()
    }

    /// List parameters for the current filters and account.
    pub fn params(&self) -> EmailListParams {
        let scope = self.scope();
        scope.filters.to_params(scope.account.as_ref())
    }

    /// Returns whether a debounced search is waiting to be sent.
    pub fn search_pending(&self) -> bool {
        self.debouncer.is_pending(&SEARCH_KEY)
    }

    /// Applies `intent` and requests the matching list.
    ///
    /// Search intents return as soon as the request is scheduled; every
    /// other intent resolves once its list request has settled.
    pub async fn dispatch(&self, intent: FilterIntent) {
        let mode = intent.dispatch();
        let params = {
            let mut scope = self.scope();
            let filters = std::mem::take(&mut scope.filters);
            scope.filters = filters.apply(intent);
            scope.filters.to_params(scope.account.as_ref())
        };

        match mode {
            Dispatch::Debounced => {
                let store = Arc::clone(&self.store);
                self.debouncer.schedule(SEARCH_KEY, self.debounce, async move {
                    store.load_list(&params).await;
                });
            }
            Dispatch::Immediate => {
                if self.debouncer.cancel(&SEARCH_KEY) {
                    tracing::debug!("pending search superseded");
                }
                self.store.load_list(&params).await;
            }
        }
    }

    /// Updates the search text.
    pub async fn search(&self, text: impl Into<String>) {
        self.dispatch(FilterIntent::Search(text.into())).await;
    }

    /// Toggles a category chip.
    pub async fn toggle_category(&self, category: impl Into<String>) {
        self.dispatch(FilterIntent::ToggleCategory(category.into()))
            .await;
    }

    /// Toggles a sentiment chip.
    pub async fn toggle_sentiment(&self, sentiment: impl Into<String>) {
        self.dispatch(FilterIntent::ToggleSentiment(sentiment.into()))
            .await;
    }

    /// Toggles a processed chip.
    pub async fn toggle_processed(&self, processed: bool) {
        self.dispatch(FilterIntent::ToggleProcessed(processed)).await;
    }

    /// Scopes the list to `account` and reloads it.
    pub async fn set_account(&self, account: Option<AccountId>) {
        let params = {
            let mut scope = self.scope();
            if scope.account == account {
                return;
            }
            scope.account = account;
            scope.filters.to_params(scope.account.as_ref())
        };

        self.debouncer.cancel(&SEARCH_KEY);
        self.store.load_list(&params).await;
    }

    /// Reloads the list with the current filters and refreshes stats.
    pub async fn refresh(&self) {
        self.debouncer.cancel(&SEARCH_KEY);
        let params = self.params();
        tokio::join!(self.store.load_list(&params), self.store.load_stats());
    }

    /// Opens an email in the reading pane.
    ///
    /// Uses the copy from the current page when there is one.
    pub async fn open(&self, id: EmailId) {
        if !self.store.select_from_page(id) {
            self.store.load_one(id).await;
        }
    }

    fn scope(&self) -> MutexGuard<'_, Scope> {
        self.scope.lock().unwrap_or_else(|e| e.into_inner())
    }
}

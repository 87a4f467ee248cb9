//! Email collection store.
//!
//! The [`EmailStore`] owns the current page of emails, the selected email,
//! the last stats snapshot and the request lifecycle. Views read snapshots
//! through [`EmailStore::subscribe`] and send intents through the async
//! methods; they never mutate the state themselves.
//!
//! # Ordering
//!
//! List, selection and stats requests each carry an epoch taken from their
//! own monotonic counter. A response is applied only if its epoch is still
//! the latest issued for that slot, so overlapping calls resolve in issue
//! order regardless of completion order.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::watch;

use crate::domain::{
    EmailId, EmailListParams, EmailStats, EmailWithAnalysis, ParseEmailRequest,
    ParseEmailResponse,
};
use crate::gateway::Gateway;

/// Progress of the store's requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lifecycle {
    /// Nothing in flight and the last request succeeded.
    #[default]
    Idle,
    /// At least one list or selection request is in flight.
    Loading,
    /// Nothing in flight and the last request failed. Not terminal.
    Error,
}

/// Pagination metadata of the page currently held.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageInfo {
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub has_more: bool,
}

/// Snapshot of the store's state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmailState {
    /// Current page, replaced wholesale on every applied list response.
    pub emails: Vec<EmailWithAnalysis>,
    /// Pagination of `emails`.
    pub page: Option<PageInfo>,
    /// Email shown in the reading pane.
    pub selected: Option<EmailWithAnalysis>,
    /// Last known good stats.
    pub stats: Option<EmailStats>,
    /// Message of the most recent failure.
    pub last_error: Option<String>,
    /// Number of list/selection requests not yet settled.
    in_flight: usize,
}

impl EmailState {
    /// Derived lifecycle tag.
    pub fn lifecycle(&self) -> Lifecycle {
        if self.in_flight > 0 {
            Lifecycle::Loading
        } else if self.last_error.is_some() {
            Lifecycle::Error
        } else {
            Lifecycle::Idle
        }
    }

    /// Returns whether a list or selection request is in flight.
    pub fn is_loading(&self) -> bool {
        self.in_flight > 0
    }

    /// Number of list/selection requests not yet settled.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }
}

/// Store for the filtered, paginated email collection.
pub struct EmailStore {
    gateway: Arc<dyn Gateway>,
    state: watch::Sender<EmailState>,
    list_epoch: AtomicU64,
    selection_epoch: AtomicU64,
    stats_epoch: AtomicU64,
}

impl EmailStore {
    /// Creates an empty store on top of `gateway`.
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        let (state, _) = watch::channel(EmailState::default());
        Self {
            gateway,
            state,
            list_epoch: AtomicU64::new(0),
            selection_epoch: AtomicU64::new(0),
            stats_epoch: AtomicU64::new(0),
        }
    }

    /// Subscribes to state snapshots.
    pub fn subscribe(&self) -> watch::Receiver<EmailState> {
        self.state.subscribe()
    }

    /// Returns a copy of the current state.
    pub fn snapshot(&self) -> EmailState {
        self.state.borrow().clone()
    }

    /// Loads one page of emails matching `params`.
    ///
    /// On success the page replaces `emails`; on failure `last_error` is set
    /// and the previous page is kept. Either way the request only takes
    /// effect if no newer `load_list` has been issued in the meantime.
    pub async fn load_list(&self, params: &EmailListParams) {
        let epoch = self.list_epoch.fetch_add(1, Ordering::SeqCst) + 1;
        let request = self.begin();
        tracing::debug!(epoch, ?params, "loading email list");

        let result = self.gateway.fetch_emails(params).await;

        request.settle(|state| {
            if self.list_epoch.load(Ordering::SeqCst) != epoch {
                tracing::debug!(epoch, "discarding stale email list response");
                return;
            }
            match result {
                Ok(page) => {
                    state.page = Some(PageInfo {
                        total: page.total,
                        page: page.page,
                        limit: page.limit,
                        has_more: page.has_more,
                    });
                    state.emails = page.items;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "failed to load email list");
                    state.last_error = Some(e.to_string());
                }
            }
        });
    }

    /// Loads a single email into `selected`.
    ///
    /// The email need not be part of the current page.
    pub async fn load_one(&self, id: EmailId) {
        let epoch = self.selection_epoch.fetch_add(1, Ordering::SeqCst) + 1;
        let request = self.begin();
        tracing::debug!(epoch, %id, "loading email");

        let result = self.gateway.fetch_email(id).await;

        request.settle(|state| {
            if self.selection_epoch.load(Ordering::SeqCst) != epoch {
                tracing::debug!(epoch, %id, "discarding stale email response");
                return;
            }
            match result {
                Ok(email) => state.selected = Some(email),
                Err(e) => {
                    tracing::warn!(error = %e, %id, "failed to load email");
                    state.last_error = Some(e.to_string());
                }
            }
        });
    }

    /// Refreshes the stats snapshot.
    ///
    /// Does not affect the lifecycle. A failure records `last_error` but
    /// keeps the previous snapshot.
    pub async fn load_stats(&self) {
        let epoch = self.stats_epoch.fetch_add(1, Ordering::SeqCst) + 1;

        let result = self.gateway.fetch_stats().await;

        self.state.send_modify(|state| {
            if self.stats_epoch.load(Ordering::SeqCst) != epoch {
                return;
            }
            match result {
                Ok(stats) => state.stats = Some(stats),
                Err(e) => {
                    tracing::warn!(error = %e, "failed to load stats");
                    state.last_error = Some(e.to_string());
                }
            }
        });
    }

    /// Selects an email the caller already holds, without any request.
    ///
    /// Supersedes any `load_one` still in flight.
    pub fn select_local(&self, email: Option<EmailWithAnalysis>) {
        self.selection_epoch.fetch_add(1, Ordering::SeqCst);
        self.state.send_modify(|state| state.selected = email);
    }

    /// Selects the email with `id` from the current page, if present.
    ///
    /// Returns `false` when the page does not hold it; the caller can fall
    /// back to [`load_one`](Self::load_one).
    pub fn select_from_page(&self, id: EmailId) -> bool {
        let found = self
            .state
            .borrow()
            .emails
            .iter()
            .find(|email| email.id() == id)
            .cloned();

        match found {
            Some(email) => {
                self.select_local(Some(email));
                true
            }
            None => false,
        }
    }

    /// Submits a raw email for parsing, then refreshes stats.
    ///
    /// Returns `None` on failure, with the message in `last_error`.
    pub async fn submit_raw(&self, request: &ParseEmailRequest) -> Option<ParseEmailResponse> {
        match self.gateway.parse_email(request).await {
            Ok(response) => {
                tracing::info!(id = %response.id, status = %response.status, "email submitted");
                self.load_stats().await;
                Some(response)
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to submit email");
                self.state
                    .send_modify(|state| state.last_error = Some(e.to_string()));
                None
            }
        }
    }

    /// Clears the recorded error.
    pub fn clear_error(&self) {
        self.state.send_modify(|state| state.last_error = None);
    }

    fn begin(&self) -> InFlight<'_> {
        self.state.send_modify(|state| {
            state.in_flight += 1;
            state.last_error = None;
        });
        InFlight {
            state: &self.state,
            settled: false,
        }
    }
}

/// One counted list/selection request.
///
/// Dropping it unsettled, as happens when the caller abandons the future,
/// still releases its slot in `in_flight`.
struct InFlight<'a> {
    state: &'a watch::Sender<EmailState>,
    settled: bool,
}

impl InFlight<'_> {
    fn settle(mut self, apply: impl FnOnce(&mut EmailState)) {
        self.settled = true;
        self.state.send_modify(|state| {
            state.in_flight = state.in_flight.saturating_sub(1);
            apply(state);
        });
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.state
                .send_modify(|state| state.in_flight = state.in_flight.saturating_sub(1));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PaginatedResponse;
    use crate::gateway::{
        sample_records, EmailPage, FixtureGateway, GatewayError, MockGateway, Result,
    };
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tokio::sync::oneshot;

    /// Gateway whose list responses are released by the test, keyed by the
    /// search text of the request.
    #[derive(Default)]
    struct ScriptedGateway {
        lists: Mutex<HashMap<String, oneshot::Receiver<Result<EmailPage>>>>,
        emails: Mutex<HashMap<i64, oneshot::Receiver<Result<EmailWithAnalysis>>>>,
    }

    impl ScriptedGateway {
        fn script_list(&self, search: &str) -> oneshot::Sender<Result<EmailPage>> {
            let (tx, rx) = oneshot::channel();
            self.lists.lock().unwrap().insert(search.to_string(), rx);
            tx
        }

        fn script_email(&self, id: i64) -> oneshot::Sender<Result<EmailWithAnalysis>> {
            let (tx, rx) = oneshot::channel();
            self.emails.lock().unwrap().insert(id, rx);
            tx
        }
    }

    #[async_trait]
    impl Gateway for ScriptedGateway {
        fn backend(&self) -> &'static str {
            "scripted"
        }

        async fn fetch_emails(&self, params: &EmailListParams) -> Result<EmailPage> {
            let key = params.search.clone().unwrap_or_default();
            let rx = self.lists.lock().unwrap().remove(&key).expect("unscripted list");
            rx.await.expect("script dropped")
        }

        async fn fetch_email(&self, id: EmailId) -> Result<EmailWithAnalysis> {
            let rx = self.emails.lock().unwrap().remove(&id.0).expect("unscripted email");
            rx.await.expect("script dropped")
        }

        async fn fetch_stats(&self) -> Result<EmailStats> {
            unimplemented!()
        }

        async fn fetch_health(
            &self,
            _service: crate::domain::ServiceKey,
        ) -> Result<crate::domain::HealthStatus> {
            unimplemented!()
        }

        async fn parse_email(&self, _request: &ParseEmailRequest) -> Result<ParseEmailResponse> {
            unimplemented!()
        }
    }

    fn page_of(ids: &[i64]) -> EmailPage {
        let records = sample_records()
            .into_iter()
            .filter(|r| ids.contains(&r.id().0))
            .collect();
        PaginatedResponse::from_window(records, 0, 50)
    }

    fn ids(state: &EmailState) -> Vec<i64> {
        state.emails.iter().map(|e| e.id().0).collect()
    }

    fn fixture_store() -> EmailStore {
        EmailStore::new(Arc::new(FixtureGateway::new().instant()))
    }

    #[tokio::test]
    async fn load_list_replaces_emails_and_returns_to_idle() {
        let store = fixture_store();

        store.load_list(&EmailListParams::new().category("support")).await;

        let state = store.snapshot();
        assert_eq!(ids(&state), vec![2]);
        assert_eq!(state.page.unwrap().total, 1);
        assert_eq!(state.lifecycle(), Lifecycle::Idle);
        assert!(state.last_error.is_none());
    }

    #[tokio::test]
    async fn failed_list_keeps_previous_page() {
        let mut gateway = MockGateway::new();
        let mut calls = 0;
        gateway.expect_fetch_emails().times(2).returning(move |_| {
            calls += 1;
            if calls == 1 {
                Ok(page_of(&[1, 2]))
            } else {
                Err(GatewayError::Network("connection refused".into()))
            }
        });
        let store = EmailStore::new(Arc::new(gateway));

        store.load_list(&EmailListParams::new()).await;
        store.load_list(&EmailListParams::new()).await;

        let state = store.snapshot();
        assert_eq!(ids(&state), vec![1, 2]);
        assert_eq!(
            state.last_error.as_deref(),
            Some("network failure: connection refused")
        );
        assert_eq!(state.lifecycle(), Lifecycle::Error);
    }

    #[tokio::test]
    async fn new_request_clears_previous_error() {
        let mut gateway = MockGateway::new();
        let mut calls = 0;
        gateway.expect_fetch_emails().times(2).returning(move |_| {
            calls += 1;
            if calls == 1 {
                Err(GatewayError::InvalidResponse("garbage".into()))
            } else {
                Ok(page_of(&[3]))
            }
        });
        let store = EmailStore::new(Arc::new(gateway));

        store.load_list(&EmailListParams::new()).await;
        assert_eq!(store.snapshot().lifecycle(), Lifecycle::Error);

        store.load_list(&EmailListParams::new()).await;
        let state = store.snapshot();
        assert_eq!(state.lifecycle(), Lifecycle::Idle);
        assert_eq!(ids(&state), vec![3]);
    }

    #[tokio::test]
    async fn stale_list_response_is_discarded() {
        let gateway = Arc::new(ScriptedGateway::default());
        let release_a = gateway.script_list("a");
        let release_b = gateway.script_list("b");
        let store = Arc::new(EmailStore::new(gateway.clone()));
        let mut rx = store.subscribe();

        let a = tokio::spawn({
            let store = store.clone();
            async move { store.load_list(&EmailListParams::new().search("a")).await }
        });
        rx.wait_for(|s| s.in_flight() == 1).await.unwrap();

        let b = tokio::spawn({
            let store = store.clone();
            async move { store.load_list(&EmailListParams::new().search("b")).await }
        });
        rx.wait_for(|s| s.in_flight() == 2).await.unwrap();

        // B settles first, then A arrives late.
        release_b.send(Ok(page_of(&[2]))).unwrap();
        b.await.unwrap();
        assert!(store.snapshot().is_loading());

        release_a.send(Ok(page_of(&[1, 3]))).unwrap();
        a.await.unwrap();

        let state = store.snapshot();
        assert_eq!(ids(&state), vec![2]);
        assert_eq!(state.lifecycle(), Lifecycle::Idle);
    }

    #[tokio::test]
    async fn stale_response_is_discarded_in_issue_order_too() {
        let gateway = Arc::new(ScriptedGateway::default());
        let release_a = gateway.script_list("a");
        let release_b = gateway.script_list("b");
        let store = Arc::new(EmailStore::new(gateway.clone()));
        let mut rx = store.subscribe();

        let a = tokio::spawn({
            let store = store.clone();
            async move { store.load_list(&EmailListParams::new().search("a")).await }
        });
        rx.wait_for(|s| s.in_flight() == 1).await.unwrap();
        let b = tokio::spawn({
            let store = store.clone();
            async move { store.load_list(&EmailListParams::new().search("b")).await }
        });
        rx.wait_for(|s| s.in_flight() == 2).await.unwrap();

        // A settles first, with an error: neither its page nor its error may show.
        release_a
            .send(Err(GatewayError::Network("timeout".into())))
            .unwrap();
        a.await.unwrap();
        let state = store.snapshot();
        assert!(state.emails.is_empty());
        assert!(state.last_error.is_none());

        release_b.send(Ok(page_of(&[1]))).unwrap();
        b.await.unwrap();
        assert_eq!(ids(&store.snapshot()), vec![1]);
    }

    #[tokio::test]
    async fn load_one_sets_selected_without_touching_the_list() {
        let store = fixture_store();
        store.load_list(&EmailListParams::new().category("facture")).await;

        store.load_one(EmailId(3)).await;

        let state = store.snapshot();
        assert_eq!(state.selected.unwrap().id(), EmailId(3));
        assert_eq!(ids(&store.snapshot()), vec![1]);
    }

    #[tokio::test]
    async fn missing_email_reports_not_found() {
        let store = fixture_store();

        store.load_one(EmailId(42)).await;

        let state = store.snapshot();
        assert!(state.selected.is_none());
        assert_eq!(state.last_error.as_deref(), Some("not found: email 42"));
    }

    #[tokio::test]
    async fn local_selection_supersedes_pending_load() {
        let gateway = Arc::new(ScriptedGateway::default());
        let release = gateway.script_email(1);
        let store = Arc::new(EmailStore::new(gateway.clone()));
        let mut rx = store.subscribe();

        let pending = tokio::spawn({
            let store = store.clone();
            async move { store.load_one(EmailId(1)).await }
        });
        rx.wait_for(|s| s.in_flight() == 1).await.unwrap();

        let local = sample_records().remove(1);
        store.select_local(Some(local));

        release.send(Ok(sample_records().remove(0))).unwrap();
        pending.await.unwrap();

        let state = store.snapshot();
        assert_eq!(state.selected.as_ref().unwrap().id(), EmailId(2));
        assert_eq!(state.lifecycle(), Lifecycle::Idle);
    }

    #[tokio::test]
    async fn select_from_page_avoids_a_fetch() {
        let mut gateway = MockGateway::new();
        gateway
            .expect_fetch_emails()
            .times(1)
            .returning(|_| Ok(page_of(&[1, 2, 3])));
        gateway.expect_fetch_email().never();
        let store = EmailStore::new(Arc::new(gateway));
        store.load_list(&EmailListParams::new()).await;

        assert!(store.select_from_page(EmailId(2)));
        assert!(!store.select_from_page(EmailId(9)));
        assert_eq!(store.snapshot().selected.unwrap().id(), EmailId(2));

        store.select_local(None);
        assert!(store.snapshot().selected.is_none());
    }

    #[tokio::test]
    async fn stats_keep_last_known_good_on_failure() {
        let mut gateway = MockGateway::new();
        let mut calls = 0;
        gateway.expect_fetch_stats().times(2).returning(move || {
            calls += 1;
            if calls == 1 {
                Ok(EmailStats {
                    total: 10,
                    analyzed: 4,
                    processed: 9,
                })
            } else {
                Err(GatewayError::Network("unreachable".into()))
            }
        });
        let store = EmailStore::new(Arc::new(gateway));

        store.load_stats().await;
        store.load_stats().await;

        let state = store.snapshot();
        assert_eq!(state.stats.unwrap().total, 10);
        assert!(state.last_error.is_some());
        assert!(!state.is_loading());
    }

    #[tokio::test]
    async fn stats_are_idempotent() {
        let store = fixture_store();

        store.load_stats().await;
        let first = store.snapshot().stats;
        store.load_stats().await;

        assert_eq!(store.snapshot().stats, first);
        assert_eq!(first.unwrap().total, 127);
    }

    #[tokio::test]
    async fn submit_refreshes_stats() {
        let store = fixture_store();

        let response = store
            .submit_raw(&ParseEmailRequest::new("Subject: Commande 42\r\n\r\nbody"))
            .await
            .unwrap();

        assert_eq!(response.subject, "Commande 42");
        assert!(store.snapshot().stats.is_some());
    }

    #[tokio::test]
    async fn failed_submit_records_error() {
        let store = fixture_store();

        assert!(store.submit_raw(&ParseEmailRequest::new("")).await.is_none());
        assert!(store.snapshot().last_error.is_some());

        store.clear_error();
        assert_eq!(store.snapshot().lifecycle(), Lifecycle::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn abandoned_request_does_not_stay_loading() {
        let store = EmailStore::new(Arc::new(FixtureGateway::new()));

        let list = tokio::time::timeout(
            std::time::Duration::from_millis(100),
            store.load_list(&EmailListParams::new()),
        )
        .await;
        assert!(list.is_err());

        let one = tokio::time::timeout(
            std::time::Duration::from_millis(100),
            store.load_one(EmailId(1)),
        )
        .await;
        assert!(one.is_err());

        tokio::time::sleep(std::time::Duration::from_secs(5)).await;
        let state = store.snapshot();
        assert_eq!(state.in_flight(), 0);
        assert_eq!(state.lifecycle(), Lifecycle::Idle);
        assert!(state.emails.is_empty());

        store.load_list(&EmailListParams::new()).await;
        assert_eq!(store.snapshot().emails.len(), 3);
    }

    #[tokio::test]
    async fn subscribers_see_loading_then_idle() {
        let store = Arc::new(EmailStore::new(Arc::new(
            FixtureGateway::new().with_latency(
                std::time::Duration::from_millis(20),
                std::time::Duration::ZERO,
            ),
        )));
        let mut rx = store.subscribe();

        let task = tokio::spawn({
            let store = store.clone();
            async move { store.load_list(&EmailListParams::new()).await }
        });

        rx.wait_for(|s| s.lifecycle() == Lifecycle::Loading)
            .await
            .unwrap();
        task.await.unwrap();
        assert_eq!(rx.borrow_and_update().lifecycle(), Lifecycle::Idle);
    }
}

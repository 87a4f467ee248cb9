//! Integration tests for the stores and gateways.
//!
//! These tests drive the public API end to end against the fixture backend,
//! and compare the live HTTP backend with it over a loopback socket. Each
//! module contains its own unit tests for detailed logic.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio_test::{assert_err, assert_ok};

use mailtriage::config::Settings;
use mailtriage::domain::{category, EmailId, EmailListParams, PaginatedResponse, ServiceKey};
use mailtriage::gateway::{FixtureGateway, Gateway, HttpGateway};
use mailtriage::services::{
    CheckState, EmailStore, HealthError, HealthMonitor, InboxController, InboxFilters, Lifecycle,
    OverallStatus,
};
use mailtriage::Dashboard;

fn fixtures() -> Arc<FixtureGateway> {
    Arc::new(FixtureGateway::new().instant())
}

fn ids(store: &EmailStore) -> Vec<i64> {
    store.snapshot().emails.iter().map(|e| e.id().0).collect()
}

// ============================================================================
// Email Store
// ============================================================================

#[tokio::test]
async fn category_filter_returns_matching_record() {
    let store = EmailStore::new(fixtures());

    store
        .load_list(&EmailListParams::new().category(category::SUPPORT))
        .await;

    assert_eq!(ids(&store), vec![2]);
    assert_eq!(store.snapshot().page.unwrap().total, 1);
}

#[tokio::test]
async fn search_is_case_insensitive_substring() {
    let store = EmailStore::new(fixtures());

    store.load_list(&EmailListParams::new().search("urgent")).await;
    assert_eq!(ids(&store), vec![2]);

    store.load_list(&EmailListParams::new().search("URGENT")).await;
    assert_eq!(ids(&store), vec![2]);
}

#[tokio::test]
async fn pages_satisfy_the_envelope_invariant() {
    let gateway = fixtures();

    for limit in [1, 2, 3, 50] {
        for offset in 0..4 {
            let params = EmailListParams::new().limit(limit).offset(offset);
            let page = assert_ok!(gateway.fetch_emails(&params).await);

            assert_eq!(page.total, 3);
            assert_eq!(page.limit, limit);
            assert_eq!(page.page, offset / limit + 1);
            assert_eq!(page.has_more, offset + limit < page.total);
            assert!(page.items.len() as u64 <= limit);
        }
    }
}

#[tokio::test]
async fn stats_are_idempotent() {
    let store = EmailStore::new(fixtures());

    store.load_stats().await;
    let first = store.snapshot().stats;
    store.load_stats().await;

    assert_eq!(store.snapshot().stats, first);
}

#[tokio::test(start_paused = true)]
async fn overlapping_list_requests_leave_the_latest_result() {
    let store = Arc::new(EmailStore::new(Arc::new(FixtureGateway::new())));

    let first = tokio::spawn({
        let store = store.clone();
        async move { store.load_list(&EmailListParams::new()).await }
    });
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(store.snapshot().is_loading());
    store.load_list(&EmailListParams::new().search("urgent")).await;
    first.await.unwrap();

    assert_eq!(ids(&store), vec![2]);
    assert_eq!(store.snapshot().lifecycle(), Lifecycle::Idle);
}

#[tokio::test]
async fn unknown_email_sets_error_and_store_recovers() {
    let store = EmailStore::new(fixtures());

    store.load_one(EmailId(999)).await;
    assert_eq!(store.snapshot().lifecycle(), Lifecycle::Error);

    store.load_one(EmailId(3)).await;
    let state = store.snapshot();
    assert_eq!(state.lifecycle(), Lifecycle::Idle);
    assert_eq!(state.selected.unwrap().id(), EmailId(3));
}

// ============================================================================
// Health Monitor
// ============================================================================

#[tokio::test]
async fn unknown_service_is_rejected() {
    let monitor = HealthMonitor::with_all_services(fixtures());
    monitor.check_all().await;
    let before = monitor.entries();

    let err = assert_err!(monitor.check_named("nonexistent").await);
    assert_eq!(err, HealthError::UnknownService("nonexistent".into()));
    assert_eq!(monitor.entries(), before);
}

#[tokio::test]
async fn one_failing_service_degrades_overall() {
    let gateway = FixtureGateway::new()
        .instant()
        .with_unreachable(ServiceKey::MetaMcp);
    let monitor = HealthMonitor::with_all_services(Arc::new(gateway));

    assert_eq!(monitor.check_all().await, OverallStatus::Degraded);
    assert_eq!(monitor.overall(), OverallStatus::Degraded);

    let states: Vec<_> = monitor.entries().iter().map(|e| (e.key, e.state)).collect();
    assert_eq!(
        states,
        vec![
            (ServiceKey::MailParser, CheckState::Healthy),
            (ServiceKey::MetaMcp, CheckState::Error),
        ]
    );
}

// ============================================================================
// Search/Filter Coordination
// ============================================================================

#[tokio::test]
async fn toggling_a_category_twice_restores_the_unfiltered_list() {
    let inbox = InboxController::new(Arc::new(EmailStore::new(fixtures())), Duration::ZERO);

    inbox.toggle_category(category::SUPPORT).await;
    assert_eq!(ids(inbox.store()), vec![2]);

    inbox.toggle_category(category::SUPPORT).await;
    assert_eq!(inbox.filters(), InboxFilters::default());
    assert_eq!(inbox.params(), EmailListParams::new());
    assert_eq!(ids(inbox.store()), vec![1, 2, 3]);
}

#[tokio::test(start_paused = true)]
async fn debounced_search_reaches_the_store() {
    let inbox = InboxController::new(
        Arc::new(EmailStore::new(fixtures())),
        Duration::from_millis(300),
    );

    inbox.search("proposition").await;
    assert!(inbox.store().snapshot().emails.is_empty());

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(ids(inbox.store()), vec![3]);
}

#[tokio::test(start_paused = true)]
async fn dashboard_starts_against_fixtures() {
    let mut settings = Settings::default();
    settings.api.use_fixtures = true;
    let dashboard = assert_ok!(Dashboard::new(settings));

    assert_eq!(dashboard.start().await, OverallStatus::Healthy);
    assert_eq!(dashboard.emails().snapshot().emails.len(), 3);
}

// ============================================================================
// Backend parity
// ============================================================================

/// Serves each body once, in order, as a JSON 200 response.
async fn serve(bodies: Vec<String>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        for body in bodies {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut head = Vec::new();
            let mut buf = [0u8; 1024];
            while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                head.extend_from_slice(&buf[..n]);
            }
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
        }
    });

    format!("http://{}", addr)
}

#[tokio::test]
async fn http_and_fixture_backends_agree() {
    let fixture = fixtures();
    let queries = [
        EmailListParams::new(),
        EmailListParams::new().category(category::SUPPORT),
        EmailListParams::new().limit(2).offset(2),
    ];

    let mut expected = Vec::new();
    for params in &queries {
        expected.push(assert_ok!(fixture.fetch_emails(params).await));
    }
    let bodies = expected
        .iter()
        .map(|page| serde_json::to_string(page).unwrap())
        .collect();

    let mut settings = Settings::default();
    settings.api.base_url = serve(bodies).await;
    let http = assert_ok!(HttpGateway::new(&settings));

    for (params, expected) in queries.iter().zip(&expected) {
        let page = assert_ok!(http.fetch_emails(params).await);
        assert_eq!(&page, expected);
        assert!(page.is_consistent_with(params.effective_offset()));
    }
}

#[test]
fn envelope_uses_wire_field_names() {
    let page = PaginatedResponse::from_window(vec![1, 2, 3], 0, 2);
    let json = serde_json::to_value(&page).unwrap();

    assert_eq!(
        json,
        serde_json::json!({"data": [1, 2], "total": 3, "page": 1, "limit": 2, "hasMore": true})
    );
}

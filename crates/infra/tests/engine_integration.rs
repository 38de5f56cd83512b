//! End-to-end tests wiring the HTTP client, sync service, and engine
//! against a mock reservation API.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use roomsync_core::{CachePolicy, TransitionOutcome};
use roomsync_domain::{Config, ReservationStatus, Room, SlotKey};
use roomsync_infra::{ReservationApiClient, ReservationApiConfig, StaticSession, SyncEngine};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

/// Route engine tracing through the test harness; `RUST_LOG` opts in.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn test_config(server: &MockServer) -> Config {
    let mut config = Config::default();
    config.api.base_url = server.uri();
    // Keep the loops quiet during short tests.
    config.scheduler.focused_poll_seconds = 3600;
    config.scheduler.silent_refresh_min_seconds = 3600;
    config.scheduler.silent_refresh_max_seconds = 7200;
    config.scheduler.wide_sweep_min_seconds = 3600;
    config.scheduler.wide_sweep_max_seconds = 7200;
    config.scheduler.horizon_sweep_min_seconds = 3600;
    config.scheduler.horizon_sweep_max_seconds = 7200;
    config
}

fn api_client(server: &MockServer) -> ReservationApiClient {
    let config = ReservationApiConfig {
        base_url: server.uri(),
        ..ReservationApiConfig::default()
    };
    ReservationApiClient::new(config, Arc::new(StaticSession::new("token"))).expect("client")
}

fn occupied_then_cleared(calls: Arc<AtomicUsize>) -> impl Fn(&Request) -> ResponseTemplate {
    move |_req: &Request| {
        let both = serde_json::json!([
            {
                "id": "r1",
                "room": "room 1",
                "dates": ["2025-06-10"],
                "event": "Fair setup",
                "author": "alice",
                "type": "event",
                "reservationStatus": "confirmed",
                "createdAt": "2025-05-01T10:00:00Z",
                "updatedAt": "2025-05-01T10:00:00Z"
            },
            {
                "id": "r2",
                "room": "room 1",
                "dates": ["2025-06-10"],
                "event": "Backup booking",
                "author": "bob",
                "type": "event",
                "reservationStatus": "pre",
                "createdAt": "2025-05-02T10:00:00Z",
                "updatedAt": "2025-05-02T10:00:00Z"
            }
        ]);
        let only_pre = serde_json::json!([both[1].clone()]);
        if calls.fetch_add(1, Ordering::SeqCst) == 0 {
            ResponseTemplate::new(200).set_body_json(both)
        } else {
            ResponseTemplate::new(200).set_body_json(only_pre)
        }
    }
}

#[tokio::test]
async fn day_clear_notification_over_http() {
    init_tracing();
    let server = MockServer::start().await;
    let calls = Arc::new(AtomicUsize::new(0));
    Mock::given(method("GET"))
        .and(path("/reservations"))
        .respond_with(occupied_then_cleared(calls))
        .mount(&server)
        .await;

    let client = api_client(&server);
    let config = test_config(&server);
    let engine = SyncEngine::with_repository(Arc::new(client), &config, "bob").unwrap();
    let service = engine.service();

    service.view_month(2025, 6).await.unwrap();
    assert!(service.notifications().is_empty());
    assert_eq!(service.blocked_pre_count(), 1);

    // The confirmed reservation disappeared server-side.
    service.refresh_viewed(CachePolicy::Bypass).await.unwrap();

    let notifications = service.notifications();
    assert_eq!(notifications.len(), 1);
    assert_eq!(
        notifications[0].slot(),
        SlotKey::new(Room::from("room 1"), "2025-06-10".parse().unwrap())
    );
    assert!(notifications[0].message.contains("room 1"));

    // Further refreshes never duplicate it.
    service.refresh_viewed(CachePolicy::Bypass).await.unwrap();
    assert_eq!(service.notifications().len(), 1);
}

#[tokio::test]
async fn conflicting_confirmation_rolls_back() {
    init_tracing();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/reservations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {
                "id": "r2",
                "room": "room 1",
                "dates": ["2025-06-10"],
                "event": "Backup booking",
                "author": "bob",
                "type": "event",
                "reservationStatus": "pre",
                "createdAt": "2025-05-02T10:00:00Z",
                "updatedAt": "2025-05-02T10:00:00Z"
            }
        ])))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/reservations/r2/status"))
        .respond_with(ResponseTemplate::new(409).set_body_string("day already confirmed"))
        .mount(&server)
        .await;

    let client = api_client(&server);
    let config = test_config(&server);
    let engine = SyncEngine::with_repository(Arc::new(client), &config, "bob").unwrap();
    let service = engine.service();

    service.view_month(2025, 6).await.unwrap();
    let outcome = service.change_status("r2", ReservationStatus::Confirmed).await.unwrap();
    assert_eq!(outcome, TransitionOutcome::Conflict);

    // Optimistic update was rolled back.
    let slot = SlotKey::new(Room::from("room 1"), "2025-06-10".parse().unwrap());
    assert_eq!(
        service.reservations_for_slot(&slot)[0].reservation_status,
        ReservationStatus::Pre
    );
}

#[tokio::test]
async fn engine_lifecycle_over_http() {
    init_tracing();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/reservations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/day-clear-events"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .mount(&server)
        .await;

    let client = api_client(&server);
    let config = test_config(&server);
    let mut engine = SyncEngine::with_repository(Arc::new(client), &config, "bob").unwrap();

    assert!(!engine.is_running());
    engine.start().await.unwrap();
    assert!(engine.is_running());
    engine.stop().await.unwrap();
    assert!(!engine.is_running());
}

#[tokio::test]
async fn server_day_clear_feed_flows_to_notifications() {
    init_tracing();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/reservations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/day-clear-events"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {
                "id": "evt-1",
                "room": "room 3",
                "day": "2025-07-04",
                "message": "room 3 is free again on 04/07/2025",
                "createdAt": "2025-06-20T08:00:00Z"
            }
        ])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/day-clear-events/evt-1/consume"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = api_client(&server);
    let config = test_config(&server);
    let engine = SyncEngine::with_repository(Arc::new(client), &config, "bob").unwrap();
    let service = engine.service();

    assert_eq!(service.pull_server_events().await.unwrap(), 1);
    assert_eq!(service.notifications().len(), 1);

    // Consuming a server-sourced notification acknowledges it remotely.
    assert!(service.consume_notification("evt-1").await.unwrap());
    assert!(service.notifications().is_empty());
}

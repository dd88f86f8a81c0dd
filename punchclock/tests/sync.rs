mod helpers;
use helpers::{spawn_app, unreachable_address, TestStation};
use punchclock_client::clock::ClockOutcome;
use punchclock_client::connectivity::Connectivity;
use punchclock_client::error::ClientError;
use punchclock_common::api::{ClockRequest, EntryView};
use punchclock_common::domain::{ClockAction, Entity, EventSource, Outcome};
use serde_json::json;
use std::time::Duration;
use time::OffsetDateTime;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn request(employee: &str, action: ClockAction, at: OffsetDateTime) -> ClockRequest {
    ClockRequest {
        human_employee_id: employee.into(),
        human_terminal_id: None,
        action,
        at,
        notes: None,
    }
}

async fn queue_one(station: &TestStation, employee: &str) {
    let outcome = station
        .clock
        .record(&request(employee, ClockAction::In, OffsetDateTime::now_utc()))
        .await
        .unwrap();
    assert!(matches!(outcome, ClockOutcome::Queued { .. }));
}

fn acknowledged(count: usize) -> serde_json::Value {
    let results: Vec<_> = (0..count)
        .map(|_| {
            json!({
                "entry": {},
                "success": true,
                "outcome": "success",
                "entryId": uuid::Uuid::now_v7(),
                "flagged": false,
            })
        })
        .collect();
    json!({ "synced": count, "duplicates": 0, "failed": 0, "results": results })
}

#[tokio::test]
async fn queued_events_survive_restart_and_drain() {
    let offline = unreachable_address().await;
    let station = TestStation::build(&offline).await.unwrap();
    let start = OffsetDateTime::now_utc() - time::Duration::hours(8);

    station
        .clock
        .record(&request("E1", ClockAction::In, start))
        .await
        .unwrap();
    station
        .clock
        .record(&request("E1", ClockAction::Out, OffsetDateTime::now_utc()))
        .await
        .unwrap();
    assert_eq!(station.queue.count().await.unwrap(), 2);

    let server = spawn_app().await.unwrap();
    server.add_employee("E1").await;
    let station = station.reopen(&server.address()).await.unwrap();
    assert_eq!(station.queue.count().await.unwrap(), 2);

    assert_eq!(station.probe().await, Connectivity::Online);
    let report = station.coordinator.sync_now().await.unwrap().unwrap();

    assert_eq!(report.submitted, 2);
    assert_eq!(report.synced, 2);
    assert!(report.needs_correction.is_empty());
    assert_eq!(station.queue.count().await.unwrap(), 0);

    let entries: Vec<EntryView> = reqwest::get(format!("{}/entries", server.address()))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(entries.len(), 2);
    assert!(entries.iter().all(|x| x.source == EventSource::Offline));
}

#[tokio::test]
async fn reconnect_triggers_background_drain() {
    let server = spawn_app().await.unwrap();
    server.add_employee("E1").await;
    let station = TestStation::build(&server.address()).await.unwrap();
    station.enable_auto_sync();
    queue_one(&station, "E1").await;

    assert_eq!(station.probe().await, Connectivity::Online);

    let mut remaining = 1;
    for _ in 0..100 {
        remaining = station.queue.count().await.unwrap();
        if remaining == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert_eq!(remaining, 0);
    assert_eq!(server.entry_count().await, 1);
}

#[tokio::test]
async fn unresolvable_events_leave_queue_for_correction() {
    let server = spawn_app().await.unwrap();
    let station = TestStation::build(&server.address()).await.unwrap();
    queue_one(&station, "E9").await;

    let report = station.coordinator.sync_now().await.unwrap().unwrap();

    assert_eq!(report.failed, 1);
    assert_eq!(report.needs_correction.len(), 1);
    assert_eq!(report.needs_correction[0].event.human_employee_id, "E9");
    assert_eq!(
        report.needs_correction[0].outcome,
        Outcome::EntityNotFound(Entity::Employee)
    );
    assert_eq!(station.queue.count().await.unwrap(), 0);
    assert_eq!(server.entry_count().await, 0);
}

#[tokio::test]
async fn transport_failure_keeps_queue() {
    let station = TestStation::build(&unreachable_address().await).await.unwrap();
    queue_one(&station, "E1").await;
    station.monitor.set(Connectivity::Online);

    let err = station.coordinator.sync_now().await.unwrap_err();

    assert!(err.is_transient());
    assert_eq!(station.queue.count().await.unwrap(), 1);
    assert_eq!(station.monitor.state(), Connectivity::Offline);
}

#[tokio::test]
async fn slow_server_times_out_and_keeps_queue() {
    let mock = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/sync"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(acknowledged(1))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&mock)
        .await;
    let station = TestStation::build(&mock.uri()).await.unwrap();
    queue_one(&station, "E1").await;
    station.monitor.set(Connectivity::Online);

    let err = station.coordinator.sync_now().await.unwrap_err();

    assert!(matches!(err, ClientError::Timeout));
    assert!(err.is_transient());
    assert_eq!(station.queue.count().await.unwrap(), 1);
    assert_eq!(station.monitor.state(), Connectivity::Offline);
}

#[tokio::test]
async fn server_error_keeps_queue() {
    let mock = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/sync"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "error": "boom" })))
        .expect(1)
        .mount(&mock)
        .await;
    let station = TestStation::build(&mock.uri()).await.unwrap();
    queue_one(&station, "E1").await;

    let err = station.coordinator.sync_now().await.unwrap_err();

    assert!(matches!(err, ClientError::Server { .. }));
    assert_eq!(station.queue.count().await.unwrap(), 1);
}

#[tokio::test]
async fn mismatched_results_keep_queue() {
    let mock = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/sync"))
        .respond_with(ResponseTemplate::new(200).set_body_json(acknowledged(1)))
        .mount(&mock)
        .await;
    let station = TestStation::build(&mock.uri()).await.unwrap();
    queue_one(&station, "E1").await;
    queue_one(&station, "E2").await;

    let err = station.coordinator.sync_now().await.unwrap_err();

    assert!(matches!(err, ClientError::InvalidResponse(_)));
    assert_eq!(station.queue.count().await.unwrap(), 2);
}

#[tokio::test]
async fn only_one_sync_in_flight() {
    let mock = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/sync"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(acknowledged(1))
                .set_delay(Duration::from_millis(300)),
        )
        .expect(1)
        .mount(&mock)
        .await;
    let station = TestStation::build(&mock.uri()).await.unwrap();
    queue_one(&station, "E1").await;

    let (first, second) = tokio::join!(
        station.coordinator.sync_now(),
        station.coordinator.sync_now()
    );

    let report = first.unwrap().expect("first call runs the drain");
    assert_eq!(report.synced, 1);
    assert!(second.unwrap().is_none());
    assert!(!station.coordinator.is_syncing());
    assert_eq!(station.queue.count().await.unwrap(), 0);
}

#[tokio::test]
async fn empty_queue_makes_no_request() {
    let mock = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/sync"))
        .respond_with(ResponseTemplate::new(200).set_body_json(acknowledged(0)))
        .expect(0)
        .mount(&mock)
        .await;
    let station = TestStation::build(&mock.uri()).await.unwrap();

    let report = station.coordinator.sync_now().await.unwrap().unwrap();

    assert_eq!(report.submitted, 0);
}

mod helpers;
use helpers::{spawn_app, VERSION};
use punchclock_client::api_client::{self, ApiClient};
use punchclock_client::error::ClientError;
use punchclock_common::api::{ClockRequest, EmployeeView, HealthCheckResponse};
use punchclock_common::domain::{ClockAction, EventSource};
use reqwest::StatusCode;
use std::time::Duration;
use time::OffsetDateTime;

fn clock(employee: &str, action: ClockAction, at: OffsetDateTime) -> ClockRequest {
    ClockRequest {
        human_employee_id: employee.into(),
        human_terminal_id: None,
        action,
        at,
        notes: None,
    }
}

#[tokio::test]
async fn health_check() {
    let server = spawn_app().await.unwrap();
    let response = api_client::health_check(&server.address()).await.unwrap();

    assert_eq!(
        HealthCheckResponse {
            status: "Ok".into(),
            version: VERSION.into()
        },
        response
    );
}

#[tokio::test]
async fn clock_in_and_out_online() {
    let server = spawn_app().await.unwrap();
    server.add_employee("E1").await;
    let api = ApiClient::new(&server.address(), Duration::from_secs(2)).unwrap();
    let start = OffsetDateTime::now_utc().replace_nanosecond(0).unwrap();

    let entry = api.clock(&clock("E1", ClockAction::In, start)).await.unwrap();
    assert_eq!(entry.clock_in, start);
    assert_eq!(entry.clock_out, None);
    assert_eq!(entry.source, EventSource::Online);

    let end = start + time::Duration::hours(8);
    let closed = api.clock(&clock("E1", ClockAction::Out, end)).await.unwrap();
    assert_eq!(closed.id, entry.id);
    assert_eq!(closed.clock_out, Some(end));
    assert_eq!(server.entry_count().await, 1);
}

#[tokio::test]
async fn clock_for_unknown_employee_is_not_found() {
    let server = spawn_app().await.unwrap();
    let api = ApiClient::new(&server.address(), Duration::from_secs(2)).unwrap();

    let err = api
        .clock(&clock("NOBODY", ClockAction::In, OffsetDateTime::now_utc()))
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Rejected { status, .. } if status == StatusCode::NOT_FOUND));
    assert!(!err.is_transient());
}

#[tokio::test]
async fn clock_out_without_open_entry_conflicts() {
    let server = spawn_app().await.unwrap();
    server.add_employee("E1").await;
    let api = ApiClient::new(&server.address(), Duration::from_secs(2)).unwrap();

    let err = api
        .clock(&clock("E1", ClockAction::Out, OffsetDateTime::now_utc()))
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Rejected { status, .. } if status == StatusCode::CONFLICT));
    assert_eq!(server.entry_count().await, 0);
}

#[tokio::test]
async fn clock_in_past_storable_range_is_bad_request() {
    let server = spawn_app().await.unwrap();
    server.add_employee("E1").await;
    let api = ApiClient::new(&server.address(), Duration::from_secs(2)).unwrap();

    let err = api
        .clock(&clock("E1", ClockAction::In, time::macros::datetime!(2300-01-01 09:00 UTC)))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ClientError::Rejected { status, .. } if status == StatusCode::BAD_REQUEST
    ));
    assert_eq!(server.entry_count().await, 0);
}

#[tokio::test]
async fn lists_directory() {
    let server = spawn_app().await.unwrap();
    server.add_employee("E1").await;
    server.add_employee("E2").await;

    let employees: Vec<EmployeeView> = reqwest::get(format!("{}/employees", server.address()))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let mut codes: Vec<_> = employees.into_iter().map(|x| x.employee_id).collect();
    codes.sort();
    assert_eq!(codes, vec!["E1", "E2"]);
}

use crate::error::{ServerError, StoreError};
use crate::models::{storable, NewEntry};
use crate::reconcile::{EntityDirectory, EventStore};
use crate::router::AppState;
use axum::extract::State;
use axum::response::Json;
use punchclock_common::api::{ClockRequest, EntryView};
use punchclock_common::domain::{ClockAction, EventSource};
use tracing::error;

/// Direct clock write used while the terminal is online.
pub async fn record(
    state: State<AppState>,
    Json(req): Json<ClockRequest>,
) -> Result<Json<EntryView>, ServerError> {
    let db = &state.database;
    if !storable(req.at) {
        return Err(ServerError::BadRequest("timestamp out of range"));
    }

    let employee_ref = db
        .resolve_employee(&req.human_employee_id)
        .await
        .map_err(|err| {
            error!("Failed to resolve employee {err}");
            ServerError::DatabaseError("resolve employee")
        })?
        .ok_or(ServerError::NotFound("employee"))?;

    let terminal_ref = match req.human_terminal_id.as_deref().filter(|x| !x.is_empty()) {
        Some(code) => Some(
            db.resolve_terminal(code)
                .await
                .map_err(|err| {
                    error!("Failed to resolve terminal {err}");
                    ServerError::DatabaseError("resolve terminal")
                })?
                .ok_or(ServerError::NotFound("terminal"))?,
        ),
        None => None,
    };

    let entry = match req.action {
        ClockAction::In => {
            let new_entry = NewEntry {
                employee_ref,
                terminal_ref,
                clock_in: req.at,
                clock_out: None,
                notes: req.notes,
                source: EventSource::Online,
                flagged: false,
                flag_reason: None,
                synced_at: None,
            };
            db.insert(new_entry).await.map_err(|err| match err {
                StoreError::Conflict => ServerError::Conflict("clock in already recorded"),
                StoreError::Backend(err) => {
                    error!("Failed to insert entry {err}");
                    ServerError::DatabaseError("insert entry")
                }
            })?
        }
        ClockAction::Out => {
            let open = db
                .latest_open_entry(employee_ref)
                .await
                .map_err(|err| {
                    error!("Failed to query open entry {err}");
                    ServerError::DatabaseError("open entry")
                })?
                .ok_or(ServerError::Conflict("employee is not currently clocked in"))?;

            db.close_entry(open.id, req.at, req.notes)
                .await
                .map_err(|err| {
                    error!("Failed to close entry {err}");
                    ServerError::DatabaseError("close entry")
                })?
        }
    };

    Ok(Json(EntryView::from(&entry)))
}

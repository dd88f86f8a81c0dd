use crate::error::ServerError;
use crate::router::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::Json;
use punchclock_common::api::SyncResponse;
use tracing::debug;

/// Accepts `{ entries: [...] }`. The entries are taken as raw json so that a malformed entry
/// is rejected on its own instead of failing the whole batch. A body that is not json at all
/// gets the same json error as a body without an entries array.
pub async fn submit(
    state: State<AppState>,
    body: Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<Json<SyncResponse>, ServerError> {
    let body = match body {
        Ok(Json(body)) => body,
        Err(rejection) => {
            debug!("unreadable sync body: {rejection}");
            return Err(ServerError::BadRequest("Invalid entries format"));
        }
    };

    let entries = match body {
        serde_json::Value::Object(mut map) => match map.remove("entries") {
            Some(serde_json::Value::Array(entries)) => entries,
            _ => return Err(ServerError::BadRequest("Invalid entries format")),
        },
        _ => return Err(ServerError::BadRequest("Invalid entries format")),
    };

    debug!("sync batch with {} entries", entries.len());
    let report = state.engine.submit_batch(entries).await;

    Ok(Json(report.into()))
}

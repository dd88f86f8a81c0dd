use crate::error::ServerError;
use crate::models::EntryFilter;
use crate::router::AppState;
use axum::extract::{Query, State};
use axum::response::Json;
use punchclock_common::api::{EmployeeView, EntriesQuery, EntryView, TerminalView};
use tracing::error;

pub async fn employees(state: State<AppState>) -> Result<Json<Vec<EmployeeView>>, ServerError> {
    let res = state.database.list_employees().await.map_err(|err| {
        error!("Failed to list employees {err}");
        ServerError::DatabaseError("list employees")
    })?;

    Ok(Json(res.into_iter().map(EmployeeView::from).collect()))
}

pub async fn terminals(state: State<AppState>) -> Result<Json<Vec<TerminalView>>, ServerError> {
    let res = state.database.list_terminals().await.map_err(|err| {
        error!("Failed to list terminals {err}");
        ServerError::DatabaseError("list terminals")
    })?;

    Ok(Json(res.into_iter().map(TerminalView::from).collect()))
}

pub async fn entries(
    state: State<AppState>,
    Query(params): Query<EntriesQuery>,
) -> Result<Json<Vec<EntryView>>, ServerError> {
    let filter = EntryFilter {
        employee_code: params.employee,
        flagged: params.flagged,
        limit: params.limit,
    };

    let res = state.database.list_entries(&filter).await.map_err(|err| {
        error!("Failed to list entries {err}");
        ServerError::DatabaseError("list entries")
    })?;

    Ok(Json(res.iter().map(EntryView::from).collect()))
}

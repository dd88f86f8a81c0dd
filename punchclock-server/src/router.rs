use super::handlers;
use crate::database::Database;
use crate::reconcile::ReconciliationEngine;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub database: Database,
    pub engine: Arc<ReconciliationEngine>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/sync", post(handlers::sync::submit))
        .route("/clock", post(handlers::clock::record))
        .route("/employees", get(handlers::directory::employees))
        .route("/terminals", get(handlers::directory::terminals))
        .route("/entries", get(handlers::directory::entries))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

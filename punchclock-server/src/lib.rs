use axum::{serve, Router};
use database::Database;
use eyre::{Context, Result};
use reconcile::ReconciliationEngine;
use router::AppState;
use settings::Settings;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;

pub mod database;
pub mod error;
mod handlers;
pub mod models;
pub mod reconcile;
mod router;
pub mod settings;

#[cfg(target_family = "unix")]
async fn shutdown_signal() {
    let mut term = signal::unix::signal(signal::unix::SignalKind::terminate())
        .expect("failed to register signal handler");
    let mut interrupt = signal::unix::signal(signal::unix::SignalKind::interrupt())
        .expect("failed to register signal handler");

    tokio::select! {
        _ = term.recv() => {},
        _ = interrupt.recv() => {},
    };
    eprintln!("Shutting down gracefully...");
}

#[cfg(target_family = "windows")]
async fn shutdown_signal() {
    let mut ctrl_c = signal::windows::ctrl_c().expect("failed to register signal handler");
    ctrl_c.recv().await;
    eprintln!("Shutting down gracefully...");
}

pub fn make_engine(settings: &Settings, database: &Database) -> ReconciliationEngine {
    let database = Arc::new(database.clone());
    ReconciliationEngine::new(database.clone(), database.clone(), database)
        .skew_threshold(settings.skew_threshold())
}

pub async fn make_router(settings: &Settings, database: Database) -> Router {
    let engine = Arc::new(make_engine(settings, &database));
    router::router(AppState { database, engine })
}

pub async fn launch(settings: &Settings, address: SocketAddr) -> Result<()> {
    let database = Database::new(&settings.db_path)
        .await
        .wrap_err_with(|| format!("Failed to open database {}", settings.db_path))?;

    let listener = TcpListener::bind(address)
        .await
        .context("Failed to connect to tcp listener")?;
    let r = make_router(settings, database).await;

    tracing::info!("Server started at {}", address);
    serve(listener, r.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

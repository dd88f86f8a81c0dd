use axum::response::Json;
use punchclock_common::api::HealthCheckResponse;

pub mod clock;
pub mod directory;
pub mod sync;

const VERSION: &str = env!("CARGO_PKG_VERSION");

pub async fn index() -> Json<HealthCheckResponse> {
    let version = VERSION.to_string();

    Json(HealthCheckResponse {
        status: "Ok".to_string(),
        version,
    })
}

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use punchclock_common::api::ErrorMessage;

#[derive(thiserror::Error, Debug)]
pub enum ServerError {
    #[error("Database error: {0}")]
    DatabaseError(&'static str),

    #[error("Bad request: {0}")]
    BadRequest(&'static str),

    #[error("Not found: {0}")]
    NotFound(&'static str),

    #[error("Conflict: {0}")]
    Conflict(&'static str),
}

impl ServerError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServerError::NotFound(_) => StatusCode::NOT_FOUND,
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServerError::Conflict(_) => StatusCode::CONFLICT,
        }
    }

    pub fn message(&self) -> String {
        match self {
            ServerError::NotFound(v) => format!("{v} not found"),
            ServerError::BadRequest(v) => v.to_string(),
            ServerError::Conflict(v) => v.to_string(),
            ServerError::DatabaseError(_) => {
                "An unexpected error occurred. Please try again later".into()
            }
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        let error = self.message();

        (status, Json(ErrorMessage { error })).into_response()
    }
}

/// Failure reported by one of the store collaborators.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    /// The `(employee, clock in)` key already exists.
    #[error("entry already exists")]
    Conflict,

    #[error("{0}")]
    Backend(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Conflict,
            _ => StoreError::Backend(err.to_string()),
        }
    }
}

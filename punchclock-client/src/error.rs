use reqwest::StatusCode;

#[derive(thiserror::Error, Debug)]
pub enum ClientError {
    /// No response reached the terminal in time.
    #[error("Request timed out")]
    Timeout,

    #[error("Transport error: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("Service error ({status}): {message}")]
    Server { status: StatusCode, message: String },

    /// The server understood the request and refused it.
    #[error("Rejected ({status}): {message}")]
    Rejected { status: StatusCode, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Local storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

impl ClientError {
    /// Whether retrying the same request later may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ClientError::Timeout | ClientError::Transport(_) | ClientError::Server { .. }
        )
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ClientError::Timeout
        } else if err.is_decode() {
            ClientError::InvalidResponse(err.to_string())
        } else {
            ClientError::Transport(err)
        }
    }
}

use axum::http::StatusCode;
use std::path::PathBuf;
use thiserror::Error;

/// Rejected detector settings. Fatal: a detector is never built from them.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    #[error("deltaThreshold must be a finite, non-negative number (got {0})")]
    InvalidThreshold(f64),

    #[error("{field} must not be negative (got {value})")]
    NegativeDuration { field: &'static str, value: i64 },

    #[error("requiredConsecutiveShakes must be at least 1 (got {0})")]
    TooFewShakes(i64),
}

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid value for {key}: {value:?}")]
    Env { key: &'static str, value: String },

    #[error(transparent)]
    Invalid(#[from] ConfigurationError),
}

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        (self.status, self.message).into_response()
    }
}

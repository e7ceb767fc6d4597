use axum::Json;
use axum::response::{IntoResponse, Response};
use http::StatusCode;
use serde_json::json;
use thiserror::Error;

/// Errors surfaced to HTTP callers. Always marshaled as a JSON `{error}`
/// body, never as bare text, so injected scripts can parse every response
/// the same way.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("request failed: {}", self);
        }
        (status, Json(json!({"error": self.to_string()}))).into_response()
    }
}

impl From<launchtube_core::Error> for ApiError {
    fn from(err: launchtube_core::Error) -> Self {
        match err {
            launchtube_core::Error::ProfileNotFound(p) => {
                ApiError::NotFound(format!("profile not found: {p}"))
            }
            launchtube_core::Error::InvalidConfig(m) => ApiError::BadRequest(m),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<launchtube_player::Error> for ApiError {
    fn from(err: launchtube_player::Error) -> Self {
        match err {
            launchtube_player::Error::NotRunning => {
                ApiError::Conflict("no player is running".to_string())
            }
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<launchtube_browser::Error> for ApiError {
    fn from(err: launchtube_browser::Error) -> Self {
        match err {
            launchtube_browser::Error::NoBrowserFound => {
                ApiError::NotFound("no supported browser found".to_string())
            }
            launchtube_browser::Error::NotRunning => {
                ApiError::Conflict("no browser session is running".to_string())
            }
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        ApiError::Internal(err.to_string())
    }
}

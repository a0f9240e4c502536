use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("metadata store error: {0}")]
    Metadata(#[from] sqlx::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("geotag extraction failed: {0}")]
    Extract(String),

    #[error("fetch failed: {0}")]
    Fetch(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// JSON body attached to every error response
#[derive(Serialize)]
pub struct ErrorBody {
    pub code: u16,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            // A timed-out pool acquire is transient; everything else from the
            // store is a server fault.
            AppError::Metadata(sqlx::Error::PoolTimedOut) => {
                tracing::error!("metadata store connection pool exhausted");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "metadata store busy".to_string(),
                )
            }
            AppError::Metadata(e) => {
                tracing::error!("metadata store error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "metadata store error".to_string(),
                )
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::Extract(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg.clone()),
            AppError::Fetch(msg) => {
                tracing::error!("fetch error: {}", msg);
                (StatusCode::BAD_GATEWAY, msg.clone())
            }
            AppError::Storage(msg) => {
                tracing::error!("storage error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, msg.clone())
            }
            AppError::Io(e) => {
                tracing::error!("IO error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "IO error".to_string())
            }
        };

        let body = Json(ErrorBody {
            code: status.as_u16(),
            message,
        });
        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use wes_core::CoreError;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and adds HTTP-specific variants.
/// Implements [`IntoResponse`] to produce consistent JSON error responses.
/// An ownership mismatch maps to the same 404 as an unknown id, so job
/// existence never leaks to unauthorized callers.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `wes-core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The caller must present an identity for this endpoint.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Core(core) => match core {
                CoreError::NotFound => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    "Not found".to_string(),
                ),
                CoreError::Spawn { .. } | CoreError::Workspace { .. } => {
                    tracing::error!(error = %core, "Job submission failed");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "SUBMISSION_FAILED",
                        "Could not start the workflow runner".to_string(),
                    )
                }
                CoreError::Io(e) => {
                    tracing::error!(error = %e, "I/O error");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "INTERNAL_ERROR",
                        "An internal error occurred".to_string(),
                    )
                }
            },

            AppError::Unauthorized(msg) => {
                (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone())
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

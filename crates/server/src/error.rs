use axum::Json;
use axum::response::{IntoResponse, Response};
use hyper::StatusCode;
use sea_orm::DbErr;
use serde_json::json;
use thiserror::Error;

/// Failures of queue manager operations.
///
/// The three dequeue variants map onto the steps of the transition: the entry
/// lookup, the lead update, and the entry removal.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Queue entry or lead not found: {0}")]
    NotFound(String),
    #[error("Failed to record verification result on lead {lead_id}: {reason}")]
    UpdateFailed { lead_id: String, reason: String },
    #[error("Lead updated but queue entry {entry_id} could not be removed: {reason}")]
    DeleteFailed { entry_id: String, reason: String },
    #[error("Store error: {0}")]
    Store(#[from] DbErr),
}

/// Failures raised by a verification provider.
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),
    #[error("DNS lookup failed for {domain}: {reason}")]
    Dns { domain: String, reason: String },
    #[error("SMTP check failed: {0}")]
    Smtp(String),
    #[error("Timeout after {0:?}")]
    Timeout(std::time::Duration),
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl VerifyError {
    /// Whether a later drain has a reasonable chance of succeeding.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            VerifyError::Dns { .. }
                | VerifyError::Smtp(_)
                | VerifyError::Timeout(_)
                | VerifyError::Http(_)
        )
    }
}

/// Errors surfaced by HTTP handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Queue(#[from] QueueError),
    #[error("DB error: {0}")]
    Db(#[from] DbErr),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::NotFound(_) | ApiError::Queue(QueueError::NotFound(_)) => {
                StatusCode::NOT_FOUND
            }
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Queue(_) | ApiError::Db(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(
                name = "api.request_failed",
                target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                error = ?self,
                message = "Request failed"
            );
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};
use thiserror::Error;

/// Failures of the token lifecycle and the listing sync pipeline.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A required setting is absent. Never retried.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("marketplace rejected the token refresh (status {status}): {body}")]
    UpstreamAuth { status: u16, body: String },

    #[error("could not list active items for seller {seller_id} (status {status})")]
    UpstreamListing { seller_id: String, status: u16 },

    /// One item detail call failed. Recorded per item by the orchestrator.
    #[error("could not fetch item {item_id} (status {status})")]
    UpstreamItem { item_id: String, status: u16 },

    #[error("upstream request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("store error: {0}")]
    Store(#[source] anyhow::Error),
}

impl SyncError {
    pub fn config(message: impl Into<String>) -> Self {
        SyncError::Configuration(message.into())
    }
}

/// Errors returned by HTTP handlers. Every variant renders as
/// `{"ok": false, "error": ...}`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{message}")]
    BadRequest {
        message: String,
        details: Option<Value>,
    },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("{message}")]
    Upstream { message: String, details: Value },

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        AppError::BadRequest {
            message: message.into(),
            details: None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, msg, details) = match self {
            AppError::BadRequest { message, details } => {
                (StatusCode::BAD_REQUEST, message, details)
            }
            AppError::NotFound(what) => (StatusCode::NOT_FOUND, format!("{} not found", what), None),
            AppError::Upstream { message, details } => {
                tracing::warn!("upstream error: {}", message);
                (StatusCode::BAD_GATEWAY, message, Some(details))
            }
            AppError::Configuration(message) => {
                tracing::error!("configuration error: {}", message);
                (StatusCode::INTERNAL_SERVER_ERROR, message, None)
            }
            AppError::Sync(e) => {
                tracing::error!("sync error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string(), None)
            }
            AppError::Internal(e) => {
                tracing::error!("internal error: {:#}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string(), None)
            }
        };

        let mut body = json!({
            "ok": false,
            "error": msg,
        });
        if let (Some(target), Some(Value::Object(extra))) = (body.as_object_mut(), details) {
            target.extend(extra);
        }

        (status, Json(body)).into_response()
    }
}

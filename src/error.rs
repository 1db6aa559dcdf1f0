//! # error
//!
//! Error types for every layer of the dashboard client.
//!
//! * [`FetchError`]  : what can go wrong talking to the analytics API.
//! * [`StorageError`]: what can go wrong in the persistence substrate.
//! * [`AppError`]    : what the local dashboard surface returns.  Axum's
//!   `IntoResponse` impl converts these into structured JSON error bodies so
//!   the front-end always gets a machine-readable response even on failure.

use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// ─── FetchError ───────────────────────────────────────────────────────────────

/// Failure of a single call against the remote analytics API.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
    /// Request rejected, connection failed, or a non-success status came back.
    #[error("network failure: {0}")]
    Network(String),

    /// The quick stage did not answer inside its time budget.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The body was not the shape we expected.
    #[error("malformed response: {0}")]
    Parse(String),

    /// Well-formed response with zero usable records.
    #[error("response contained no records")]
    EmptyResult,
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            FetchError::Parse(err.to_string())
        } else {
            FetchError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        FetchError::Parse(err.to_string())
    }
}

// ─── StorageError ─────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

// ─── AppError ─────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum AppError {
    /// The request was syntactically correct but semantically invalid.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The requested symbol / resource is not known.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The analytics API failed us.
    #[error("Upstream error: {0}")]
    Upstream(#[from] FetchError),

    /// Client-local persistence failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Catch-all for unexpected failures.
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Upstream(FetchError::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            AppError::Storage(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = Json(json!({
            "ok":    false,
            "error": self.to_string(),
        }));

        (status, body).into_response()
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

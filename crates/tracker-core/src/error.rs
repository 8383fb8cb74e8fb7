//! Delivery tracker errors

use axum::Json;
use axum::response::{IntoResponse, Response};
use http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type used across the crate.
pub type Result<T> = anyhow::Result<T, Error>;

/// Failures raised while simulating runs, aggregating telemetry, or wiring up
/// change capture.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum Error {
    /// Anything without a more specific variant, usually an `anyhow` chain.
    #[error("code: 500, description: {0}")]
    Internal(String),

    /// A change message or route table could not be decoded.
    #[error("code: 500, description: invalid_format {0}")]
    InvalidFormat(String),

    /// A change message was missing a required field.
    #[error("code: 500, description: missing_field {0}")]
    MissingField(String),

    /// The driver is not present in the route table.
    #[error("code: 404, description: unknown_driver {0}")]
    UnknownDriver(String),

    /// The document store rejected a write.
    #[error("code: 500, description: store_error {0}")]
    Store(String),

    /// The change-capture connector could not be registered.
    #[error("code: 502, description: registration_failed {0}")]
    Registration(String),
}

impl Error {
    /// Returns the HTTP status associated with the variant.
    #[must_use]
    pub const fn code(&self) -> StatusCode {
        match self {
            Self::UnknownDriver(_) => StatusCode::NOT_FOUND,
            Self::Registration(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        // a wrapped domain error keeps its variant and gains the outer context
        if let Some(inner) = err.downcast_ref::<Self>() {
            tracing::debug!("Error: {err}, caused by: {inner}");

            return match inner {
                Self::Internal(_) => Self::Internal(format!("{err:#}")),
                Self::InvalidFormat(e) => Self::InvalidFormat(format!("{err}: {e}")),
                Self::MissingField(e) => Self::MissingField(format!("{err}: {e}")),
                Self::UnknownDriver(e) => Self::UnknownDriver(format!("{err}: {e}")),
                Self::Store(e) => Self::Store(format!("{err}: {e}")),
                Self::Registration(e) => Self::Registration(format!("{err}: {e}")),
            };
        }

        Self::Internal(format!("{err:#}"))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidFormat(err.to_string())
    }
}

/// Error rendered as a JSON `{"error": ...}` body by the HTTP layer.
#[derive(Debug)]
pub struct HttpError {
    status: StatusCode,
    error: String,
}

impl From<Error> for HttpError {
    fn from(e: Error) -> Self {
        Self { status: e.code(), error: e.to_string() }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        (self.status, Json(serde_json::json!({ "error": self.error }))).into_response()
    }
}

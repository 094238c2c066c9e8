//! Request-level failures and the JSON payload sent to callers.
//!
//! [`ProxyError`] is the tagged outcome of a failed forward: a validation
//! failure (400) detected before the pool is touched, or an
//! [`UpstreamError`] (500) raised while executing or streaming. The caller
//! only ever sees an [`ErrorPayload`] with a single best-effort message;
//! the full causal chain goes to the log.

use std::time::Duration;

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use super::body::Direction;

#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("No URL Parameter found")]
    MissingParameter,

    #[error("URL '{url}' is malformed")]
    InvalidUrl { url: String, reason: String },

    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("timed out after {}ms waiting for a pooled connection to {route}", waited.as_millis())]
    PoolTimeout { route: String, waited: Duration },

    #[error("connection pool is shut down")]
    PoolClosed,

    #[error("upstream request failed")]
    Client(#[source] hyper_util::client::legacy::Error),

    #[error("no response from upstream within {}ms", .0.as_millis())]
    ResponseTimeout(Duration),

    #[error("{direction} body stalled for more than {}ms", after.as_millis())]
    BodyStalled { direction: Direction, after: Duration },
}

impl UpstreamError {
    /// Stable name of the failure, used when no message is available.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::PoolTimeout { .. } => "PoolTimeout",
            Self::PoolClosed => "PoolClosed",
            Self::Client(_) => "ClientError",
            Self::ResponseTimeout(_) => "ResponseTimeout",
            Self::BodyStalled { .. } => "BodyStalled",
        }
    }
}

impl ProxyError {
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::MissingParameter | Self::InvalidUrl { .. } => StatusCode::BAD_REQUEST,
            Self::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message shown to the caller. Upstream failures are reduced to the
    /// innermost cause, e.g. `Connection refused (os error 111)`.
    #[must_use]
    pub fn caller_message(&self) -> String {
        match self {
            Self::Upstream(e) => best_effort_message(e),
            other => other.to_string(),
        }
    }

    #[must_use]
    pub fn to_payload(&self) -> ErrorPayload {
        ErrorPayload::new(self.status(), self.caller_message())
    }
}

/// Innermost cause's message, else the error's own message, else its kind.
#[must_use]
pub fn best_effort_message(err: &UpstreamError) -> String {
    let mut innermost: &(dyn std::error::Error + 'static) = err;
    while let Some(source) = innermost.source() {
        innermost = source;
    }

    [innermost.to_string(), err.to_string()]
        .into_iter()
        .find(|m| !m.trim().is_empty())
        .unwrap_or_else(|| err.kind().to_string())
}

/// Render an error and all of its sources as `outer: cause: root`.
#[must_use]
pub fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut rendered = err.to_string();
    let mut current = err.source();
    while let Some(source) = current {
        rendered.push_str(": ");
        rendered.push_str(&source.to_string());
        current = source.source();
    }
    rendered
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub message: String,
    pub status: u16,
    pub reason: String,
}

impl ErrorPayload {
    #[must_use]
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
        }
    }
}

impl IntoResponse for ErrorPayload {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        match serde_json::to_vec(&self) {
            Ok(body) => (
                status,
                [(
                    header::CONTENT_TYPE,
                    HeaderValue::from_static("application/json"),
                )],
                body,
            )
                .into_response(),
            Err(e) => {
                tracing::error!(
                    error = %e,
                    status = self.status,
                    "failed to serialize error payload, sending plain text"
                );
                (status, self.message).into_response()
            }
        }
    }
}

//! Relay error types with HTTP status code mapping.
//!
//! [`RelayError`] is the central error type for the relay. Each variant
//! maps to a specific HTTP status code and structured JSON error response.
//! Nothing here is fatal to the process: every error is scoped to one
//! request or one connection.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{ConnectionId, ConnectionState, SessionEvent, TransportError};

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 1001,
///     "message": "invalid request: channel must not be empty",
///     "details": null
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code.
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Server-side error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category          | HTTP Status               |
/// |-----------|-------------------|---------------------------|
/// | 1000–1999 | Validation        | 400 Bad Request           |
/// | 2000–2999 | Connection state  | 404 Not Found / 409 Conflict |
/// | 3000–3999 | Server/transport  | 500 / 502                 |
///
/// Publishing to an empty channel and subscribing twice are not errors:
/// they surface as zero-attempt delivery reports and unchanged
/// [`crate::domain::MembershipChange`]s respectively.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// Malformed publish or subscribe input; rejected before any state change.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// No connection with the given id is registered.
    #[error("connection not found: {0}")]
    ConnectionNotFound(ConnectionId),

    /// The connection exists but cannot change membership in its state.
    #[error("connection {id} is {state}, not open")]
    ConnectionNotOpen {
        /// Connection identifier.
        id: ConnectionId,
        /// Current state.
        state: ConnectionState,
    },

    /// A lifecycle event arrived in a state that does not accept it.
    #[error("connection {id}: {event} not allowed while {from}")]
    IllegalTransition {
        /// Connection identifier.
        id: ConnectionId,
        /// State the connection was in.
        from: ConnectionState,
        /// Rejected event.
        event: SessionEvent,
    },

    /// Sending to a specific client failed.
    #[error("transport failure: {0}")]
    TransportFailure(#[from] TransportError),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl RelayError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidRequest(_) => 1001,
            Self::ConnectionNotFound(_) => 2001,
            Self::ConnectionNotOpen { .. } => 2002,
            Self::IllegalTransition { .. } => 2003,
            Self::Internal(_) => 3000,
            Self::TransportFailure(_) => 3001,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::ConnectionNotFound(_) => StatusCode::NOT_FOUND,
            Self::ConnectionNotOpen { .. } | Self::IllegalTransition { .. } => {
                StatusCode::CONFLICT
            }
            Self::TransportFailure(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: None,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}

//! Centralized error types for the Beamlink core library.
//!
//! Every command either succeeds with a typed value or fails with exactly one
//! [`CastError`]. Errors carry a stable machine-readable code, map onto an
//! HTTP status for the command server, and serialize into the
//! `{ code, message }` payload delivered to command callers.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::readiness::ReadinessError;

/// Application-wide error type for command execution.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "type", content = "details")]
pub enum CastError {
    /// Casting capability is missing on this host.
    #[error("Casting is not supported: {0}")]
    Unsupported(String),

    /// Caller sent a missing, empty or mistyped argument.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A discovery window is already open.
    #[error("A discovery window is already open")]
    DiscoveryAlreadyActive,

    /// The discovery collaborator refused to start.
    #[error("Discovery failed: {0}")]
    DiscoveryFailed(String),

    /// Device id is not part of the last discovery snapshot.
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    /// Operation conflicts with the current (transient or occupied) session state.
    #[error("Session busy: {0}")]
    SessionBusy(String),

    /// Session could not be established.
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Polled resource never became available.
    #[error("Timed out waiting for {0}")]
    ReadinessTimeout(String),

    /// Readiness wait was abandoned because the session changed.
    #[error("Stopped waiting for {0}")]
    ReadinessCancelled(String),

    /// Command needs a live session and there is none.
    #[error("No active session")]
    NoActiveSession,

    /// Receiver rejected the media load.
    #[error("Media load failed: {0}")]
    LoadFailed(String),

    /// Receiver rejected a transport command.
    #[error("Playback command failed: {0}")]
    PlaybackFailed(String),

    /// Command name is unknown or not available on this host.
    #[error("Not implemented: {0}")]
    NotImplemented(String),

    /// Orchestrator or runtime failure.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CastError {
    /// Returns a machine-readable error code for command callers.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unsupported(_) => "unsupported",
            Self::InvalidArgument(_) => "invalid_argument",
            Self::DiscoveryAlreadyActive => "discovery_already_active",
            Self::DiscoveryFailed(_) => "discovery_failed",
            Self::DeviceNotFound(_) => "device_not_found",
            Self::SessionBusy(_) => "session_busy",
            Self::ConnectionError(_) => "connection_error",
            Self::ReadinessTimeout(_) => "readiness_timeout",
            Self::ReadinessCancelled(_) => "readiness_cancelled",
            Self::NoActiveSession => "no_active_session",
            Self::LoadFailed(_) => "load_failed",
            Self::PlaybackFailed(_) => "playback_failed",
            Self::NotImplemented(_) => "not_implemented",
            Self::Internal(_) => "internal_error",
        }
    }

    /// Maps the error to an appropriate HTTP status code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            Self::DeviceNotFound(_) => StatusCode::NOT_FOUND,
            Self::DiscoveryAlreadyActive
            | Self::SessionBusy(_)
            | Self::NoActiveSession
            | Self::ReadinessCancelled(_) => StatusCode::CONFLICT,
            Self::ReadinessTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Self::DiscoveryFailed(_)
            | Self::ConnectionError(_)
            | Self::LoadFailed(_)
            | Self::PlaybackFailed(_) => StatusCode::BAD_GATEWAY,
            Self::Unsupported(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::NotImplemented(_) => StatusCode::NOT_IMPLEMENTED,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether the caller can reasonably retry the same command later.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ReadinessTimeout(_) | Self::SessionBusy(_) | Self::DiscoveryAlreadyActive
        )
    }

    /// Builds the `{ code, message }` payload delivered to command callers.
    pub fn to_payload(&self) -> ErrorPayload {
        ErrorPayload {
            code: self.code(),
            message: self.to_string(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Result Type Aliases
// ─────────────────────────────────────────────────────────────────────────────

/// Convenient Result alias for command execution.
pub type CastResult<T> = Result<T, CastError>;

/// Error payload returned to command callers (method channel and WebSocket).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorPayload {
    pub code: &'static str,
    pub message: String,
}

/// JSON response body for error responses.
#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
    message: String,
    status: u16,
}

impl IntoResponse for CastError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: self.code(),
            message: self.to_string(),
            status: status.as_u16(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<ReadinessError> for CastError {
    fn from(err: ReadinessError) -> Self {
        match err {
            ReadinessError::Timeout { .. } => Self::ReadinessTimeout(err.to_string()),
            ReadinessError::Cancelled { .. } => Self::ReadinessCancelled(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_not_found_returns_correct_code() {
        let err = CastError::DeviceNotFound("kitchen".into());
        assert_eq!(err.code(), "device_not_found");
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert!(!err.is_retryable());
    }

    #[test]
    fn transient_conflicts_are_retryable() {
        assert!(CastError::SessionBusy("connecting".into()).is_retryable());
        assert!(CastError::DiscoveryAlreadyActive.is_retryable());
        assert!(CastError::ReadinessTimeout("client".into()).is_retryable());
        assert!(!CastError::NoActiveSession.is_retryable());
    }

    #[test]
    fn readiness_errors_keep_their_kind() {
        let timeout: CastError = ReadinessError::Timeout {
            resource: "remote media client".into(),
            attempts: 3,
        }
        .into();
        assert_eq!(timeout.code(), "readiness_timeout");

        let cancelled: CastError = ReadinessError::Cancelled {
            resource: "remote media client".into(),
        }
        .into();
        assert_eq!(cancelled.code(), "readiness_cancelled");
        assert_eq!(cancelled.status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn payload_carries_code_and_message() {
        let payload = CastError::InvalidArgument("deviceId must not be empty".into()).to_payload();
        assert_eq!(payload.code, "invalid_argument");
        assert_eq!(payload.message, "Invalid argument: deviceId must not be empty");
    }
}

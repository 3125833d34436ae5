//! Centralized error types for the Caster core library.
//!
//! Component errors live next to the component that raises them
//! ([`DecodeError`], [`DispatchError`], [`CastError`], [`DiscoveryError`],
//! [`TransportError`]). This module ties them together:
//! - [`ErrorCode`] gives every error a stable machine-readable code for logs
//! - [`CasterError`] is the application-level error returned from bootstrap
//!   and from the consumer loop to the process owner

use thiserror::Error;

use crate::cast::{CastError, DiscoveryError};
use crate::messages::DecodeError;
use crate::services::command_dispatcher::DispatchError;
use crate::transport::TransportError;

/// Trait for error types that provide machine-readable error codes.
///
/// Implement this trait to provide consistent error codes across different
/// error conversion paths.
pub trait ErrorCode {
    /// Returns a machine-readable error code for logs.
    fn code(&self) -> &'static str;
}

impl ErrorCode for DecodeError {
    fn code(&self) -> &'static str {
        "decode_error"
    }
}

impl ErrorCode for DiscoveryError {
    fn code(&self) -> &'static str {
        match self {
            Self::Resolution { .. } => "discovery_resolution_error",
            Self::MdnsDaemon(_) => "mdns_daemon_failed",
            Self::AlreadyRunning => "discovery_already_running",
            Self::StreamClosed => "discovery_stream_closed",
        }
    }
}

impl ErrorCode for CastError {
    fn code(&self) -> &'static str {
        match self {
            Self::Timeout(_) => "casting_backend_timeout",
            Self::Discovery(e) => e.code(),
            _ => "casting_backend_error",
        }
    }
}

impl ErrorCode for DispatchError {
    fn code(&self) -> &'static str {
        match self {
            Self::Decode(e) => e.code(),
            Self::TargetNotFound(_) => "target_not_found",
            Self::Casting { source, .. } => source.code(),
        }
    }
}

impl ErrorCode for TransportError {
    fn code(&self) -> &'static str {
        match self {
            Self::Publish(_) => "publish_failed",
            Self::Encode(_) => "encode_failed",
            _ => "transport_fatal",
        }
    }
}

/// Application-wide error type for the Caster service.
#[derive(Debug, Error)]
pub enum CasterError {
    /// Configuration values are missing or out of range.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The casting/discovery backend could not be started.
    #[error("Casting backend error: {0}")]
    Backend(#[from] CastError),

    /// The broker connection or inbound stream failed.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Internal invariant violated (e.g. services started twice).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ErrorCode for CasterError {
    fn code(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration_error",
            Self::Backend(e) => e.code(),
            Self::Transport(e) => e.code(),
            Self::Internal(_) => "internal_error",
        }
    }
}

/// Convenient Result alias for application-wide operations.
pub type CasterResult<T> = Result<T, CasterError>;

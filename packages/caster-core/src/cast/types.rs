//! Shared types for renderer discovery and casting.

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Device class reported by the discovery backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RendererKind {
    /// Google Cast receiver (`_googlecast._tcp`).
    Chromecast,
    /// AirPlay receiver (`_airplay._tcp`).
    #[serde(rename = "airplay")]
    AirPlay,
    /// Anything else the backend reports.
    Other,
}

impl fmt::Display for RendererKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Chromecast => write!(f, "chromecast"),
            Self::AirPlay => write!(f, "airplay"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// Errors raised while discovering renderers.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// The backend reported a renderer whose name could not be resolved.
    #[error("could not resolve renderer name for {id}")]
    Resolution {
        /// Backend identifier of the renderer.
        id: String,
    },

    /// mDNS daemon error.
    #[error("mDNS daemon error: {0}")]
    MdnsDaemon(String),

    /// A discovery session is already running on this backend.
    #[error("discovery session already running")]
    AlreadyRunning,

    /// The backend ended its discovery stream while the service was running.
    #[error("discovery stream closed by backend")]
    StreamClosed,
}

/// Errors raised by casting backend calls.
#[derive(Debug, Error)]
pub enum CastError {
    /// Renderer has no usable network address.
    #[error("renderer {0} has no reachable address")]
    NoAddress(String),

    /// The player cannot drive this kind of renderer.
    #[error("renderer kind {0} is not supported by the player")]
    UnsupportedKind(RendererKind),

    /// The player process could not be launched.
    #[error("failed to launch player: {0}")]
    Spawn(#[source] std::io::Error),

    /// The player process exited while starting up.
    #[error("player exited during startup: {0}")]
    PlayerExited(String),

    /// The player process could not be stopped.
    #[error("failed to stop player: {0}")]
    Stop(#[source] std::io::Error),

    /// A backend call did not finish within its deadline.
    #[error("backend call timed out after {0:?}")]
    Timeout(Duration),

    /// Discovery failure surfaced through a backend call.
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),
}

/// Convenient Result alias for casting operations.
pub type CastResult<T> = Result<T, CastError>;

/// Backend-owned description of a discovered renderer.
///
/// Handles are created by the backend, shared through `Arc`, and stored in
/// the registry as-is; casting calls borrow them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RendererHandle {
    id: String,
    kind: RendererKind,
    friendly_name: Option<String>,
    address: Option<SocketAddr>,
    model: Option<String>,
}

impl RendererHandle {
    /// Creates a handle with only the backend identifier and kind known.
    pub fn new(id: impl Into<String>, kind: RendererKind) -> Self {
        Self {
            id: id.into(),
            kind,
            friendly_name: None,
            address: None,
            model: None,
        }
    }

    /// Sets the user-facing renderer name.
    #[must_use]
    pub fn with_friendly_name(mut self, name: impl Into<String>) -> Self {
        self.friendly_name = Some(name.into());
        self
    }

    /// Sets the address the renderer listens on.
    #[must_use]
    pub fn with_address(mut self, address: SocketAddr) -> Self {
        self.address = Some(address);
        self
    }

    /// Sets the model string reported by the device.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Backend identifier (stable for the lifetime of the advertisement).
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Device class of the renderer.
    pub fn kind(&self) -> RendererKind {
        self.kind
    }

    /// Address of the renderer, if the backend resolved one.
    pub fn address(&self) -> Option<SocketAddr> {
        self.address
    }

    /// Model string, if the device advertised one.
    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    /// Resolves the renderer's stable name.
    ///
    /// Fails with [`DiscoveryError::Resolution`] when the backend could not
    /// determine a non-blank friendly name.
    pub fn name(&self) -> Result<&str, DiscoveryError> {
        self.friendly_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| DiscoveryError::Resolution {
                id: self.id.clone(),
            })
    }
}

/// A single add/remove notification from the discovery backend.
///
/// Both kinds travel on one ordered channel so removals are never starved by
/// a burst of additions.
#[derive(Debug, Clone)]
pub enum DiscoveryEvent {
    /// A renderer was found (or re-announced).
    Added(Arc<RendererHandle>),
    /// A renderer is no longer available.
    Removed(Arc<RendererHandle>),
}

impl DiscoveryEvent {
    /// The renderer the event is about.
    pub fn handle(&self) -> &Arc<RendererHandle> {
        match self {
            Self::Added(handle) | Self::Removed(handle) => handle,
        }
    }
}

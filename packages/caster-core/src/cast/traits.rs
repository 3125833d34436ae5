//! Trait abstraction for the casting/discovery backend.
//!
//! The orchestration layer depends on this trait rather than on mDNS or the
//! player process, so services can be tested with in-memory mocks.

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::types::{CastResult, DiscoveryEvent, RendererHandle};

/// Backend that discovers renderers and casts media to them.
#[async_trait]
pub trait CastingBackend: Send + Sync {
    /// Starts a discovery session.
    ///
    /// Add/remove notifications are pushed onto `events` in the order the
    /// backend observes them until [`stop_discovery`](Self::stop_discovery)
    /// is called or the receiver is dropped.
    fn start_discovery(&self, events: mpsc::Sender<DiscoveryEvent>) -> CastResult<()>;

    /// Stops the running discovery session, if any.
    fn stop_discovery(&self) -> CastResult<()>;

    /// Starts playing `locator` on `renderer`, replacing anything already
    /// playing there.
    async fn start_casting(&self, locator: &str, renderer: &RendererHandle) -> CastResult<()>;

    /// Stops playback on `renderer`. Stopping an idle renderer succeeds.
    async fn stop_casting(&self, renderer: &RendererHandle) -> CastResult<()>;

    /// Releases all backend resources.
    async fn shutdown(&self);
}

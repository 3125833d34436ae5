//! Keeps the renderer registry in sync with the discovery backend.
//!
//! The bridge consumes the backend's ordered add/remove stream, drops
//! renderers that are not of the target kind, updates the registry and emits
//! one Found/Lost notification per qualifying event.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::cast::{CastResult, CastingBackend, DiscoveryError, DiscoveryEvent, RendererKind};
use crate::error::ErrorCode;
use crate::events::{NotificationEmitter, NotificationEvent};
use crate::protocol_constants::DISCOVERY_CHANNEL_CAPACITY;

use super::renderer_registry::RendererRegistry;

/// Translates discovery events into registry updates and notifications.
pub struct DiscoveryBridge {
    backend: Arc<dyn CastingBackend>,
    registry: Arc<RendererRegistry>,
    emitter: Arc<dyn NotificationEmitter>,
    target_kind: RendererKind,
}

impl DiscoveryBridge {
    pub fn new(
        backend: Arc<dyn CastingBackend>,
        registry: Arc<RendererRegistry>,
        emitter: Arc<dyn NotificationEmitter>,
        target_kind: RendererKind,
    ) -> Self {
        Self {
            backend,
            registry,
            emitter,
            target_kind,
        }
    }

    /// Starts a backend discovery session and returns its event stream.
    pub fn start(&self) -> CastResult<mpsc::Receiver<DiscoveryEvent>> {
        let (tx, rx) = mpsc::channel(DISCOVERY_CHANNEL_CAPACITY);
        self.backend.start_discovery(tx)?;
        log::info!(
            "[DiscoveryBridge] Discovery started (target kind: {})",
            self.target_kind
        );
        Ok(rx)
    }

    /// Applies one discovery event.
    ///
    /// Returns the Found/Lost notification emitted for the event's renderer,
    /// or `None` when the renderer is not of the target kind or the removal
    /// no longer matches the registered renderer. A renderer that reappears
    /// under a new name also gets a Lost for its old name, emitted first.
    pub fn handle_event(
        &self,
        event: &DiscoveryEvent,
    ) -> Result<Option<NotificationEvent>, DiscoveryError> {
        let handle = event.handle();
        if handle.kind() != self.target_kind {
            log::debug!(
                "[DiscoveryBridge] Ignoring {} renderer {}",
                handle.kind(),
                handle.id()
            );
            return Ok(None);
        }

        let name = handle.name()?.to_string();
        let notification = match event {
            DiscoveryEvent::Added(handle) => {
                let displaced = self.registry.add(name.clone(), Arc::clone(handle));
                if let Some(old_name) = displaced.renamed_from {
                    self.emitter.emit(NotificationEvent::Lost { name: old_name });
                }
                NotificationEvent::Found { name }
            }
            DiscoveryEvent::Removed(handle) => {
                if self.registry.remove_if(&name, handle).is_none() {
                    log::debug!(
                        "[DiscoveryBridge] No live renderer {} for {}, skipping Lost",
                        name,
                        handle.id()
                    );
                    return Ok(None);
                }
                NotificationEvent::Lost { name }
            }
        };

        self.emitter.emit(notification.clone());
        Ok(Some(notification))
    }

    /// Processes events until cancelled or until the backend closes the
    /// stream. On cancellation the backend discovery session is stopped.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError::StreamClosed`] when the backend closes the
    /// stream. The registry can no longer follow the network after that.
    pub async fn run(
        &self,
        mut events: mpsc::Receiver<DiscoveryEvent>,
        cancel: CancellationToken,
    ) -> Result<(), DiscoveryError> {
        loop {
            let event = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    if let Err(e) = self.backend.stop_discovery() {
                        log::warn!("[DiscoveryBridge] Failed to stop discovery: {}", e);
                    }
                    log::info!("[DiscoveryBridge] Stopped");
                    return Ok(());
                }
                event = events.recv() => event,
            };

            let Some(event) = event else {
                return Err(DiscoveryError::StreamClosed);
            };

            if let Err(e) = self.handle_event(&event) {
                log::warn!(
                    "[DiscoveryBridge] Skipping discovery event ({}): {}",
                    e.code(),
                    e
                );
            }
        }
    }
}

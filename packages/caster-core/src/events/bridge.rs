//! Bridge implementation that maps notifications onto a bounded queue.
//!
//! The [`QueueEventBridge`] lives at the boundary between the discovery
//! bridge and the outbound notifier. The queue preserves emission order and
//! bounds memory; when it is full the notification is dropped, never the
//! registry update that produced it.

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::mpsc;

use super::emitter::NotificationEmitter;
use super::NotificationEvent;

/// Bridges notifications to the outbound notifier's queue.
///
/// An optional external emitter receives a copy of every event first (e.g.
/// [`LoggingNotificationEmitter`](super::LoggingNotificationEmitter) when
/// debugging).
#[derive(Clone)]
pub struct QueueEventBridge {
    tx: mpsc::Sender<NotificationEvent>,
    /// Optional external emitter for additional delivery
    external_emitter: Arc<RwLock<Option<Arc<dyn NotificationEmitter>>>>,
}

impl QueueEventBridge {
    /// Creates a new bridge and the receiving half of its queue.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<NotificationEvent>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::with_sender(tx), rx)
    }

    /// Creates a new bridge wrapping an existing sender.
    pub fn with_sender(tx: mpsc::Sender<NotificationEvent>) -> Self {
        Self {
            tx,
            external_emitter: Arc::new(RwLock::new(None)),
        }
    }

    /// Sets an external emitter that sees every event before it is queued.
    pub fn set_external_emitter(&self, emitter: Arc<dyn NotificationEmitter>) {
        *self.external_emitter.write() = Some(emitter);
    }
}

impl NotificationEmitter for QueueEventBridge {
    fn emit(&self, event: NotificationEvent) {
        if let Some(ref emitter) = *self.external_emitter.read() {
            emitter.emit(event.clone());
        }
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(event)) => {
                log::warn!(
                    "[EventBridge] Notification queue full, dropping {} for {}",
                    event.type_tag(),
                    event.name()
                );
            }
            Err(mpsc::error::TrySendError::Closed(event)) => {
                log::debug!(
                    "[EventBridge] Notifier stopped, dropping {} for {}",
                    event.type_tag(),
                    event.name()
                );
            }
        }
    }
}

//! Notification emitter abstraction for decoupling discovery from transport.
//!
//! The discovery bridge depends on the [`NotificationEmitter`] trait rather
//! than on the notifier queue, enabling testing and alternative delivery.

use super::NotificationEvent;

/// Trait for emitting renderer notifications without knowledge of transport.
///
/// Implementations must not block: the discovery bridge calls `emit` inline
/// while processing backend events.
pub trait NotificationEmitter: Send + Sync {
    /// Emits a Found/Lost notification.
    fn emit(&self, event: NotificationEvent);
}

/// Logging emitter for debugging and development.
///
/// Logs all events at debug level.
pub struct LoggingNotificationEmitter;

impl NotificationEmitter for LoggingNotificationEmitter {
    fn emit(&self, event: NotificationEvent) {
        tracing::debug!(?event, "renderer_notification");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Test emitter that counts events by kind.
    struct CountingEmitter {
        found: AtomicUsize,
        lost: AtomicUsize,
    }

    impl NotificationEmitter for CountingEmitter {
        fn emit(&self, event: NotificationEvent) {
            match event {
                NotificationEvent::Found { .. } => self.found.fetch_add(1, Ordering::SeqCst),
                NotificationEvent::Lost { .. } => self.lost.fetch_add(1, Ordering::SeqCst),
            };
        }
    }

    #[test]
    fn emitter_is_object_safe_and_counts() {
        let counting = Arc::new(CountingEmitter {
            found: AtomicUsize::new(0),
            lost: AtomicUsize::new(0),
        });
        let emitter: Arc<dyn NotificationEmitter> = counting.clone();

        emitter.emit(NotificationEvent::Found { name: "a".into() });
        emitter.emit(NotificationEvent::Found { name: "b".into() });
        emitter.emit(NotificationEvent::Lost { name: "a".into() });
        LoggingNotificationEmitter.emit(NotificationEvent::Lost { name: "a".into() });

        assert_eq!(counting.found.load(Ordering::SeqCst), 2);
        assert_eq!(counting.lost.load(Ordering::SeqCst), 1);
    }
}

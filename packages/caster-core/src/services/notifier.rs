//! Publishes renderer notifications to the broker.
//!
//! The notifier owns the receiving end of the queue filled by the
//! [`QueueEventBridge`](crate::events::QueueEventBridge). It never touches the
//! registry; a notification that cannot be published is logged and dropped.

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::ErrorCode;
use crate::events::NotificationEvent;
use crate::protocol_constants::JSON_CONTENT_TYPE;
use crate::transport::{with_retry, OutboundMessage, Publisher, TransportError, TransportResult};

/// Serializes notifications and hands them to a [`Publisher`].
pub struct OutboundNotifier {
    publisher: Arc<dyn Publisher>,
    routing_key: String,
}

impl OutboundNotifier {
    pub fn new(publisher: Arc<dyn Publisher>, routing_key: impl Into<String>) -> Self {
        Self {
            publisher,
            routing_key: routing_key.into(),
        }
    }

    /// Builds the wire message for `event`.
    pub fn message_for(&self, event: &NotificationEvent) -> TransportResult<OutboundMessage> {
        let body = serde_json::to_vec(&event.to_body())
            .map_err(|e| TransportError::Encode(e.to_string()))?;
        Ok(OutboundMessage {
            type_tag: event.type_tag(),
            routing_key: self.routing_key.clone(),
            body: Bytes::from(body),
            content_type: JSON_CONTENT_TYPE,
            persistent: true,
        })
    }

    /// Publishes one notification, retrying transient failures.
    pub async fn publish(&self, event: &NotificationEvent) -> TransportResult<()> {
        let message = self.message_for(event)?;
        with_retry(event.type_tag(), || self.publisher.publish(&message)).await?;
        log::info!(
            "[Notifier] Published {} for {}",
            event.type_tag(),
            event.name()
        );
        Ok(())
    }

    async fn publish_or_drop(&self, event: NotificationEvent) {
        if let Err(e) = self.publish(&event).await {
            log::error!(
                "[Notifier] Dropping {} for {} ({}): {}",
                event.type_tag(),
                event.name(),
                e.code(),
                e
            );
        }
    }

    /// Publishes queued notifications until the queue closes or `cancel`
    /// fires. Events already queued at cancellation are still published.
    pub async fn run(&self, mut events: mpsc::Receiver<NotificationEvent>, cancel: CancellationToken) {
        loop {
            let event = tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                event = events.recv() => event,
            };
            match event {
                Some(event) => self.publish_or_drop(event).await,
                None => {
                    log::info!("[Notifier] Notification queue closed");
                    return;
                }
            }
        }

        events.close();
        let mut drained = 0;
        while let Some(event) = events.recv().await {
            self.publish_or_drop(event).await;
            drained += 1;
        }
        log::info!("[Notifier] Stopped after draining {} notification(s)", drained);
    }
}

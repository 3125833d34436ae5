//! Broker boundary: inbound deliveries, outbound publishing, and the AMQP
//! adapter implementing both.
//!
//! Services only see the traits defined here, so the consumer pool and the
//! notifier are tested against in-memory fakes.

pub mod amqp;
mod retry;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

pub use amqp::{AmqpInbound, AmqpPublisher, AmqpSettings, AmqpTransport};
pub(crate) use retry::with_retry;

/// Errors raised at the broker boundary.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connecting to the broker or opening a channel failed.
    #[error("broker connection failed: {0}")]
    Connection(String),

    /// Declaring or binding the queue failed.
    #[error("topology setup failed: {0}")]
    Topology(String),

    /// The inbound stream ended or yielded an error.
    #[error("inbound stream closed: {0}")]
    StreamClosed(String),

    /// Acknowledging or rejecting a delivery failed.
    #[error("acknowledgement failed: {0}")]
    Acknowledge(String),

    /// A consumer worker panicked or was aborted.
    #[error("consumer worker failed: {0}")]
    WorkerFailed(String),

    /// Publishing a message failed.
    #[error("publish failed: {0}")]
    Publish(String),

    /// A message body could not be serialized.
    #[error("failed to encode message: {0}")]
    Encode(String),
}

impl TransportError {
    /// Whether retrying the same operation may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Publish(_))
    }
}

/// Convenient Result alias for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Transport-level view of one inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageEnvelope {
    /// Message type tag (AMQP `type` property); empty when absent.
    pub type_tag: String,
    /// Routing key the message was published with.
    pub routing_key: String,
    /// Raw message body.
    pub body: Bytes,
    /// Broker flag: the message was delivered before.
    pub redelivered: bool,
    /// Count of earlier deliveries, when the transport tracks one.
    pub delivery_count: Option<u32>,
}

impl MessageEnvelope {
    /// Creates a first-delivery envelope.
    pub fn new(type_tag: impl Into<String>, routing_key: impl Into<String>, body: Bytes) -> Self {
        Self {
            type_tag: type_tag.into(),
            routing_key: routing_key.into(),
            body,
            redelivered: false,
            delivery_count: None,
        }
    }

    /// 1-based delivery attempt number of this message.
    ///
    /// Uses the transport's delivery counter when present. Without it, a
    /// redelivered message counts as the second attempt.
    pub fn attempt(&self) -> u32 {
        match self.delivery_count {
            Some(count) => count.saturating_add(1),
            None if self.redelivered => 2,
            None => 1,
        }
    }
}

/// One inbound message awaiting settlement.
///
/// Settling consumes the delivery, so a message is acked or rejected at most
/// once.
#[async_trait]
pub trait Delivery: Send {
    /// The message being delivered.
    fn envelope(&self) -> &MessageEnvelope;

    /// Acknowledges the message.
    async fn ack(self: Box<Self>) -> TransportResult<()>;

    /// Negatively acknowledges the message, optionally returning it to the
    /// queue. A returned message must come back with its delivery counter
    /// advanced, otherwise the redelivery bound never fires.
    async fn reject(self: Box<Self>, requeue: bool) -> TransportResult<()>;
}

/// Source of inbound deliveries.
#[async_trait]
pub trait InboundStream: Send {
    /// Waits for the next delivery.
    ///
    /// `None` means the broker closed the stream.
    async fn next(&mut self) -> Option<TransportResult<Box<dyn Delivery>>>;
}

/// A message to publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    /// Message type tag (AMQP `type` property).
    pub type_tag: &'static str,
    /// Routing key to publish with.
    pub routing_key: String,
    /// Serialized body.
    pub body: Bytes,
    /// MIME type of the body.
    pub content_type: &'static str,
    /// Whether the broker should persist the message.
    pub persistent: bool,
}

/// Publishes messages to the broker.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Publishes one message and waits for the broker to confirm it.
    async fn publish(&self, message: &OutboundMessage) -> TransportResult<()>;
}

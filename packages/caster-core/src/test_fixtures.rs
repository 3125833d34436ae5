//! Shared test doubles for the service tests.
//!
//! The mocks record every call so tests can assert on what the services did,
//! and can be scripted to fail or stall.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::cast::{CastError, CastResult, CastingBackend, DiscoveryEvent, RendererHandle};
use crate::events::{NotificationEmitter, NotificationEvent};
use crate::transport::{
    Delivery, InboundStream, MessageEnvelope, OutboundMessage, Publisher, TransportError,
    TransportResult,
};

// ─────────────────────────────────────────────────────────────────────────────
// Casting backend
// ─────────────────────────────────────────────────────────────────────────────

/// Casting backend that records calls instead of talking to devices.
#[derive(Default)]
pub struct MockBackend {
    /// (locator, renderer id) per start call
    pub started: Mutex<Vec<(String, String)>>,
    /// Renderer id per stop call
    pub stopped: Mutex<Vec<String>>,
    pub fail_casting: AtomicBool,
    /// Delay applied to every casting call
    pub casting_delay: Mutex<Option<Duration>>,
    pub discovery_tx: Mutex<Option<mpsc::Sender<DiscoveryEvent>>>,
    pub discovery_stopped: AtomicBool,
    pub shutdown_called: AtomicBool,
}

impl MockBackend {
    pub fn failing() -> Self {
        let backend = Self::default();
        backend.fail_casting.store(true, Ordering::SeqCst);
        backend
    }

    pub fn slow(delay: Duration) -> Self {
        let backend = Self::default();
        *backend.casting_delay.lock() = Some(delay);
        backend
    }

    pub fn start_count(&self) -> usize {
        self.started.lock().len()
    }

    pub fn stop_count(&self) -> usize {
        self.stopped.lock().len()
    }

    /// Sender the bridge handed to `start_discovery`.
    pub fn discovery_sender(&self) -> Option<mpsc::Sender<DiscoveryEvent>> {
        self.discovery_tx.lock().clone()
    }

    async fn casting_call(&self) -> CastResult<()> {
        let delay = *self.casting_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_casting.load(Ordering::SeqCst) {
            return Err(CastError::PlayerExited("exit status: 1".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl CastingBackend for MockBackend {
    fn start_discovery(&self, events: mpsc::Sender<DiscoveryEvent>) -> CastResult<()> {
        *self.discovery_tx.lock() = Some(events);
        Ok(())
    }

    fn stop_discovery(&self) -> CastResult<()> {
        self.discovery_tx.lock().take();
        self.discovery_stopped.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn start_casting(&self, locator: &str, renderer: &RendererHandle) -> CastResult<()> {
        self.started
            .lock()
            .push((locator.to_string(), renderer.id().to_string()));
        self.casting_call().await
    }

    async fn stop_casting(&self, renderer: &RendererHandle) -> CastResult<()> {
        self.stopped.lock().push(renderer.id().to_string());
        self.casting_call().await
    }

    async fn shutdown(&self) {
        self.shutdown_called.store(true, Ordering::SeqCst);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Notifications
// ─────────────────────────────────────────────────────────────────────────────

/// Emitter that keeps every event in arrival order.
#[derive(Default)]
pub struct RecordingEmitter {
    pub events: Mutex<Vec<NotificationEvent>>,
}

impl RecordingEmitter {
    pub fn snapshot(&self) -> Vec<NotificationEvent> {
        self.events.lock().clone()
    }
}

impl NotificationEmitter for RecordingEmitter {
    fn emit(&self, event: NotificationEvent) {
        self.events.lock().push(event);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Transport
// ─────────────────────────────────────────────────────────────────────────────

/// How a delivery was settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    Ack,
    Reject { requeue: bool },
}

/// Shared log of (delivery id, settlement) pairs.
pub type SettlementLog = Arc<Mutex<Vec<(usize, Settlement)>>>;

/// In-memory delivery that records its settlement.
pub struct MockDelivery {
    pub id: usize,
    pub envelope: MessageEnvelope,
    pub log: SettlementLog,
    pub fail_settle: bool,
}

impl MockDelivery {
    pub fn new(id: usize, type_tag: &str, body: &str, log: &SettlementLog) -> Self {
        Self {
            id,
            envelope: MessageEnvelope::new(
                type_tag,
                "chromecast-key",
                Bytes::copy_from_slice(body.as_bytes()),
            ),
            log: Arc::clone(log),
            fail_settle: false,
        }
    }

    fn settle(&self, settlement: Settlement) -> TransportResult<()> {
        if self.fail_settle {
            return Err(TransportError::Acknowledge("channel closed".to_string()));
        }
        self.log.lock().push((self.id, settlement));
        Ok(())
    }
}

#[async_trait]
impl Delivery for MockDelivery {
    fn envelope(&self) -> &MessageEnvelope {
        &self.envelope
    }

    async fn ack(self: Box<Self>) -> TransportResult<()> {
        self.settle(Settlement::Ack)
    }

    async fn reject(self: Box<Self>, requeue: bool) -> TransportResult<()> {
        self.settle(Settlement::Reject { requeue })
    }
}

/// Inbound stream replaying a fixed script.
///
/// Once the script is exhausted the stream either reports closure or stays
/// pending forever, as a live broker connection would.
pub struct ScriptedInbound {
    items: VecDeque<TransportResult<Box<dyn Delivery>>>,
    pend_when_empty: bool,
}

impl ScriptedInbound {
    /// Stream that closes after the scripted deliveries.
    pub fn closing(deliveries: Vec<MockDelivery>) -> Self {
        Self::build(deliveries, false)
    }

    /// Stream that idles after the scripted deliveries.
    pub fn idling(deliveries: Vec<MockDelivery>) -> Self {
        Self::build(deliveries, true)
    }

    /// Appends a stream error after the scripted deliveries.
    pub fn then_error(mut self, error: TransportError) -> Self {
        self.items.push_back(Err(error));
        self
    }

    fn build(deliveries: Vec<MockDelivery>, pend_when_empty: bool) -> Self {
        let items = deliveries
            .into_iter()
            .map(|d| Ok(Box::new(d) as Box<dyn Delivery>))
            .collect();
        Self {
            items,
            pend_when_empty,
        }
    }
}

#[async_trait]
impl InboundStream for ScriptedInbound {
    async fn next(&mut self) -> Option<TransportResult<Box<dyn Delivery>>> {
        match self.items.pop_front() {
            Some(item) => Some(item),
            None if self.pend_when_empty => std::future::pending().await,
            None => None,
        }
    }
}

/// Publisher that records messages and can fail a number of times first.
#[derive(Default)]
pub struct MockPublisher {
    pub published: Mutex<Vec<OutboundMessage>>,
    pub failures_remaining: AtomicUsize,
    pub attempts: AtomicUsize,
}

impl MockPublisher {
    pub fn failing_times(failures: usize) -> Self {
        let publisher = Self::default();
        publisher.failures_remaining.store(failures, Ordering::SeqCst);
        publisher
    }

    pub fn snapshot(&self) -> Vec<OutboundMessage> {
        self.published.lock().clone()
    }
}

#[async_trait]
impl Publisher for MockPublisher {
    async fn publish(&self, message: &OutboundMessage) -> TransportResult<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let failed = self
            .failures_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            return Err(TransportError::Publish("broker unavailable".to_string()));
        }
        self.published.lock().push(message.clone());
        Ok(())
    }
}

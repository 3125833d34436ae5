//! Core configuration types.
//!
//! [`Config`] holds everything the orchestration layer needs at bootstrap:
//! broker topology names, pool sizing, redelivery policy and timeouts. The
//! binary builds it from its own file/env/CLI layers.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cast::RendererKind;
use crate::protocol_constants::DEFAULT_ROUTING_KEY;

/// Configuration for the Caster core services.
///
/// All fields have sensible defaults.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct Config {
    // Broker topology
    /// Exchange the command queue is bound to and notifications are published on.
    pub exchange_name: String,

    /// Queue the consumer pool reads commands from.
    pub queue_name: String,

    /// Whether the queue survives broker restarts.
    pub durable: bool,

    /// Routing key for both inbound commands and outbound notifications.
    pub routing_key: String,

    // Consumption
    /// Number of concurrent consumer workers (K).
    pub consumer_count: usize,

    /// Delivery attempts after which a rejected command is no longer requeued.
    pub max_deliveries: u32,

    /// Deadline for a single start/stop call against the casting backend (seconds).
    pub execute_timeout_secs: u64,

    // Discovery
    /// Renderer kind that commands may target; other kinds are ignored.
    pub target_kind: RendererKind,

    /// Capacity of the queue between the discovery bridge and the notifier.
    pub notification_queue_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            exchange_name: "amq.topic".to_string(),
            queue_name: "caster".to_string(),
            durable: true,
            routing_key: DEFAULT_ROUTING_KEY.to_string(),
            consumer_count: 5,
            max_deliveries: 5,
            execute_timeout_secs: 30,
            target_kind: RendererKind::Chromecast,
            notification_queue_capacity: 64,
        }
    }
}

impl Config {
    /// Validates the configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.exchange_name.trim().is_empty() {
            return Err("exchange_name must not be empty".to_string());
        }
        if self.queue_name.trim().is_empty() {
            return Err("queue_name must not be empty".to_string());
        }
        if self.routing_key.trim().is_empty() {
            return Err("routing_key must not be empty".to_string());
        }
        if self.consumer_count == 0 {
            return Err("consumer_count must be >= 1".to_string());
        }
        if self.max_deliveries == 0 {
            return Err("max_deliveries must be >= 1".to_string());
        }
        if self.execute_timeout_secs == 0 {
            return Err("execute_timeout_secs must be >= 1".to_string());
        }
        if self.notification_queue_capacity == 0 {
            return Err(
                "notification_queue_capacity must be >= 1 (mpsc::channel panics on 0)".to_string(),
            );
        }
        Ok(())
    }

    /// Deadline applied to each casting backend call.
    #[must_use]
    pub fn execute_timeout(&self) -> Duration {
        Duration::from_secs(self.execute_timeout_secs)
    }
}

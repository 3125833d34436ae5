//! Fixed protocol constants that should NOT be changed.
//!
//! These values are shared with the services on the other side of the broker
//! (the producers of play/stop commands and the consumers of renderer
//! notifications). Changing them breaks interoperability.

// ─────────────────────────────────────────────────────────────────────────────
// Message type tags (AMQP `type` property)
// ─────────────────────────────────────────────────────────────────────────────

/// Inbound command: start streaming a URI to a named renderer.
pub const PLAY_TYPE_TAG: &str = "StreamToChromecastEvent";

/// Inbound command: stop whatever is playing on a named renderer.
pub const STOP_TYPE_TAG: &str = "StopPlayingStreamEvent";

/// Outbound notification: a renderer became available.
pub const FOUND_TYPE_TAG: &str = "ChromecastFoundEvent";

/// Outbound notification: a renderer disappeared.
pub const LOST_TYPE_TAG: &str = "ChromecastLostEvent";

// ─────────────────────────────────────────────────────────────────────────────
// Publishing
// ─────────────────────────────────────────────────────────────────────────────

/// Content type of every outbound notification body.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// AMQP delivery mode for persistent messages.
pub const PERSISTENT_DELIVERY_MODE: u8 = 2;

/// AMQP delivery mode for transient messages.
pub const TRANSIENT_DELIVERY_MODE: u8 = 1;

/// Routing key used for both directions when none is configured.
pub const DEFAULT_ROUTING_KEY: &str = "chromecast-key";

// ─────────────────────────────────────────────────────────────────────────────
// Consumption
// ─────────────────────────────────────────────────────────────────────────────

/// Unacknowledged messages the broker may push per consumer worker.
///
/// The pool asks for `consumer_count * PREFETCH_PER_CONSUMER` in-flight
/// deliveries so the broker can run ahead of the workers without unbounded
/// buffering.
pub const PREFETCH_PER_CONSUMER: usize = 4;

/// Header RabbitMQ quorum queues use to count prior delivery attempts.
pub const DELIVERY_COUNT_HEADER: &str = "x-delivery-count";

/// Header carried by messages this service put back on the queue itself.
///
/// Classic queues never set `x-delivery-count`, so a rejected message is
/// republished with the number of deliveries it has already had.
pub const REQUEUE_COUNT_HEADER: &str = "x-caster-deliveries";

// ─────────────────────────────────────────────────────────────────────────────
// Internal channels
// ─────────────────────────────────────────────────────────────────────────────

/// Capacity of the ordered discovery event channel (backend → bridge).
pub const DISCOVERY_CHANNEL_CAPACITY: usize = 64;

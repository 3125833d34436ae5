//! Caster Core - orchestration library for the Caster service.
//!
//! Caster consumes play/stop commands from a message broker and executes them
//! against cast renderers discovered on the local network. Renderer
//! availability changes are announced back onto the broker.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`services`]: Renderer registry, discovery bridge, command dispatcher,
//!   consumer pool and outbound notifier
//! - [`cast`]: Casting backend trait plus the mDNS/VLC implementation
//! - [`transport`]: Broker traits plus the AMQP implementation
//! - [`messages`]: Wire payloads and command decoding
//! - [`events`]: Found/Lost notifications and their emitters
//! - [`bootstrap`]: Composition root and graceful shutdown
//! - [`runtime`]: Task spawning with shutdown draining
//! - [`state`]: Core configuration
//! - [`error`]: Centralized error types
//!
//! # Abstraction Traits
//!
//! The orchestration layer depends only on traits, so every service can be
//! exercised with in-memory doubles:
//!
//! - [`CastingBackend`](cast::CastingBackend): Discovery and casting
//! - [`InboundStream`](transport::InboundStream) /
//!   [`Delivery`](transport::Delivery): Consuming and settling commands
//! - [`Publisher`](transport::Publisher): Publishing notifications
//! - [`NotificationEmitter`](events::NotificationEmitter): Emitting Found/Lost
//! - [`TaskSpawner`](runtime::TaskSpawner): Spawning background tasks

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod bootstrap;
pub mod cast;
pub mod error;
pub mod events;
pub mod messages;
pub mod protocol_constants;
pub mod runtime;
pub mod services;
pub mod state;
pub mod transport;

#[cfg(test)]
mod test_fixtures;

// Re-export commonly used types at the crate root
pub use error::{CasterError, CasterResult, ErrorCode};
pub use events::{NotificationEmitter, NotificationEvent, QueueEventBridge};
pub use runtime::{TaskSpawner, TokioSpawner};
pub use state::Config;

// Re-export casting types
pub use cast::{
    CastError, CastingBackend, DiscoveryError, DiscoveryEvent, MdnsCastBackend, PlayerConfig,
    RendererHandle, RendererKind,
};

// Re-export message types
pub use messages::{decode_command, CommandEvent, Decoded};

// Re-export service types
pub use services::{
    CommandDispatcher, ConsumerPool, DiscoveryBridge, OutboundNotifier, Outcome, Renderer,
    RendererRegistry,
};

// Re-export transport types
pub use transport::{
    AmqpSettings, AmqpTransport, MessageEnvelope, Publisher, TransportError, TransportResult,
};

// Re-export bootstrap types
pub use bootstrap::{bootstrap_services, BootstrappedServices};

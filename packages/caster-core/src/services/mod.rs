//! Application services layer.
//!
//! This module contains the orchestration services that sit between the
//! broker transport and the casting backend (cast/).

pub mod command_dispatcher;
pub mod consumer_pool;
pub mod discovery_bridge;
pub mod notifier;
pub mod renderer_registry;

pub use command_dispatcher::{CommandDispatcher, DispatchError, DispatchReport, Outcome};
pub use consumer_pool::ConsumerPool;
pub use discovery_bridge::DiscoveryBridge;
pub use notifier::OutboundNotifier;
pub use renderer_registry::{Displaced, Renderer, RendererRegistry};

//! Renderer discovery and casting backend.
//!
//! This module contains:
//! - [`CastingBackend`]: the trait the orchestration layer drives
//! - [`RendererHandle`] / [`RendererKind`] / [`DiscoveryEvent`]: backend-neutral
//!   renderer descriptions
//! - [`MdnsCastBackend`]: the production backend, discovering renderers over
//!   mDNS and casting through an external VLC process

mod backend;
pub mod mdns;
pub mod player;
mod traits;
mod types;

pub use backend::MdnsCastBackend;
pub use player::{PlayerConfig, VlcPlayer};
pub use traits::CastingBackend;
pub use types::{
    CastError, CastResult, DiscoveryError, DiscoveryEvent, RendererHandle, RendererKind,
};

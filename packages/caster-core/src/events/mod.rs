//! Renderer availability notifications.
//!
//! This module provides:
//! - [`NotificationEvent`], the Found/Lost announcement produced on every
//!   registry mutation
//! - [`NotificationEmitter`] trait so the discovery bridge does not know how
//!   notifications leave the process
//! - [`QueueEventBridge`], the bounded-queue emitter feeding the outbound
//!   notifier

mod bridge;
mod emitter;

pub use bridge::QueueEventBridge;
pub use emitter::{LoggingNotificationEmitter, NotificationEmitter};

use serde::Serialize;

use crate::messages::ChromecastEvent;
use crate::protocol_constants::{FOUND_TYPE_TAG, LOST_TYPE_TAG};

/// An announcement that a renderer appeared or disappeared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum NotificationEvent {
    /// A renderer of the target kind became available.
    Found {
        /// Renderer name as stored in the registry.
        name: String,
    },
    /// A renderer of the target kind went away.
    Lost {
        /// Renderer name as stored in the registry.
        name: String,
    },
}

impl NotificationEvent {
    /// Renderer name carried by the event.
    pub fn name(&self) -> &str {
        match self {
            Self::Found { name } | Self::Lost { name } => name,
        }
    }

    /// Wire type tag distinguishing Found from Lost.
    pub fn type_tag(&self) -> &'static str {
        match self {
            Self::Found { .. } => FOUND_TYPE_TAG,
            Self::Lost { .. } => LOST_TYPE_TAG,
        }
    }

    /// Wire body for the event.
    pub fn to_body(&self) -> ChromecastEvent {
        ChromecastEvent {
            chromecast: self.name().to_string(),
        }
    }
}

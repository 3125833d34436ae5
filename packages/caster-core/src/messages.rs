//! Wire payloads exchanged over the broker and their typed forms.
//!
//! Inbound bodies are decoded into a [`CommandEvent`] based on the message's
//! type tag. Unknown tags are not an error: they decode to
//! [`Decoded::Ignored`] and the message is acknowledged.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::protocol_constants::{PLAY_TYPE_TAG, STOP_TYPE_TAG};

/// Body of a `StreamToChromecastEvent` command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamToChromecastEvent {
    /// Friendly name of the renderer to cast to.
    pub chrome_cast_to_stream: String,
    /// Media URI the renderer should play.
    pub stream: String,
    /// When the producer requested playback.
    pub stream_date: DateTime<Utc>,
}

/// Body of a `StopPlayingStreamEvent` command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopPlayingStreamEvent {
    /// Friendly name of the renderer to stop.
    pub chrome_cast_to_stop: String,
    /// When the producer requested the stop.
    pub stop_date_time: DateTime<Utc>,
}

/// Body of both outbound notifications (`ChromecastFoundEvent` and
/// `ChromecastLostEvent`); the type tag tells them apart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChromecastEvent {
    /// Friendly name of the renderer.
    pub chromecast: String,
}

/// A decoded instruction to start or stop streaming to a named renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandEvent {
    /// Start casting `media_locator` to `target`.
    Play {
        target: String,
        media_locator: String,
        requested_at: DateTime<Utc>,
    },
    /// Stop casting to `target`.
    Stop {
        target: String,
        requested_at: DateTime<Utc>,
    },
}

impl CommandEvent {
    /// Renderer name the command is addressed to.
    pub fn target(&self) -> &str {
        match self {
            Self::Play { target, .. } | Self::Stop { target, .. } => target,
        }
    }

    /// Short label for logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Play { .. } => "play",
            Self::Stop { .. } => "stop",
        }
    }
}

impl From<StreamToChromecastEvent> for CommandEvent {
    fn from(body: StreamToChromecastEvent) -> Self {
        Self::Play {
            target: body.chrome_cast_to_stream,
            media_locator: body.stream,
            requested_at: body.stream_date,
        }
    }
}

impl From<StopPlayingStreamEvent> for CommandEvent {
    fn from(body: StopPlayingStreamEvent) -> Self {
        Self::Stop {
            target: body.chrome_cast_to_stop,
            requested_at: body.stop_date_time,
        }
    }
}

/// Result of classifying an inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    /// Known type tag with a well-formed body.
    Command(CommandEvent),
    /// Type tag outside the known set.
    Ignored,
}

/// A recognized type tag carried a body that does not match its schema.
#[derive(Debug, Error)]
#[error("malformed {type_tag} body: {source}")]
pub struct DecodeError {
    /// The recognized type tag.
    pub type_tag: &'static str,
    #[source]
    pub source: serde_json::Error,
}

/// Classifies `type_tag` and decodes `body` into a [`CommandEvent`].
pub fn decode_command(type_tag: &str, body: &[u8]) -> Result<Decoded, DecodeError> {
    match type_tag {
        PLAY_TYPE_TAG => serde_json::from_slice::<StreamToChromecastEvent>(body)
            .map(|event| Decoded::Command(event.into()))
            .map_err(|source| DecodeError {
                type_tag: PLAY_TYPE_TAG,
                source,
            }),
        STOP_TYPE_TAG => serde_json::from_slice::<StopPlayingStreamEvent>(body)
            .map(|event| Decoded::Command(event.into()))
            .map_err(|source| DecodeError {
                type_tag: STOP_TYPE_TAG,
                source,
            }),
        _ => Ok(Decoded::Ignored),
    }
}

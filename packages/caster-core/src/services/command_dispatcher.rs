//! Decodes inbound messages and executes them against the casting backend.
//!
//! Each message moves through `Received → Decoded → Resolved → Executed` and
//! ends in an [`Outcome`] that the consumer pool turns into an ack or a
//! reject. Failures are returned as values; nothing here panics or aborts
//! the worker.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::cast::{CastError, CastResult, CastingBackend};
use crate::messages::{decode_command, CommandEvent, DecodeError, Decoded};
use crate::transport::MessageEnvelope;

use super::renderer_registry::RendererRegistry;

/// Terminal state of one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Message handled (or deliberately ignored).
    Ack,
    /// Message could not be handled.
    Reject,
}

/// Why a message was rejected.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Recognized type tag with a malformed body.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// No renderer with this name is currently registered.
    #[error("renderer {0} is not available")]
    TargetNotFound(String),

    /// The backend call failed or timed out.
    #[error("casting to {target} failed: {source}")]
    Casting {
        target: String,
        #[source]
        source: CastError,
    },
}

/// Outcome of a dispatch plus the failure that caused a reject.
#[derive(Debug)]
pub struct DispatchReport {
    pub outcome: Outcome,
    pub error: Option<DispatchError>,
}

impl DispatchReport {
    fn ack() -> Self {
        Self {
            outcome: Outcome::Ack,
            error: None,
        }
    }

    fn reject(error: DispatchError) -> Self {
        Self {
            outcome: Outcome::Reject,
            error: Some(error),
        }
    }
}

/// Routes decoded commands to the renderer named in them.
pub struct CommandDispatcher {
    registry: Arc<RendererRegistry>,
    backend: Arc<dyn CastingBackend>,
    execute_timeout: Duration,
}

impl CommandDispatcher {
    pub fn new(
        registry: Arc<RendererRegistry>,
        backend: Arc<dyn CastingBackend>,
        execute_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            backend,
            execute_timeout,
        }
    }

    /// Handles one inbound message.
    pub async fn dispatch(&self, envelope: &MessageEnvelope) -> DispatchReport {
        let command = match decode_command(&envelope.type_tag, &envelope.body) {
            Ok(Decoded::Command(command)) => command,
            Ok(Decoded::Ignored) => {
                log::debug!(
                    "[Dispatcher] Ignoring message with type tag {:?}",
                    envelope.type_tag
                );
                return DispatchReport::ack();
            }
            Err(e) => return DispatchReport::reject(e.into()),
        };

        match self.execute(&command).await {
            Ok(()) => DispatchReport::ack(),
            Err(e) => DispatchReport::reject(e),
        }
    }

    /// Resolves the command's target and invokes the backend.
    pub async fn execute(&self, command: &CommandEvent) -> Result<(), DispatchError> {
        let target = command.target();
        let renderer = self
            .registry
            .lookup(target)
            .ok_or_else(|| DispatchError::TargetNotFound(target.to_string()))?;

        log::info!(
            "[Dispatcher] Executing {} on {} ({})",
            command.label(),
            renderer.name,
            renderer.handle.id()
        );

        let result = match command {
            CommandEvent::Play { media_locator, .. } => {
                self.bounded(self.backend.start_casting(media_locator, &renderer.handle))
                    .await
            }
            CommandEvent::Stop { .. } => {
                self.bounded(self.backend.stop_casting(&renderer.handle))
                    .await
            }
        };

        result.map_err(|source| DispatchError::Casting {
            target: target.to_string(),
            source,
        })
    }

    async fn bounded<F>(&self, call: F) -> CastResult<()>
    where
        F: std::future::Future<Output = CastResult<()>>,
    {
        tokio::time::timeout(self.execute_timeout, call)
            .await
            .map_err(|_| CastError::Timeout(self.execute_timeout))?
    }
}

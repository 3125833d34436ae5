//! Casting through an external VLC process.
//!
//! VLC's Chromecast stream output does the Cast protocol work (session
//! setup, transcoding when needed, media control). Each renderer gets at
//! most one player process; starting a new cast on the same renderer
//! replaces the previous one.

use std::collections::HashMap;
use std::process::Stdio;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::process::{Child, Command};

use super::types::{CastError, CastResult, RendererHandle, RendererKind};

/// Configuration for the player process.
#[derive(Debug, Clone)]
pub struct PlayerConfig {
    /// Executable to launch (`cvlc` runs VLC without an interface).
    pub command: String,
    /// How long to watch a freshly launched player for an early exit.
    pub startup_grace: Duration,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            command: "cvlc".to_string(),
            startup_grace: Duration::from_millis(500),
        }
    }
}

/// Builds the VLC command line that streams `locator` to `renderer`.
pub fn player_args(locator: &str, renderer: &RendererHandle) -> CastResult<Vec<String>> {
    if renderer.kind() != RendererKind::Chromecast {
        return Err(CastError::UnsupportedKind(renderer.kind()));
    }
    let address = renderer
        .address()
        .ok_or_else(|| CastError::NoAddress(renderer.id().to_string()))?;

    Ok(vec![
        "--sout=#chromecast".to_string(),
        format!("--sout-chromecast-ip={}", address.ip()),
        format!("--sout-chromecast-port={}", address.port()),
        "--demux-filter=demux_chromecast".to_string(),
        "--play-and-exit".to_string(),
        locator.to_string(),
    ])
}

/// Runs one player process per renderer.
pub struct VlcPlayer {
    config: PlayerConfig,
    /// Renderer id -> running player process
    sessions: Mutex<HashMap<String, Child>>,
}

impl VlcPlayer {
    /// Creates a player with no running sessions.
    pub fn new(config: PlayerConfig) -> Self {
        Self {
            config,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Number of renderers with a player process attached.
    pub fn active_sessions(&self) -> usize {
        self.sessions.lock().len()
    }

    /// Launches a player streaming `locator` to `renderer`.
    pub async fn start(&self, locator: &str, renderer: &RendererHandle) -> CastResult<()> {
        let args = player_args(locator, renderer)?;

        // Replace whatever is already playing on this renderer
        self.stop(renderer).await?;

        log::info!(
            "[Player] Casting {} to {} via {}",
            locator,
            renderer.id(),
            self.config.command
        );

        let mut child = Command::new(&self.config.command)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(CastError::Spawn)?;

        if !self.config.startup_grace.is_zero() {
            tokio::time::sleep(self.config.startup_grace).await;
            if let Some(status) = child.try_wait().map_err(CastError::Spawn)? {
                if !status.success() {
                    return Err(CastError::PlayerExited(status.to_string()));
                }
                log::debug!(
                    "[Player] Player for {} finished during startup",
                    renderer.id()
                );
                return Ok(());
            }
        }

        self.sessions.lock().insert(renderer.id().to_string(), child);
        Ok(())
    }

    /// Stops the player attached to `renderer`, if any.
    pub async fn stop(&self, renderer: &RendererHandle) -> CastResult<()> {
        let child = self.sessions.lock().remove(renderer.id());
        match child {
            Some(child) => Self::terminate(renderer.id(), child).await,
            None => {
                log::debug!("[Player] No active player for {}", renderer.id());
                Ok(())
            }
        }
    }

    /// Stops every running player.
    pub async fn stop_all(&self) -> usize {
        let sessions: Vec<(String, Child)> = self.sessions.lock().drain().collect();
        let count = sessions.len();
        for (id, child) in sessions {
            if let Err(e) = Self::terminate(&id, child).await {
                log::warn!("[Player] Failed to stop player for {}: {}", id, e);
            }
        }
        count
    }

    async fn terminate(id: &str, mut child: Child) -> CastResult<()> {
        if let Ok(Some(status)) = child.try_wait() {
            log::debug!("[Player] Player for {} already exited ({})", id, status);
            return Ok(());
        }
        child.kill().await.map_err(CastError::Stop)?;
        log::info!("[Player] Stopped player for {}", id);
        Ok(())
    }
}

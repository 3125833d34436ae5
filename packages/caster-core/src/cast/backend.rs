//! Production casting backend: mDNS discovery plus a VLC player.

use std::sync::Arc;

use async_trait::async_trait;
use mdns_sd::ServiceDaemon;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::mdns::{create_daemon, translate, RendererTable, BROWSED_SERVICE_TYPES};
use super::player::{PlayerConfig, VlcPlayer};
use super::traits::CastingBackend;
use super::types::{CastResult, DiscoveryError, DiscoveryEvent, RendererHandle, RendererKind};
use crate::runtime::{TaskSpawner, TokioSpawner};

/// Casting backend backed by a shared mDNS daemon and an external player.
///
/// A discovery session browses every type in [`BROWSED_SERVICE_TYPES`] and
/// forwards translated events from one task per service type. Events for a
/// single service type keep the daemon's order.
pub struct MdnsCastBackend {
    daemon: ServiceDaemon,
    table: Arc<RendererTable>,
    player: VlcPlayer,
    spawner: TokioSpawner,
    /// Cancels the forwarding tasks of the running discovery session.
    session: Mutex<Option<CancellationToken>>,
}

impl MdnsCastBackend {
    /// Creates the backend and starts the mDNS daemon thread.
    pub fn new(player_config: PlayerConfig, spawner: TokioSpawner) -> CastResult<Self> {
        let daemon = create_daemon()?;
        Ok(Self {
            daemon,
            table: Arc::new(RendererTable::default()),
            player: VlcPlayer::new(player_config),
            spawner,
            session: Mutex::new(None),
        })
    }

    fn spawn_forwarder(
        &self,
        service_type: &'static str,
        kind: RendererKind,
        events: mpsc::Sender<DiscoveryEvent>,
        cancel: CancellationToken,
    ) -> CastResult<()> {
        let receiver = self
            .daemon
            .browse(service_type)
            .map_err(|e| DiscoveryError::MdnsDaemon(e.to_string()))?;
        let table = Arc::clone(&self.table);

        log::info!("[mDNS] Browsing for {}", service_type);

        self.spawner.spawn(async move {
            loop {
                let event = tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    received = receiver.recv_async() => match received {
                        Ok(event) => event,
                        Err(_) => {
                            log::debug!("[mDNS] Browse channel closed for {}", service_type);
                            break;
                        }
                    },
                };

                let Some(event) = translate(&table, service_type, kind, event) else {
                    continue;
                };
                if events.send(event).await.is_err() {
                    log::debug!("[mDNS] Discovery receiver dropped, stopping {}", service_type);
                    break;
                }
            }
        });
        Ok(())
    }
}

#[async_trait]
impl CastingBackend for MdnsCastBackend {
    fn start_discovery(&self, events: mpsc::Sender<DiscoveryEvent>) -> CastResult<()> {
        let mut session = self.session.lock();
        if session.is_some() {
            return Err(DiscoveryError::AlreadyRunning.into());
        }

        let cancel = CancellationToken::new();
        for (service_type, kind) in BROWSED_SERVICE_TYPES {
            if let Err(e) = self.spawn_forwarder(service_type, kind, events.clone(), cancel.clone())
            {
                cancel.cancel();
                return Err(e);
            }
        }

        *session = Some(cancel);
        Ok(())
    }

    fn stop_discovery(&self) -> CastResult<()> {
        let Some(cancel) = self.session.lock().take() else {
            return Ok(());
        };
        cancel.cancel();

        for (service_type, _) in BROWSED_SERVICE_TYPES {
            if let Err(e) = self.daemon.stop_browse(service_type) {
                log::warn!("[mDNS] Failed to stop browse for {}: {:?}", service_type, e);
            }
        }
        log::info!("[mDNS] Discovery stopped");
        Ok(())
    }

    async fn start_casting(&self, locator: &str, renderer: &RendererHandle) -> CastResult<()> {
        self.player.start(locator, renderer).await
    }

    async fn stop_casting(&self, renderer: &RendererHandle) -> CastResult<()> {
        self.player.stop(renderer).await
    }

    async fn shutdown(&self) {
        if let Err(e) = self.stop_discovery() {
            log::warn!("[mDNS] Failed to stop discovery: {}", e);
        }

        let stopped = self.player.stop_all().await;
        if stopped > 0 {
            log::info!("[Player] Stopped {} player(s) on shutdown", stopped);
        }

        if let Err(e) = self.daemon.shutdown() {
            log::warn!("[mDNS] Failed to shut down daemon: {:?}", e);
        }
    }
}

//! Application bootstrap and dependency wiring.
//!
//! This module contains the composition root - the single place where all
//! services are instantiated and wired together. The binary supplies the
//! two external collaborators (casting backend and publisher) so tests can
//! bootstrap the same graph with in-memory doubles.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::cast::{CastError, CastingBackend};
use crate::error::{CasterError, CasterResult, ErrorCode};
use crate::events::{
    LoggingNotificationEmitter, NotificationEmitter, NotificationEvent, QueueEventBridge,
};
use crate::runtime::{TaskSpawner, TokioSpawner};
use crate::services::{
    CommandDispatcher, ConsumerPool, DiscoveryBridge, OutboundNotifier, RendererRegistry,
};
use crate::state::Config;
use crate::transport::{InboundStream, Publisher, TransportResult};

/// Container for all bootstrapped services.
pub struct BootstrappedServices {
    /// Currently available renderers.
    pub registry: Arc<RendererRegistry>,
    /// Discovery and casting backend.
    pub backend: Arc<dyn CastingBackend>,
    /// Keeps the registry in sync with discovery.
    pub discovery_bridge: Arc<DiscoveryBridge>,
    /// Executes inbound commands.
    pub dispatcher: Arc<CommandDispatcher>,
    /// Workers draining the inbound stream.
    pub consumer_pool: Arc<ConsumerPool>,
    /// Publishes Found/Lost notifications.
    pub notifier: Arc<OutboundNotifier>,
    /// Queue between the discovery bridge and the notifier.
    pub event_bridge: Arc<QueueEventBridge>,
    /// Receiving end of the notification queue, taken on start.
    notification_rx: Mutex<Option<mpsc::Receiver<NotificationEvent>>>,
    /// Task spawner for background operations.
    pub spawner: TokioSpawner,
    /// Cancellation token for graceful shutdown.
    pub cancel_token: CancellationToken,
    /// Background failure that cancelled the services, if any.
    failure: Arc<Mutex<Option<CasterError>>>,
}

impl BootstrappedServices {
    /// Starts discovery and the notifier in the background.
    ///
    /// If the backend ends discovery on its own, every service is cancelled
    /// and the error is kept for [`take_failure`](Self::take_failure).
    ///
    /// # Errors
    ///
    /// Fails if the services were already started or the backend refuses to
    /// start a discovery session.
    pub fn start_background_tasks(&self) -> CasterResult<()> {
        let notifications = self
            .notification_rx
            .lock()
            .take()
            .ok_or_else(|| CasterError::Internal("services already started".to_string()))?;

        let discovery_events = self.discovery_bridge.start()?;

        let bridge = Arc::clone(&self.discovery_bridge);
        let cancel = self.cancel_token.clone();
        let failure = Arc::clone(&self.failure);
        self.spawner.spawn(async move {
            if let Err(e) = bridge.run(discovery_events, cancel.clone()).await {
                log::error!(
                    "[Bootstrap] Discovery stopped ({}), shutting down: {}",
                    e.code(),
                    e
                );
                failure
                    .lock()
                    .get_or_insert(CasterError::Backend(CastError::Discovery(e)));
                cancel.cancel();
            }
        });

        let notifier = Arc::clone(&self.notifier);
        let cancel = self.cancel_token.clone();
        self.spawner.spawn(async move {
            notifier.run(notifications, cancel).await;
        });

        log::info!("[Bootstrap] Background tasks started");
        Ok(())
    }

    /// Runs the consumer pool over `inbound` on its own task.
    ///
    /// The handle resolves once the pool stops: `Ok(())` after cancellation,
    /// or the transport error that ended consumption.
    pub fn spawn_consumers(
        &self,
        inbound: Box<dyn InboundStream>,
    ) -> JoinHandle<TransportResult<()>> {
        let pool = Arc::clone(&self.consumer_pool);
        let cancel = self.cancel_token.clone();
        tokio::spawn(async move { pool.run(inbound, cancel).await })
    }

    /// Takes the background failure that cancelled the services, if any.
    pub fn take_failure(&self) -> Option<CasterError> {
        self.failure.lock().take()
    }

    /// Signals every service to stop.
    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    /// Initiates graceful shutdown of all services.
    ///
    /// Waits for the discovery bridge and the notifier to finish (the
    /// notifier publishes what is still queued), then releases the backend.
    /// The transport must stay open until this returns.
    pub async fn shutdown(&self) {
        log::info!("[Bootstrap] Beginning graceful shutdown...");

        self.cancel_token.cancel();
        self.spawner.drain().await;

        self.backend.shutdown().await;

        log::info!(
            "[Bootstrap] Shutdown complete ({} renderer(s) known at exit)",
            self.registry.len()
        );
    }
}

/// Bootstraps all application services with their dependencies.
///
/// Services are created in dependency order:
///
/// 1. Shared infrastructure (cancellation token, notification queue)
/// 2. Renderer registry
/// 3. Discovery bridge (depends on backend, registry, notification queue)
/// 4. Command dispatcher and consumer pool (depend on registry, backend)
/// 5. Outbound notifier (depends on publisher)
///
/// # Errors
///
/// Returns [`CasterError::Configuration`] if `config` does not validate.
pub fn bootstrap_services(
    config: &Config,
    backend: Arc<dyn CastingBackend>,
    publisher: Arc<dyn Publisher>,
    spawner: TokioSpawner,
) -> CasterResult<BootstrappedServices> {
    config.validate().map_err(CasterError::Configuration)?;

    let cancel_token = CancellationToken::new();

    let (event_bridge, notification_rx) =
        QueueEventBridge::new(config.notification_queue_capacity);
    let event_bridge = Arc::new(event_bridge);
    if log::log_enabled!(log::Level::Debug) {
        event_bridge.set_external_emitter(Arc::new(LoggingNotificationEmitter));
    }

    let registry = Arc::new(RendererRegistry::new());

    let discovery_bridge = Arc::new(DiscoveryBridge::new(
        Arc::clone(&backend),
        Arc::clone(&registry),
        Arc::clone(&event_bridge) as Arc<dyn NotificationEmitter>,
        config.target_kind,
    ));

    let dispatcher = Arc::new(CommandDispatcher::new(
        Arc::clone(&registry),
        Arc::clone(&backend),
        config.execute_timeout(),
    ));

    let consumer_pool = Arc::new(ConsumerPool::new(
        Arc::clone(&dispatcher),
        config.consumer_count,
        config.max_deliveries,
    ));

    let notifier = Arc::new(OutboundNotifier::new(publisher, config.routing_key.clone()));

    log::info!(
        "[Bootstrap] Services wired ({} consumer(s), target kind: {})",
        config.consumer_count,
        config.target_kind
    );

    Ok(BootstrappedServices {
        registry,
        backend,
        discovery_bridge,
        dispatcher,
        consumer_pool,
        notifier,
        event_bridge,
        notification_rx: Mutex::new(Some(notification_rx)),
        spawner,
        cancel_token,
        failure: Arc::new(Mutex::new(None)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cast::{DiscoveryError, DiscoveryEvent, RendererHandle, RendererKind};
    use crate::protocol_constants::{FOUND_TYPE_TAG, PLAY_TYPE_TAG};
    use crate::test_fixtures::{
        MockBackend, MockDelivery, MockPublisher, ScriptedInbound, Settlement, SettlementLog,
    };
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    fn services(
        backend: &Arc<MockBackend>,
        publisher: &Arc<MockPublisher>,
    ) -> BootstrappedServices {
        bootstrap_services(
            &Config::default(),
            Arc::clone(backend) as Arc<dyn CastingBackend>,
            Arc::clone(publisher) as Arc<dyn Publisher>,
            TokioSpawner::current(),
        )
        .unwrap()
    }

    async fn eventually(mut condition: impl FnMut() -> bool) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while !condition() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn invalid_config_is_rejected() {
        let config = Config {
            consumer_count: 0,
            ..Default::default()
        };

        let result = bootstrap_services(
            &config,
            Arc::new(MockBackend::default()),
            Arc::new(MockPublisher::default()),
            TokioSpawner::current(),
        );

        assert!(matches!(result, Err(CasterError::Configuration(_))));
    }

    #[tokio::test]
    async fn services_start_only_once() {
        let backend = Arc::new(MockBackend::default());
        let publisher = Arc::new(MockPublisher::default());
        let services = services(&backend, &publisher);

        services.start_background_tasks().unwrap();
        let second = services.start_background_tasks();

        assert!(matches!(second, Err(CasterError::Internal(_))));
        services.shutdown().await;
    }

    #[tokio::test]
    async fn discovered_renderer_is_announced_and_castable() {
        let backend = Arc::new(MockBackend::default());
        let publisher = Arc::new(MockPublisher::default());
        let services = services(&backend, &publisher);
        services.start_background_tasks().unwrap();

        backend
            .discovery_sender()
            .unwrap()
            .send(DiscoveryEvent::Added(Arc::new(
                RendererHandle::new("cc-1", RendererKind::Chromecast).with_friendly_name("Den"),
            )))
            .await
            .unwrap();
        eventually(|| publisher.snapshot().len() == 1).await;
        assert_eq!(publisher.snapshot()[0].type_tag, FOUND_TYPE_TAG);

        let log = SettlementLog::default();
        let play = MockDelivery::new(
            0,
            PLAY_TYPE_TAG,
            r#"{"chromeCastToStream":"Den","stream":"http://x/a.mp4","streamDate":"2024-01-01T00:00:00Z"}"#,
            &log,
        );
        let consumers = services.spawn_consumers(Box::new(ScriptedInbound::idling(vec![play])));
        eventually(|| !log.lock().is_empty()).await;

        services.cancel();
        consumers.await.unwrap().unwrap();
        services.shutdown().await;

        assert_eq!(*log.lock(), vec![(0, Settlement::Ack)]);
        assert_eq!(backend.start_count(), 1);
        assert!(backend.discovery_stopped.load(Ordering::SeqCst));
        assert!(backend.shutdown_called.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn closed_discovery_stream_stops_the_service() {
        let backend = Arc::new(MockBackend::default());
        let publisher = Arc::new(MockPublisher::default());
        let services = services(&backend, &publisher);
        services.start_background_tasks().unwrap();
        let consumers = services.spawn_consumers(Box::new(ScriptedInbound::idling(Vec::new())));

        backend.discovery_tx.lock().take();

        let pool_result = tokio::time::timeout(Duration::from_secs(5), consumers)
            .await
            .unwrap()
            .unwrap();
        assert!(pool_result.is_ok());
        services.shutdown().await;

        assert!(matches!(
            services.take_failure(),
            Some(CasterError::Backend(CastError::Discovery(
                DiscoveryError::StreamClosed
            )))
        ));
        assert!(services.take_failure().is_none());
    }
}

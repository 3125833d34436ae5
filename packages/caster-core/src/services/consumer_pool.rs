//! Fixed-size pool of workers draining the inbound command stream.
//!
//! Workers share one inbound stream; whichever worker is idle pulls the next
//! delivery, runs it through the [`CommandDispatcher`] and settles it. Message
//! handling failures only affect that message. Transport failures end the
//! pool: the remaining workers are cancelled and the error is returned to the
//! process owner.

use std::sync::Arc;

use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::error::ErrorCode;
use crate::protocol_constants::PREFETCH_PER_CONSUMER;
use crate::transport::{Delivery, InboundStream, TransportError, TransportResult};

use super::command_dispatcher::{CommandDispatcher, Outcome};

type SharedInbound = Arc<AsyncMutex<Box<dyn InboundStream>>>;

/// Whether a rejected message on its `attempt`-th delivery goes back to the queue.
pub fn should_requeue(attempt: u32, max_deliveries: u32) -> bool {
    attempt < max_deliveries
}

/// Runs `consumer_count` workers over one inbound stream.
pub struct ConsumerPool {
    dispatcher: Arc<CommandDispatcher>,
    consumer_count: usize,
    max_deliveries: u32,
}

impl ConsumerPool {
    pub fn new(
        dispatcher: Arc<CommandDispatcher>,
        consumer_count: usize,
        max_deliveries: u32,
    ) -> Self {
        Self {
            dispatcher,
            consumer_count: consumer_count.max(1),
            max_deliveries: max_deliveries.max(1),
        }
    }

    pub fn consumer_count(&self) -> usize {
        self.consumer_count
    }

    /// Broker prefetch matching the pool size.
    pub fn prefetch_count(&self) -> u16 {
        let wanted = self.consumer_count.saturating_mul(PREFETCH_PER_CONSUMER);
        u16::try_from(wanted).unwrap_or(u16::MAX)
    }

    /// Consumes until `cancel` fires or the transport fails.
    ///
    /// Returns `Ok(())` after a cancellation once every worker has finished
    /// its current message, or the first transport-fatal error.
    pub async fn run(
        &self,
        inbound: Box<dyn InboundStream>,
        cancel: CancellationToken,
    ) -> TransportResult<()> {
        let inbound: SharedInbound = Arc::new(AsyncMutex::new(inbound));
        let workers_cancel = cancel.child_token();
        let mut workers = JoinSet::new();

        for worker_id in 0..self.consumer_count {
            let worker = Worker {
                id: worker_id,
                dispatcher: Arc::clone(&self.dispatcher),
                inbound: Arc::clone(&inbound),
                cancel: workers_cancel.clone(),
                max_deliveries: self.max_deliveries,
            };
            workers.spawn(worker.run());
        }

        log::info!(
            "[ConsumerPool] Started {} worker(s) (max deliveries: {})",
            self.consumer_count,
            self.max_deliveries
        );

        let mut first_error: Option<TransportError> = None;
        while let Some(joined) = workers.join_next().await {
            let error = match joined {
                Ok(Ok(())) => continue,
                Ok(Err(e)) => e,
                Err(e) => TransportError::WorkerFailed(e.to_string()),
            };
            log::error!("[ConsumerPool] Worker stopped ({}): {}", error.code(), error);
            workers_cancel.cancel();
            first_error.get_or_insert(error);
        }

        match first_error {
            Some(error) => Err(error),
            None => {
                log::info!("[ConsumerPool] All workers stopped");
                Ok(())
            }
        }
    }
}

struct Worker {
    id: usize,
    dispatcher: Arc<CommandDispatcher>,
    inbound: SharedInbound,
    cancel: CancellationToken,
    max_deliveries: u32,
}

impl Worker {
    async fn run(self) -> TransportResult<()> {
        loop {
            let Some(next) = self.next_delivery().await else {
                log::debug!("[ConsumerPool] Worker {} cancelled", self.id);
                return Ok(());
            };

            let delivery = match next {
                Some(Ok(delivery)) => delivery,
                Some(Err(e)) => return Err(self.fatal(e)),
                None => {
                    return Err(self.fatal(TransportError::StreamClosed(
                        "broker ended the consumer".to_string(),
                    )))
                }
            };

            if let Err(e) = self.handle(delivery).await {
                return Err(self.fatal(e));
            }
        }
    }

    /// Pulls the next item from the shared stream.
    ///
    /// The outer `None` means the worker was cancelled while idle.
    async fn next_delivery(&self) -> Option<Option<TransportResult<Box<dyn Delivery>>>> {
        let mut stream = tokio::select! {
            biased;
            () = self.cancel.cancelled() => return None,
            guard = self.inbound.lock() => guard,
        };
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => None,
            item = stream.next() => Some(item),
        }
    }

    async fn handle(&self, delivery: Box<dyn Delivery>) -> TransportResult<()> {
        let envelope = delivery.envelope().clone();
        let attempt = envelope.attempt();

        let report = self.dispatcher.dispatch(&envelope).await;

        match report.outcome {
            Outcome::Ack => delivery.ack().await,
            Outcome::Reject => {
                let requeue = should_requeue(attempt, self.max_deliveries);
                if let Some(error) = &report.error {
                    log::warn!(
                        "[ConsumerPool] Rejecting {} (attempt {}/{}, requeue: {}) [{}]: {}",
                        envelope.type_tag,
                        attempt,
                        self.max_deliveries,
                        requeue,
                        error.code(),
                        error
                    );
                }
                delivery.reject(requeue).await
            }
        }
    }

    fn fatal(&self, error: TransportError) -> TransportError {
        self.cancel.cancel();
        error
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cast::{RendererHandle, RendererKind};
    use crate::protocol_constants::PLAY_TYPE_TAG;
    use crate::services::renderer_registry::RendererRegistry;
    use crate::test_fixtures::{
        MockBackend, MockDelivery, ScriptedInbound, Settlement, SettlementLog,
    };
    use std::time::Duration;

    const PLAY_DEN: &str = r#"{"chromeCastToStream":"Den","stream":"http://x/a.mp4","streamDate":"2024-01-01T00:00:00Z"}"#;
    const PLAY_GHOST: &str = r#"{"chromeCastToStream":"Ghost","stream":"http://x/a.mp4","streamDate":"2024-01-01T00:00:00Z"}"#;

    fn pool(backend: Arc<MockBackend>, consumers: usize, max_deliveries: u32) -> ConsumerPool {
        let registry = Arc::new(RendererRegistry::new());
        registry.add(
            "Den",
            Arc::new(
                RendererHandle::new("den-id", RendererKind::Chromecast).with_friendly_name("Den"),
            ),
        );
        let dispatcher = Arc::new(CommandDispatcher::new(
            registry,
            backend,
            Duration::from_secs(30),
        ));
        ConsumerPool::new(dispatcher, consumers, max_deliveries)
    }

    fn sorted(log: &SettlementLog) -> Vec<(usize, Settlement)> {
        let mut entries = log.lock().clone();
        entries.sort_by_key(|(id, _)| *id);
        entries
    }

    #[test]
    fn prefetch_is_four_per_worker() {
        let pool = pool(Arc::new(MockBackend::default()), 5, 5);
        assert_eq!(pool.prefetch_count(), 20);
    }

    #[test]
    fn requeue_stops_at_bound() {
        assert!(should_requeue(1, 5));
        assert!(should_requeue(4, 5));
        assert!(!should_requeue(5, 5));
        assert!(!should_requeue(1, 1));
    }

    #[tokio::test]
    async fn settles_each_delivery_then_fails_on_stream_close() {
        let backend = Arc::new(MockBackend::default());
        let pool = pool(backend.clone(), 2, 5);
        let log = SettlementLog::default();
        let inbound = ScriptedInbound::closing(vec![
            MockDelivery::new(0, PLAY_TYPE_TAG, PLAY_DEN, &log),
            MockDelivery::new(1, "SomethingElse", "{}", &log),
            MockDelivery::new(2, PLAY_TYPE_TAG, PLAY_GHOST, &log),
        ]);

        let result = pool.run(Box::new(inbound), CancellationToken::new()).await;

        assert!(matches!(result, Err(TransportError::StreamClosed(_))));
        assert_eq!(
            sorted(&log),
            vec![
                (0, Settlement::Ack),
                (1, Settlement::Ack),
                (2, Settlement::Reject { requeue: true }),
            ]
        );
        assert_eq!(backend.start_count(), 1);
    }

    #[tokio::test]
    async fn exhausted_redeliveries_are_not_requeued() {
        let pool = pool(Arc::new(MockBackend::default()), 1, 5);
        let log = SettlementLog::default();
        let mut last_attempt = MockDelivery::new(0, PLAY_TYPE_TAG, PLAY_GHOST, &log);
        last_attempt.envelope.redelivered = true;
        last_attempt.envelope.delivery_count = Some(4);
        let mut early_attempt = MockDelivery::new(1, PLAY_TYPE_TAG, PLAY_GHOST, &log);
        early_attempt.envelope.redelivered = true;

        let _ = pool
            .run(
                Box::new(ScriptedInbound::closing(vec![last_attempt, early_attempt])),
                CancellationToken::new(),
            )
            .await;

        assert_eq!(
            sorted(&log),
            vec![
                (0, Settlement::Reject { requeue: false }),
                (1, Settlement::Reject { requeue: true }),
            ]
        );
    }

    #[tokio::test]
    async fn stream_error_is_fatal() {
        let pool = pool(Arc::new(MockBackend::default()), 3, 5);
        let inbound = ScriptedInbound::closing(Vec::new())
            .then_error(TransportError::StreamClosed("connection reset".to_string()));

        let result = pool.run(Box::new(inbound), CancellationToken::new()).await;

        match result {
            Err(TransportError::StreamClosed(reason)) => assert_eq!(reason, "connection reset"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn ack_failure_is_fatal() {
        let pool = pool(Arc::new(MockBackend::default()), 1, 5);
        let log = SettlementLog::default();
        let mut delivery = MockDelivery::new(0, PLAY_TYPE_TAG, PLAY_DEN, &log);
        delivery.fail_settle = true;

        let result = pool
            .run(
                Box::new(ScriptedInbound::idling(vec![delivery])),
                CancellationToken::new(),
            )
            .await;

        assert!(matches!(result, Err(TransportError::Acknowledge(_))));
    }

    #[tokio::test]
    async fn all_deliveries_are_processed_across_workers() {
        let backend = Arc::new(MockBackend::default());
        let pool = pool(backend.clone(), 3, 5);
        let log = SettlementLog::default();
        let deliveries = (0..10)
            .map(|id| MockDelivery::new(id, PLAY_TYPE_TAG, PLAY_DEN, &log))
            .collect();

        let _ = pool
            .run(
                Box::new(ScriptedInbound::closing(deliveries)),
                CancellationToken::new(),
            )
            .await;

        let settled = sorted(&log);
        assert_eq!(settled.len(), 10);
        assert!(settled.iter().all(|(_, s)| *s == Settlement::Ack));
        assert_eq!(backend.start_count(), 10);
    }

    #[tokio::test]
    async fn cancellation_stops_idle_workers_cleanly() {
        let backend = Arc::new(MockBackend::default());
        let pool = Arc::new(pool(backend.clone(), 2, 5));
        let log = SettlementLog::default();
        let inbound =
            ScriptedInbound::idling(vec![MockDelivery::new(0, PLAY_TYPE_TAG, PLAY_DEN, &log)]);
        let cancel = CancellationToken::new();

        let run = {
            let pool = Arc::clone(&pool);
            let cancel = cancel.clone();
            tokio::spawn(async move { pool.run(Box::new(inbound), cancel).await })
        };

        tokio::time::timeout(Duration::from_secs(5), async {
            while log.lock().is_empty() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
        cancel.cancel();

        let result = run.await.unwrap();
        assert!(result.is_ok());
        assert_eq!(sorted(&log), vec![(0, Settlement::Ack)]);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_mid_dispatch_finishes_current_message_only() {
        let backend = Arc::new(MockBackend::slow(Duration::from_secs(2)));
        let pool = Arc::new(pool(backend.clone(), 1, 5));
        let log = SettlementLog::default();
        let inbound = ScriptedInbound::idling(vec![
            MockDelivery::new(0, PLAY_TYPE_TAG, PLAY_DEN, &log),
            MockDelivery::new(1, PLAY_TYPE_TAG, PLAY_DEN, &log),
        ]);
        let cancel = CancellationToken::new();

        let run = {
            let pool = Arc::clone(&pool);
            let cancel = cancel.clone();
            tokio::spawn(async move { pool.run(Box::new(inbound), cancel).await })
        };

        while backend.start_count() == 0 {
            tokio::task::yield_now().await;
        }
        cancel.cancel();
        assert!(log.lock().is_empty());

        let result = run.await.unwrap();

        assert!(result.is_ok());
        assert_eq!(sorted(&log), vec![(0, Settlement::Ack)]);
        assert_eq!(backend.start_count(), 1);
    }
}

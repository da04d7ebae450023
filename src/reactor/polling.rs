//! Polling and transacted-polling reactors
//!
//! Both run one tokio task that pulls with `try_receive(poll_interval)` and
//! hands each message to the processor. The transacted variant commits after
//! a successful dispatch and rolls back after a failed one; redelivery is the
//! broker's business.

use crate::adapter::{AdapterError, QueueAdapter};
use crate::core::shutdown::ShutdownCoordinator;
use crate::message::Envelope;
use crate::notifications::{AsyncNotificationManager, ReactorEventType};
use crate::processor::Processor;
use crate::reactor::dispatch::Dispatcher;
use crate::reactor::error::ReactorResult;
use crate::reactor::kind::{ReactorKind, ReactorState};
use crate::reactor::statistics::StatisticsSnapshot;
use crate::reactor::traits::{require_idle, Reactor};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

struct Worker {
    stop: ShutdownCoordinator,
    task: JoinHandle<()>,
}

/// State moved into the receive loop task
struct PollLoop {
    adapter: Arc<dyn QueueAdapter>,
    processor: Processor,
    dispatcher: Arc<Dispatcher>,
    poll_interval: Duration,
    transacted: bool,
    stop: ShutdownCoordinator,
}

impl PollLoop {
    async fn run(self, mut stop_rx: broadcast::Receiver<()>) {
        let queue_id = self.adapter.queue_id().to_string();
        log::debug!("Queue '{}' poll loop running", queue_id);

        loop {
            if self.stop.is_shutdown_requested() {
                break;
            }

            let received = tokio::select! {
                biased;
                _ = stop_rx.recv() => break,
                received = self.adapter.try_receive(Some(self.poll_interval)) => received,
            };

            let pause = match received {
                Ok(Some(message)) => self.handle(message).await,
                Ok(None) => false,
                Err(e) => {
                    log::warn!(
                        "Queue '{}' receive failed, retrying in {:?}: {}",
                        queue_id,
                        self.poll_interval,
                        e
                    );
                    true
                }
            };

            if pause {
                tokio::select! {
                    biased;
                    _ = stop_rx.recv() => break,
                    _ = tokio::time::sleep(self.poll_interval) => {}
                }
            }
        }

        log::debug!("Queue '{}' poll loop exited", queue_id);
    }

    /// Dispatch one message. Returns true when the loop should back off.
    async fn handle(&self, message: Envelope) -> bool {
        let for_commit = self.transacted.then(|| message.clone());
        let outcome = self
            .dispatcher
            .dispatch(self.adapter.as_ref(), &self.processor, message)
            .await;

        let (Some(message), Some(tx)) = (for_commit, self.adapter.as_transactional()) else {
            return false;
        };
        let queue_id = self.adapter.queue_id();

        match outcome {
            Ok(()) => {
                match tx.commit_if_transacted(&message).await {
                    Ok(()) => self.dispatcher.statistics().record_commit(),
                    Err(e) => log::warn!("Queue '{}' commit failed: {}", queue_id, e),
                }
                false
            }
            Err(_) => {
                match tx.rollback_if_transacted().await {
                    Ok(()) => self.dispatcher.statistics().record_rollback(),
                    Err(e) => log::warn!("Queue '{}' rollback failed: {}", queue_id, e),
                }
                // Redelivery is immediate; wait before picking the message up again.
                true
            }
        }
    }
}

/// Pull-model reactor, optionally wrapping each message in a transaction
pub struct PollingReactor {
    kind: ReactorKind,
    state: ReactorState,
    adapter: Arc<dyn QueueAdapter>,
    processor: Processor,
    dispatcher: Arc<Dispatcher>,
    worker: Option<Worker>,
}

impl PollingReactor {
    pub fn new(
        adapter: Arc<dyn QueueAdapter>,
        processor: Processor,
        notifications: Option<Arc<AsyncNotificationManager>>,
    ) -> Self {
        Self::build(ReactorKind::Polling, adapter, processor, notifications)
    }

    /// Commit on success, roll back on failure. Needs a transactional adapter.
    pub fn transacted(
        adapter: Arc<dyn QueueAdapter>,
        processor: Processor,
        notifications: Option<Arc<AsyncNotificationManager>>,
    ) -> ReactorResult<Self> {
        if adapter.as_transactional().is_none() {
            return Err(AdapterError::CapabilityMissing {
                queue_id: adapter.queue_id().to_string(),
                capability: "transactions".to_string(),
            }
            .into());
        }
        Ok(Self::build(
            ReactorKind::TransactedPolling,
            adapter,
            processor,
            notifications,
        ))
    }

    fn build(
        kind: ReactorKind,
        adapter: Arc<dyn QueueAdapter>,
        processor: Processor,
        notifications: Option<Arc<AsyncNotificationManager>>,
    ) -> Self {
        let dispatcher = Arc::new(Dispatcher::new(adapter.queue_id(), kind, notifications));
        Self {
            kind,
            state: ReactorState::Idle,
            adapter,
            processor,
            dispatcher,
            worker: None,
        }
    }
}

#[async_trait]
impl Reactor for PollingReactor {
    fn queue_id(&self) -> &str {
        self.adapter.queue_id()
    }

    fn kind(&self) -> ReactorKind {
        self.kind
    }

    fn state(&self) -> ReactorState {
        self.state
    }

    fn adapter(&self) -> Arc<dyn QueueAdapter> {
        self.adapter.clone()
    }

    fn statistics(&self) -> StatisticsSnapshot {
        self.dispatcher.statistics().snapshot()
    }

    async fn start(&mut self) -> ReactorResult<()> {
        require_idle(self.adapter.queue_id(), self.state)?;
        self.adapter.connect().await?;

        let (stop, stop_rx) = ShutdownCoordinator::new();
        let poll_loop = PollLoop {
            adapter: self.adapter.clone(),
            processor: self.processor.clone(),
            dispatcher: self.dispatcher.clone(),
            poll_interval: self.adapter.endpoint().poll_interval,
            transacted: self.kind == ReactorKind::TransactedPolling,
            stop: stop.clone(),
        };
        let task = tokio::spawn(poll_loop.run(stop_rx));

        self.worker = Some(Worker { stop, task });
        self.state = ReactorState::Running;
        log::info!(
            "Queue '{}' {} reactor started (poll interval {:?})",
            self.adapter.queue_id(),
            self.kind,
            self.adapter.endpoint().poll_interval
        );
        self.dispatcher.publish(ReactorEventType::Started, None);
        Ok(())
    }

    async fn stop(&mut self) -> ReactorResult<()> {
        match self.state {
            ReactorState::Stopped => return Ok(()),
            ReactorState::Idle => {
                self.state = ReactorState::Stopped;
                return Ok(());
            }
            ReactorState::Running | ReactorState::Stopping => {}
        }

        self.state = ReactorState::Stopping;
        if let Some(worker) = self.worker.take() {
            worker.stop.trigger_shutdown();
            if let Err(e) = worker.task.await {
                log::warn!(
                    "Queue '{}' poll loop ended abnormally: {}",
                    self.adapter.queue_id(),
                    e
                );
            }
        }

        let disconnected = self.adapter.disconnect().await;
        self.state = ReactorState::Stopped;
        log::info!(
            "Queue '{}' {} reactor stopped",
            self.adapter.queue_id(),
            self.kind
        );
        self.dispatcher.publish(ReactorEventType::Stopped, None);
        disconnected.map_err(Into::into)
    }
}

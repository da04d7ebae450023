//! Push-model reactors
//!
//! The adapter's transport task calls [`PushHandler::on_message`] for every
//! delivery. The handler holds only a weak reference back to the adapter so
//! an adapter and its subscription never keep each other alive.

use crate::adapter::{AdapterError, InboundHandler, QueueAdapter};
use crate::config::ConfigError;
use crate::message::Envelope;
use crate::notifications::{AsyncNotificationManager, ReactorEventType};
use crate::processor::{Processor, ProcessorKind};
use crate::reactor::dispatch::Dispatcher;
use crate::reactor::error::ReactorResult;
use crate::reactor::kind::{ReactorKind, ReactorState};
use crate::reactor::statistics::StatisticsSnapshot;
use crate::reactor::traits::{require_idle, Reactor};
use async_trait::async_trait;
use std::sync::{Arc, Weak};

struct PushHandler {
    adapter: Weak<dyn QueueAdapter>,
    processor: Processor,
    dispatcher: Arc<Dispatcher>,
}

#[async_trait]
impl InboundHandler for PushHandler {
    async fn on_message(&self, message: Envelope) {
        let Some(adapter) = self.adapter.upgrade() else {
            log::debug!("Push delivery after adapter was dropped; message discarded");
            return;
        };
        // Failures were already counted and published by the dispatcher.
        let _ = self
            .dispatcher
            .dispatch(adapter.as_ref(), &self.processor, message)
            .await;
    }
}

/// Reactor for adapters that push messages to a subscriber
pub struct SubscribedReactor {
    kind: ReactorKind,
    state: ReactorState,
    adapter: Arc<dyn QueueAdapter>,
    processor: Processor,
    dispatcher: Arc<Dispatcher>,
}

impl SubscribedReactor {
    pub fn new(
        adapter: Arc<dyn QueueAdapter>,
        processor: Processor,
        notifications: Option<Arc<AsyncNotificationManager>>,
    ) -> ReactorResult<Self> {
        require_subscribing(adapter.as_ref())?;
        Ok(Self::build(
            ReactorKind::Subscribed,
            adapter,
            processor,
            notifications,
        ))
    }

    /// Push consumption where every processor result is sent back to the
    /// inbound message's reply destination
    pub fn with_replies(
        adapter: Arc<dyn QueueAdapter>,
        processor: Processor,
        notifications: Option<Arc<AsyncNotificationManager>>,
    ) -> ReactorResult<Self> {
        require_subscribing(adapter.as_ref())?;
        if processor.kind() != ProcessorKind::Reply {
            return Err(ConfigError::UnsupportedCombination {
                queue_id: adapter.queue_id().to_string(),
                reason: format!(
                    "subscribe-and-reply needs a reply processor, found {}",
                    processor.kind()
                ),
            }
            .into());
        }
        if adapter.as_duplex().is_none() {
            return Err(ConfigError::UnsupportedCombination {
                queue_id: adapter.queue_id().to_string(),
                reason: "subscribe-and-reply needs an adapter with duplex capability"
                    .to_string(),
            }
            .into());
        }
        Ok(Self::build(
            ReactorKind::SubscribeAndReply,
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
        }
    }
}

fn require_subscribing(adapter: &dyn QueueAdapter) -> ReactorResult<()> {
    if adapter.as_subscribing().is_some() {
        Ok(())
    } else {
        Err(AdapterError::CapabilityMissing {
            queue_id: adapter.queue_id().to_string(),
            capability: "subscribing".to_string(),
        }
        .into())
    }
}

#[async_trait]
impl Reactor for SubscribedReactor {
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
        let Some(subscribing) = self.adapter.as_subscribing() else {
            require_subscribing(self.adapter.as_ref())?;
            return Ok(());
        };

        self.adapter.connect().await?;

        let handler = Arc::new(PushHandler {
            adapter: Arc::downgrade(&self.adapter),
            processor: self.processor.clone(),
            dispatcher: self.dispatcher.clone(),
        });
        if let Err(e) = subscribing.subscribe(handler).await {
            if let Err(disconnect_error) = self.adapter.disconnect().await {
                log::debug!(
                    "Queue '{}' disconnect after failed subscribe: {}",
                    self.adapter.queue_id(),
                    disconnect_error
                );
            }
            return Err(e.into());
        }

        self.state = ReactorState::Running;
        log::info!(
            "Queue '{}' {} reactor started",
            self.adapter.queue_id(),
            self.kind
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
        let unsubscribed = match self.adapter.as_subscribing() {
            Some(subscribing) => subscribing.unsubscribe().await,
            None => Ok(()),
        };
        if let Err(e) = &unsubscribed {
            log::warn!("Queue '{}' unsubscribe failed: {}", self.adapter.queue_id(), e);
        }

        let disconnected = self.adapter.disconnect().await;
        self.state = ReactorState::Stopped;
        log::info!(
            "Queue '{}' {} reactor stopped",
            self.adapter.queue_id(),
            self.kind
        );
        self.dispatcher.publish(ReactorEventType::Stopped, None);
        unsubscribed.and(disconnected).map_err(Into::into)
    }
}

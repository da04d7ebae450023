//! Reactor Factory
//!
//! Turns a queue id into a ready-to-start reactor: processor lookup, adapter
//! resolution, strategy selection and construction.

use crate::adapter::{AdapterRegistry, QueueAdapter};
use crate::config::{ConfigError, EndpointSet};
use crate::notifications::AsyncNotificationManager;
use crate::processor::{Processor, ProcessorRegistry, RegistrationHandle};
use crate::reactor::error::ReactorResult;
use crate::reactor::kind::ReactorKind;
use crate::reactor::polling::PollingReactor;
use crate::reactor::subscribed::SubscribedReactor;
use crate::reactor::traits::Reactor;
use std::sync::Arc;

/// Builds reactors for configured queues
///
/// Holds the shared processor registry; every reactor it creates looks its
/// processor up there.
pub struct ReactorFactory {
    processors: Arc<ProcessorRegistry>,
    adapters: Arc<AdapterRegistry>,
    endpoints: Arc<EndpointSet>,
    notifications: Option<Arc<AsyncNotificationManager>>,
}

impl std::fmt::Debug for ReactorFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReactorFactory")
            .field("processors", &self.processors.len())
            .field("endpoints", &self.endpoints.len())
            .field("notifications", &self.notifications.is_some())
            .finish()
    }
}

impl ReactorFactory {
    pub fn new(
        processors: Arc<ProcessorRegistry>,
        adapters: Arc<AdapterRegistry>,
        endpoints: Arc<EndpointSet>,
    ) -> Self {
        Self {
            processors,
            adapters,
            endpoints,
            notifications: None,
        }
    }

    /// Publish reactor lifecycle events to `notifications`
    pub fn with_notifications(mut self, notifications: Arc<AsyncNotificationManager>) -> Self {
        self.notifications = Some(notifications);
        self
    }

    pub fn processors(&self) -> &Arc<ProcessorRegistry> {
        &self.processors
    }

    pub fn endpoints(&self) -> &Arc<EndpointSet> {
        &self.endpoints
    }

    /// Bind a processor to a queue id. Fails if one is already bound.
    pub fn register(
        &self,
        queue_id: impl Into<String>,
        processor: Processor,
    ) -> ReactorResult<RegistrationHandle> {
        Ok(self.processors.register(queue_id, processor)?)
    }

    /// Strategy `create_queue_reactor` would build, without building it
    pub fn plan(&self, queue_id: &str) -> ReactorResult<ReactorKind> {
        self.processors.get(queue_id)?;
        let endpoint = self.endpoints.require(queue_id)?;
        let adapter = self.adapters.resolve(endpoint)?;
        Ok(ReactorKind::select(
            adapter.capabilities(),
            endpoint.processing_mode,
        ))
    }

    /// Resolve the configured adapter for `queue_id` and build its reactor
    pub fn create_queue_reactor(&self, queue_id: &str) -> ReactorResult<Box<dyn Reactor>> {
        self.processors.get(queue_id)?;
        let endpoint = self.endpoints.require(queue_id)?;
        let adapter = self.adapters.resolve(endpoint)?;
        self.create_reactor(queue_id, adapter)
    }

    /// Build the reactor for `queue_id` around an already constructed adapter
    ///
    /// The adapter's own endpoint supplies the processing mode.
    pub fn create_reactor(
        &self,
        queue_id: &str,
        adapter: Arc<dyn QueueAdapter>,
    ) -> ReactorResult<Box<dyn Reactor>> {
        let processor = self.processors.get(queue_id)?;

        if adapter.queue_id() != queue_id {
            return Err(ConfigError::UnsupportedCombination {
                queue_id: queue_id.to_string(),
                reason: format!("adapter serves queue '{}'", adapter.queue_id()),
            }
            .into());
        }

        let capabilities = adapter.capabilities();
        let mode = adapter.endpoint().processing_mode;
        let kind = ReactorKind::select(capabilities, mode);
        log::debug!(
            "Queue '{}': mode {}, adapter capabilities {} -> {} reactor",
            queue_id,
            mode,
            capabilities,
            kind
        );

        let notifications = self.notifications.clone();
        let reactor: Box<dyn Reactor> = match kind {
            ReactorKind::Polling => Box::new(PollingReactor::new(adapter, processor, notifications)),
            ReactorKind::TransactedPolling => Box::new(PollingReactor::transacted(
                adapter,
                processor,
                notifications,
            )?),
            ReactorKind::Subscribed => {
                Box::new(SubscribedReactor::new(adapter, processor, notifications)?)
            }
            ReactorKind::SubscribeAndReply => Box::new(SubscribedReactor::with_replies(
                adapter,
                processor,
                notifications,
            )?),
        };
        Ok(reactor)
    }
}

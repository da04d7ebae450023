//! Host wiring: registries, default processors and the reactor set
//!
//! Every configured queue is served from one in-process broker, whatever
//! broker family its endpoint names. Queues in `subscribe_and_reply` mode get
//! an echo processor; all others get a processor that logs each message.

use crate::adapter::{AdapterRegistry, MemoryBroker, MemoryProvider};
use crate::config::{BrokerFamily, ConfigResult, EndpointSet, ProcessingMode};
use crate::core::retry::{retry_async_when, RetryPolicy};
use crate::message::Envelope;
use crate::notifications::{
    AsyncNotificationManager, Event, EventFilter, NotificationError, SystemEvent,
    SystemEventType,
};
use crate::processor::{
    HandlerResult, MessageHandler, Processor, ProcessorRegistry, ReplyHandler,
};
use crate::reactor::{Reactor, ReactorError, ReactorFactory, ReactorKind, ReactorResult};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use strum::IntoEnumIterator;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

const EVENT_LOGGER_ID: &str = "host-event-log";

/// Logs every message it consumes
struct LoggingProcessor {
    queue_id: String,
}

#[async_trait]
impl MessageHandler for LoggingProcessor {
    async fn handle(&self, message: Envelope) -> HandlerResult<()> {
        log::info!(
            "Queue '{}' received message {} ({} bytes)",
            self.queue_id,
            message.id().unwrap_or("-"),
            message.payload.len()
        );
        Ok(())
    }
}

/// Replies with the request payload
struct EchoProcessor {
    queue_id: String,
}

#[async_trait]
impl ReplyHandler for EchoProcessor {
    async fn handle(&self, message: Envelope) -> HandlerResult<Envelope> {
        log::info!(
            "Queue '{}' echoing message {}",
            self.queue_id,
            message.id().unwrap_or("-")
        );
        Ok(message.reply_with(message.payload.clone()))
    }
}

/// One line of the `--check` output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanEntry {
    pub queue_id: String,
    pub broker: BrokerFamily,
    pub mode: ProcessingMode,
    /// Selected reactor, or why none can be built
    pub outcome: Result<ReactorKind, String>,
}

pub struct Host {
    broker: MemoryBroker,
    factory: ReactorFactory,
    notifications: Arc<AsyncNotificationManager>,
    retry: RetryPolicy,
}

impl std::fmt::Debug for Host {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Host")
            .field("factory", &self.factory)
            .field("retry", &self.retry)
            .finish()
    }
}

impl Host {
    /// Wire registries for `endpoints` on top of `broker`
    pub fn new(endpoints: EndpointSet, broker: MemoryBroker) -> ConfigResult<Self> {
        let mut adapters = AdapterRegistry::new();
        for family in BrokerFamily::iter() {
            adapters.register(Arc::new(MemoryProvider::for_family(family, broker.clone())))?;
        }

        let notifications = Arc::new(AsyncNotificationManager::new());
        let factory = ReactorFactory::new(
            Arc::new(ProcessorRegistry::new()),
            Arc::new(adapters),
            Arc::new(endpoints),
        )
        .with_notifications(notifications.clone());

        Ok(Self {
            broker,
            factory,
            notifications,
            retry: RetryPolicy {
                max_attempts: 5,
                delay: Duration::from_secs(1),
            },
        })
    }

    /// Policy used when a reactor's first connect fails transiently
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn broker(&self) -> &MemoryBroker {
        &self.broker
    }

    pub fn factory(&self) -> &ReactorFactory {
        &self.factory
    }

    pub fn notifications(&self) -> &Arc<AsyncNotificationManager> {
        &self.notifications
    }

    /// Bind the built-in processor to every queue that has none yet
    pub fn register_default_processors(&self) -> ReactorResult<usize> {
        let mut registered = 0;
        for endpoint in self.factory.endpoints().iter() {
            if self.factory.processors().is_registered(&endpoint.id) {
                continue;
            }
            let queue_id = endpoint.id.clone();
            let processor = match endpoint.processing_mode {
                ProcessingMode::SubscribeAndReply => {
                    Processor::Reply(Arc::new(EchoProcessor { queue_id }))
                }
                ProcessingMode::ThreadPolling | ProcessingMode::Subscribe => {
                    Processor::Consume(Arc::new(LoggingProcessor { queue_id }))
                }
            };
            self.factory.register(endpoint.id.clone(), processor)?;
            registered += 1;
        }
        Ok(registered)
    }

    /// Reactor selection for every configured queue, in configuration order
    pub fn plan(&self) -> Vec<PlanEntry> {
        self.factory
            .endpoints()
            .iter()
            .map(|endpoint| {
                let outcome = self
                    .factory
                    .create_queue_reactor(&endpoint.id)
                    .map(|reactor| reactor.kind())
                    .map_err(|e| e.to_string());
                PlanEntry {
                    queue_id: endpoint.id.clone(),
                    broker: endpoint.broker,
                    mode: endpoint.processing_mode,
                    outcome,
                }
            })
            .collect()
    }

    /// Create and start a reactor for every configured queue
    ///
    /// Transient connect failures are retried per the host's policy. If any
    /// queue cannot be started, the reactors already running are stopped.
    pub async fn start_all(&self) -> ReactorResult<Vec<Box<dyn Reactor>>> {
        let mut reactors: Vec<Box<dyn Reactor>> = Vec::new();

        for endpoint in self.factory.endpoints().iter() {
            let factory = &self.factory;
            let queue_id = endpoint.id.as_str();
            let started = retry_async_when(
                queue_id,
                self.retry.clone(),
                move || async move {
                    let mut reactor = factory.create_queue_reactor(queue_id)?;
                    reactor.start().await?;
                    Ok::<_, ReactorError>(reactor)
                },
                ReactorError::is_transient,
            )
            .await;

            match started {
                Ok(reactor) => reactors.push(reactor),
                Err(e) => {
                    log::warn!(
                        "Queue '{}' could not be started; stopping {} running reactor(s)",
                        queue_id,
                        reactors.len()
                    );
                    Self::stop_all(reactors).await;
                    return Err(e);
                }
            }
        }

        Ok(reactors)
    }

    /// Stop reactors in reverse start order, logging their final counters
    pub async fn stop_all(reactors: Vec<Box<dyn Reactor>>) {
        for mut reactor in reactors.into_iter().rev() {
            if let Err(e) = reactor.stop().await {
                log::warn!("Queue '{}' did not stop cleanly: {}", reactor.queue_id(), e);
            }
            let stats = reactor.statistics();
            log::info!(
                "Queue '{}' {}: {} received, {} processed, {} failed, {} replies",
                reactor.queue_id(),
                reactor.kind(),
                stats.received,
                stats.processed,
                stats.failed,
                stats.replies_sent
            );
        }
    }

    /// Forward lifecycle events to the log until the host unsubscribes
    pub fn spawn_event_logger(&self) -> Result<JoinHandle<()>, NotificationError> {
        let mut events = self.notifications.subscribe(
            EVENT_LOGGER_ID.to_string(),
            EventFilter::All,
            "host".to_string(),
        )?;

        Ok(tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                match event {
                    Event::Reactor(event) => log::debug!(
                        "Event {:?} from queue '{}' ({}){}",
                        event.event_type,
                        event.queue_id,
                        event.reactor,
                        event
                            .message
                            .map(|m| format!(": {}", m))
                            .unwrap_or_default()
                    ),
                    Event::System(event) => {
                        log::debug!("System event {:?}", event.event_type)
                    }
                }
            }
        }))
    }

    fn publish_system(&self, event_type: SystemEventType, message: String) {
        let event = SystemEvent::with_message(event_type, message);
        if let Err(e) = self.notifications.publish(Event::System(event)) {
            log::trace!("System event delivery incomplete: {}", e);
        }
    }

    /// Run every reactor until `shutdown_rx` fires
    pub async fn run(&self, mut shutdown_rx: broadcast::Receiver<()>) -> ReactorResult<()> {
        let event_logger = match self.spawn_event_logger() {
            Ok(handle) => Some(handle),
            Err(e) => {
                log::warn!("Lifecycle events will not be logged: {}", e);
                None
            }
        };

        self.publish_system(
            SystemEventType::Startup,
            format!("{} queue(s) configured", self.factory.endpoints().len()),
        );

        let outcome = match self.start_all().await {
            Ok(reactors) => {
                log::info!("{} reactor(s) running", reactors.len());
                // A closed channel means the coordinator is gone; stop as well.
                let _ = shutdown_rx.recv().await;
                log::info!("Shutdown requested, stopping reactors");
                Self::stop_all(reactors).await;
                Ok(())
            }
            Err(e) => Err(e),
        };

        self.publish_system(SystemEventType::Shutdown, "reactors stopped".to_string());
        self.notifications.unsubscribe(EVENT_LOGGER_ID);
        if let Some(handle) = event_logger {
            let _ = handle.await;
        }
        outcome
    }
}

/// Format the `--check` plan as aligned columns
pub fn render_plan(entries: &[PlanEntry], use_color: bool) -> String {
    use colored::Colorize;

    let width = entries
        .iter()
        .map(|entry| entry.queue_id.len())
        .max()
        .unwrap_or(0)
        .max("QUEUE".len());

    let header = format!(
        "{:<width$}  {:<10}  {:<20}  REACTOR",
        "QUEUE",
        "BROKER",
        "MODE",
        width = width
    );
    let mut lines = vec![if use_color {
        header.bold().to_string()
    } else {
        header
    }];

    for entry in entries {
        let reactor = match &entry.outcome {
            Ok(kind) if use_color => kind.to_string().green().to_string(),
            Ok(kind) => kind.to_string(),
            Err(reason) if use_color => format!("{} {}", "error:".red().bold(), reason),
            Err(reason) => format!("error: {}", reason),
        };
        lines.push(format!(
            "{:<width$}  {:<10}  {:<20}  {}",
            entry.queue_id,
            entry.broker.to_string(),
            entry.mode.to_string(),
            reactor,
            width = width
        ));
    }

    lines.join("\n")
}

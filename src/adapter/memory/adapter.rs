//! Adapter over the in-process broker with a configurable capability set

use crate::adapter::connection::ConnectionGuard;
use crate::adapter::error::{AdapterError, AdapterResult};
use crate::adapter::memory::broker::{BrokerError, Delivery, MemoryBroker};
use crate::adapter::traits::{
    Capabilities, DuplexReply, InboundHandler, QueueAdapter, Subscribing, Transactional,
};
use crate::config::QueueEndpoint;
use crate::core::shutdown::ShutdownCoordinator;
use crate::core::sync::handle_mutex_poison;
use crate::duplex::{EphemeralTransport, ReplyListener, RequestReplyCoordinator};
use crate::message::Envelope;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Push consumer spawned by `subscribe`
struct Subscription {
    stop: ShutdownCoordinator,
    task: JoinHandle<()>,
}

pub struct MemoryAdapter {
    endpoint: QueueEndpoint,
    broker: MemoryBroker,
    capabilities: Capabilities,
    connection: Arc<ConnectionGuard>,
    in_flight: Mutex<Option<Delivery>>,
    subscription: Mutex<Option<Subscription>>,
    coordinator: RequestReplyCoordinator,
}

impl std::fmt::Debug for MemoryAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryAdapter")
            .field("queue_id", &self.endpoint.id)
            .field("capabilities", &self.capabilities)
            .field("connected", &self.connection.is_open())
            .finish()
    }
}

impl MemoryAdapter {
    pub fn new(endpoint: QueueEndpoint, broker: MemoryBroker, capabilities: Capabilities) -> Self {
        let coordinator = RequestReplyCoordinator::new(endpoint.id.clone(), endpoint.reply_timeout);
        Self {
            connection: Arc::new(ConnectionGuard::new(endpoint.id.clone())),
            endpoint,
            broker,
            capabilities,
            in_flight: Mutex::new(None),
            subscription: Mutex::new(None),
            coordinator,
        }
    }

    pub fn broker(&self) -> &MemoryBroker {
        &self.broker
    }

    /// Underlying connects performed, including reconnects
    pub fn connect_count(&self) -> u64 {
        self.connection.connect_count()
    }

    /// Requests waiting on a reply through this adapter
    pub fn pending_requests(&self) -> usize {
        self.coordinator.pending_count()
    }

    fn queue_name(&self) -> &str {
        &self.endpoint.id
    }

    fn lock_error(&self, message: String) -> AdapterError {
        AdapterError::Transport {
            queue_id: self.endpoint.id.clone(),
            message,
        }
    }

    async fn establish(&self) -> AdapterResult<()> {
        let broker = self.broker.clone();
        let queue_id = self.endpoint.id.clone();
        self.connection
            .check_and_reconnect(|| declare(broker, queue_id))
            .await
    }

    /// Translate a broker failure, dropping the connection on outages
    async fn broker_failure(&self, error: BrokerError) -> AdapterError {
        match error {
            BrokerError::Unavailable => {
                self.connection.mark_lost().await;
                AdapterError::ConnectionFailure {
                    queue_id: self.endpoint.id.clone(),
                    message: error.to_string(),
                }
            }
            other => AdapterError::Transport {
                queue_id: self.endpoint.id.clone(),
                message: other.to_string(),
            },
        }
    }

    async fn publish_to(&self, destination: &str, mut message: Envelope) -> AdapterResult<Envelope> {
        self.establish().await?;
        message.mark_sent();
        match self.broker.publish(destination, message.clone()) {
            Ok(sequence) => {
                log::trace!(
                    "Queue '{}' sent {} as #{} to '{}'",
                    self.endpoint.id,
                    message.id().unwrap_or("-"),
                    sequence,
                    destination
                );
                Ok(message)
            }
            Err(error) => {
                if error == BrokerError::Unavailable {
                    self.connection.mark_lost().await;
                }
                Err(AdapterError::SendFailure {
                    destination: destination.to_string(),
                    message: error.to_string(),
                })
            }
        }
    }

    async fn stop_subscription(&self) -> AdapterResult<()> {
        let subscription = {
            let mut slot = handle_mutex_poison(self.subscription.lock(), |m| self.lock_error(m))?;
            slot.take()
        };
        if let Some(subscription) = subscription {
            subscription.stop.trigger_shutdown();
            if let Err(e) = subscription.task.await {
                log::warn!(
                    "Push consumer for '{}' ended abnormally: {}",
                    self.endpoint.id,
                    e
                );
            }
            log::debug!("Queue '{}' push consumer stopped", self.endpoint.id);
        }
        Ok(())
    }

    /// Hand an uncommitted message back to the broker
    fn return_in_flight(&self) -> AdapterResult<()> {
        let delivery = {
            let mut slot = handle_mutex_poison(self.in_flight.lock(), |m| self.lock_error(m))?;
            slot.take()
        };
        if let Some(delivery) = delivery {
            log::debug!(
                "Queue '{}' returning {} (#{}) for redelivery",
                self.endpoint.id,
                delivery.message.id().unwrap_or("-"),
                delivery.sequence
            );
            self.broker
                .requeue_front(self.queue_name(), delivery)
                .map_err(|e| AdapterError::Transport {
                    queue_id: self.endpoint.id.clone(),
                    message: e.to_string(),
                })?;
        }
        Ok(())
    }
}

async fn declare(broker: MemoryBroker, queue_id: String) -> AdapterResult<()> {
    broker
        .declare_queue(&queue_id)
        .map_err(|e| AdapterError::ConnectionFailure {
            queue_id: queue_id.clone(),
            message: e.to_string(),
        })
}

/// Reconnect a push consumer after an outage
///
/// Retries every `backoff` until the queue is declared again. Returns false
/// when stopped first.
async fn resume_push(
    broker: &MemoryBroker,
    connection: &ConnectionGuard,
    queue: &str,
    backoff: Duration,
    stop_rx: &mut tokio::sync::broadcast::Receiver<()>,
) -> bool {
    loop {
        tokio::select! {
            _ = stop_rx.recv() => return false,
            _ = tokio::time::sleep(backoff) => {}
        }
        match connection
            .check_and_reconnect(|| declare(broker.clone(), queue.to_string()))
            .await
        {
            Ok(()) => {
                log::debug!("Push consumer for '{}' resumed", queue);
                return true;
            }
            Err(e) => log::debug!("Push consumer for '{}' still waiting: {}", queue, e),
        }
    }
}

#[async_trait]
impl QueueAdapter for MemoryAdapter {
    fn queue_id(&self) -> &str {
        &self.endpoint.id
    }

    fn endpoint(&self) -> &QueueEndpoint {
        &self.endpoint
    }

    async fn connect(&self) -> AdapterResult<()> {
        self.establish().await
    }

    async fn disconnect(&self) -> AdapterResult<()> {
        self.stop_subscription().await?;
        if self.connection.is_open() {
            self.return_in_flight()?;
        }
        self.connection.close(|| async { Ok(()) }).await?;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        if !self.connection.is_open() {
            return false;
        }
        match self.subscription.lock() {
            Ok(slot) => slot.as_ref().is_none_or(|s| !s.task.is_finished()),
            Err(_) => false,
        }
    }

    async fn send(&self, message: Envelope) -> AdapterResult<Envelope> {
        let destination = self.queue_name().to_string();
        self.publish_to(&destination, message).await
    }

    async fn try_receive(&self, timeout: Option<Duration>) -> AdapterResult<Option<Envelope>> {
        self.establish().await?;

        if self.capabilities.transactional {
            let held = handle_mutex_poison(self.in_flight.lock(), |m| self.lock_error(m))?;
            if held.is_some() {
                return Err(AdapterError::Transport {
                    queue_id: self.endpoint.id.clone(),
                    message: "previous message has not been committed or rolled back".to_string(),
                });
            }
        }

        let popped = match timeout {
            Some(wait) => self.broker.take_wait(self.queue_name(), Some(wait)).await,
            None => self.broker.try_take(self.queue_name()),
        };
        let mut delivery = match popped {
            Ok(Some(delivery)) => delivery,
            Ok(None) => return Ok(None),
            Err(error) => return Err(self.broker_failure(error).await),
        };

        delivery.message.mark_received();
        let message = delivery.message.clone();
        if self.capabilities.transactional {
            let mut held = handle_mutex_poison(self.in_flight.lock(), |m| self.lock_error(m))?;
            *held = Some(delivery);
        }
        Ok(Some(message))
    }

    fn as_subscribing(&self) -> Option<&dyn Subscribing> {
        if self.capabilities.subscribing {
            Some(self)
        } else {
            None
        }
    }

    fn as_transactional(&self) -> Option<&dyn Transactional> {
        if self.capabilities.transactional {
            Some(self)
        } else {
            None
        }
    }

    fn as_duplex(&self) -> Option<&dyn DuplexReply> {
        if self.capabilities.duplex {
            Some(self)
        } else {
            None
        }
    }

    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }
}

#[async_trait]
impl Subscribing for MemoryAdapter {
    async fn subscribe(&self, handler: Arc<dyn InboundHandler>) -> AdapterResult<()> {
        self.establish().await?;

        let mut slot = handle_mutex_poison(self.subscription.lock(), |m| self.lock_error(m))?;
        if slot.is_some() {
            return Err(AdapterError::Transport {
                queue_id: self.endpoint.id.clone(),
                message: "a push consumer is already active".to_string(),
            });
        }

        let (stop, mut stop_rx) = ShutdownCoordinator::new();
        let broker = self.broker.clone();
        let connection = self.connection.clone();
        let queue = self.queue_name().to_string();
        let backoff = self.endpoint.poll_interval;
        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = stop_rx.recv() => break,
                    popped = broker.pop_wait(&queue, None) => match popped {
                        Ok(Some(mut message)) => {
                            message.mark_received();
                            handler.on_message(message).await;
                        }
                        Ok(None) => {}
                        Err(BrokerError::Unavailable) => {
                            connection.mark_lost().await;
                            if !resume_push(&broker, &connection, &queue, backoff, &mut stop_rx).await {
                                break;
                            }
                        }
                        Err(e) => {
                            log::warn!("Push consumer for '{}' stopped: {}", queue, e);
                            break;
                        }
                    }
                }
            }
        });

        *slot = Some(Subscription { stop, task });
        log::debug!("Queue '{}' push consumer started", self.endpoint.id);
        Ok(())
    }

    async fn unsubscribe(&self) -> AdapterResult<()> {
        self.stop_subscription().await
    }
}

#[async_trait]
impl Transactional for MemoryAdapter {
    async fn commit_if_transacted(&self, message: &Envelope) -> AdapterResult<()> {
        let held = {
            let mut slot = handle_mutex_poison(self.in_flight.lock(), |m| self.lock_error(m))?;
            slot.take()
        };
        match held {
            Some(held) if held.message.id() != message.id() => {
                log::warn!(
                    "Queue '{}' committed {} while {} was in flight",
                    self.endpoint.id,
                    message.id().unwrap_or("-"),
                    held.message.id().unwrap_or("-")
                );
            }
            Some(held) => log::trace!(
                "Queue '{}' committed {} (#{})",
                self.endpoint.id,
                message.id().unwrap_or("-"),
                held.sequence
            ),
            None => {}
        }
        Ok(())
    }

    async fn rollback_if_transacted(&self) -> AdapterResult<()> {
        self.return_in_flight()
    }
}

#[async_trait]
impl DuplexReply for MemoryAdapter {
    async fn request_and_wait_response(&self, request: Envelope) -> AdapterResult<Envelope> {
        self.coordinator.request_and_wait_response(self, request).await
    }

    async fn reply(&self, response: Envelope) -> AdapterResult<()> {
        self.coordinator.reply(self, response).await
    }
}

#[async_trait]
impl EphemeralTransport for MemoryAdapter {
    async fn declare_reply_destination(
        &self,
        destination: &str,
        listener: ReplyListener,
    ) -> AdapterResult<()> {
        self.establish().await?;
        if let Err(error) = self.broker.declare_ephemeral(destination) {
            return Err(self.broker_failure(error).await);
        }

        let broker = self.broker.clone();
        let destination = destination.to_string();
        tokio::spawn(async move {
            match broker.pop_wait(&destination, None).await {
                Ok(Some(mut reply)) => {
                    reply.mark_received();
                    listener.deliver(reply);
                }
                Ok(None) => {}
                Err(e) => log::trace!("Reply listener on '{}' ended: {}", destination, e),
            }
        });
        Ok(())
    }

    fn release_reply_destination(&self, destination: &str) {
        self.broker.delete_queue(destination);
    }

    async fn send_request(&self, request: Envelope) -> AdapterResult<Envelope> {
        self.send(request).await
    }

    async fn publish_reply(&self, destination: &str, reply: Envelope) -> AdapterResult<()> {
        self.publish_to(destination, reply).await.map(|_| ())
    }
}

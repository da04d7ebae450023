use crate::adapter::{AdapterError, AdapterResult};
use crate::core::sync::handle_mutex_poison;
use crate::message::Envelope;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::Instant;

type PendingSlots = Arc<Mutex<HashMap<String, oneshot::Sender<Envelope>>>>;

/// Broker operations the coordinator needs from an adapter
#[async_trait]
pub trait EphemeralTransport: Send + Sync {
    /// Declare `destination` and deliver the first message arriving there to `listener`
    async fn declare_reply_destination(
        &self,
        destination: &str,
        listener: ReplyListener,
    ) -> AdapterResult<()>;

    /// Tear down `destination`. Must not fail and must not block.
    fn release_reply_destination(&self, destination: &str);

    /// Publish the request on the adapter's own queue
    async fn send_request(&self, request: Envelope) -> AdapterResult<Envelope>;

    /// Publish a reply to an arbitrary destination
    async fn publish_reply(&self, destination: &str, reply: Envelope) -> AdapterResult<()>;
}

/// Completion hook handed to the transport for one reply destination
#[derive(Debug, Clone)]
pub struct ReplyListener {
    pub(super) destination: String,
    pub(super) pending: PendingSlots,
}

impl ReplyListener {
    pub fn destination(&self) -> &str {
        &self.destination
    }

    /// Fulfil the waiting request. Only the first delivery counts.
    pub fn deliver(&self, reply: Envelope) -> bool {
        let slot = match self.pending.lock() {
            Ok(mut pending) => pending.remove(&self.destination),
            Err(poisoned) => poisoned.into_inner().remove(&self.destination),
        };
        match slot {
            Some(sender) => sender.send(reply).is_ok(),
            None => {
                log::debug!(
                    "Dropping late reply on '{}': nobody is waiting",
                    self.destination
                );
                false
            }
        }
    }
}

/// Removes the pending slot and releases the destination on drop
struct PendingGuard<'a, T: EphemeralTransport + ?Sized> {
    destination: String,
    pending: PendingSlots,
    transport: &'a T,
    declared: bool,
}

impl<T: EphemeralTransport + ?Sized> Drop for PendingGuard<'_, T> {
    fn drop(&mut self) {
        match self.pending.lock() {
            Ok(mut pending) => pending.remove(&self.destination),
            Err(poisoned) => poisoned.into_inner().remove(&self.destination),
        };
        if self.declared {
            self.transport.release_reply_destination(&self.destination);
        }
        log::trace!("Released reply destination '{}'", self.destination);
    }
}

/// Pending-request bookkeeping for one queue
#[derive(Debug)]
pub struct RequestReplyCoordinator {
    queue_id: String,
    reply_timeout: Duration,
    pending: PendingSlots,
}

impl RequestReplyCoordinator {
    pub fn new(queue_id: impl Into<String>, reply_timeout: Duration) -> Self {
        Self {
            queue_id: queue_id.into(),
            reply_timeout,
            pending: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn reply_timeout(&self) -> Duration {
        self.reply_timeout
    }

    /// Requests currently waiting for a reply
    pub fn pending_count(&self) -> usize {
        match self.pending.lock() {
            Ok(pending) => pending.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    fn ephemeral_destination(&self) -> String {
        format!("{}.reply.{}", self.queue_id, uuid::Uuid::new_v4())
    }

    /// Send `request` and wait for the single reply addressed to it
    pub async fn request_and_wait_response<T>(
        &self,
        transport: &T,
        mut request: Envelope,
    ) -> AdapterResult<Envelope>
    where
        T: EphemeralTransport + ?Sized,
    {
        let destination = self.ephemeral_destination();
        request.reply_destination = Some(destination.clone());
        request.lifetime = Some(self.reply_timeout);

        let (sender, receiver) = oneshot::channel();
        let mut guard = PendingGuard {
            destination: destination.clone(),
            pending: self.pending.clone(),
            transport,
            declared: false,
        };
        {
            let mut pending = handle_mutex_poison(self.pending.lock(), |message| {
                AdapterError::Transport {
                    queue_id: self.queue_id.clone(),
                    message,
                }
            })?;
            pending.insert(destination.clone(), sender);
        }

        let listener = ReplyListener {
            destination: destination.clone(),
            pending: self.pending.clone(),
        };
        transport
            .declare_reply_destination(&destination, listener)
            .await?;
        guard.declared = true;

        let deadline = Instant::now() + self.reply_timeout;
        let sent = transport.send_request(request).await?;
        log::debug!(
            "Request {} on '{}' waiting for reply on '{}'",
            sent.correlation_id().unwrap_or("-"),
            self.queue_id,
            destination
        );

        let outcome = tokio::time::timeout_at(deadline, receiver).await;
        drop(guard);

        match outcome {
            Ok(Ok(mut reply)) => {
                // The ephemeral destination is already released
                reply.reply_destination = None;
                Ok(reply)
            }
            Ok(Err(_)) => Err(AdapterError::Transport {
                queue_id: self.queue_id.clone(),
                message: format!("reply slot for '{}' closed without a reply", destination),
            }),
            Err(_) => {
                log::warn!(
                    "No reply on '{}' within {:?}",
                    destination,
                    self.reply_timeout
                );
                Err(AdapterError::ReplyTimeout {
                    destination,
                    timeout: self.reply_timeout,
                })
            }
        }
    }

    /// Publish `response` to its reply destination
    ///
    /// Needs no knowledge of pending requests; the correlation id on the
    /// response is passed through unchanged. The destination is consumed and
    /// not carried on the published reply.
    pub async fn reply<T>(&self, transport: &T, mut response: Envelope) -> AdapterResult<()>
    where
        T: EphemeralTransport + ?Sized,
    {
        let destination = match response.reply_destination.take() {
            Some(destination) if !destination.is_empty() => destination,
            _ => {
                return Err(AdapterError::SendFailure {
                    destination: self.queue_id.clone(),
                    message: "reply has no reply destination".to_string(),
                })
            }
        };
        transport.publish_reply(&destination, response).await
    }
}

//! In-process point-to-point broker
//!
//! Each named queue keeps messages in a sequence-ordered buffer. A message is
//! handed to exactly one receiver. Waiting receivers park on a per-queue
//! `Notify` and are woken by publishes and by queue deletion.

use crate::core::sync::{handle_rwlock_read, handle_rwlock_write, handle_mutex_poison};
use crate::message::Envelope;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;

/// Default bound on messages held by a single queue
pub const DEFAULT_MAX_QUEUE_SIZE: usize = 10_000;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BrokerError {
    #[error("Broker is unavailable")]
    Unavailable,

    #[error("Queue '{name}' does not exist")]
    NoSuchQueue { name: String },

    #[error("Queue '{name}' already exists")]
    QueueExists { name: String },

    #[error("Queue '{name}' is full (max size: {max_size})")]
    QueueFull { name: String, max_size: usize },

    #[error("Broker state lock poisoned: {message}")]
    LockPoisoned { message: String },
}

pub type BrokerResult<T> = Result<T, BrokerError>;

/// A message taken from a queue together with its broker sequence number
///
/// Handing a `Delivery` back through [`MemoryBroker::requeue_front`] keeps
/// the original sequence for redelivery.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub sequence: u64,
    pub message: Envelope,
}

#[derive(Debug)]
struct MemoryQueue {
    name: String,
    ephemeral: bool,
    state: Mutex<QueueState>,
    notify: Notify,
    deleted: AtomicBool,
}

#[derive(Debug)]
struct QueueState {
    next_sequence: u64,
    entries: VecDeque<Delivery>,
}

impl MemoryQueue {
    fn new(name: &str, ephemeral: bool) -> Self {
        Self {
            name: name.to_string(),
            ephemeral,
            state: Mutex::new(QueueState {
                next_sequence: 1,
                entries: VecDeque::new(),
            }),
            notify: Notify::new(),
            deleted: AtomicBool::new(false),
        }
    }

    fn lock(&self) -> BrokerResult<std::sync::MutexGuard<'_, QueueState>> {
        handle_mutex_poison(self.state.lock(), |message| BrokerError::LockPoisoned {
            message,
        })
    }

    fn is_deleted(&self) -> bool {
        self.deleted.load(Ordering::Acquire)
    }
}

#[derive(Debug)]
struct BrokerInner {
    queues: RwLock<HashMap<String, Arc<MemoryQueue>>>,
    available: AtomicBool,
    max_queue_size: usize,
}

/// Cloneable handle to a shared in-memory broker
#[derive(Debug, Clone)]
pub struct MemoryBroker {
    inner: Arc<BrokerInner>,
}

impl Default for MemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self::with_max_queue_size(DEFAULT_MAX_QUEUE_SIZE)
    }

    pub fn with_max_queue_size(max_queue_size: usize) -> Self {
        Self {
            inner: Arc::new(BrokerInner {
                queues: RwLock::new(HashMap::new()),
                available: AtomicBool::new(true),
                max_queue_size,
            }),
        }
    }

    /// Simulate an outage (`false`) or recovery (`true`)
    pub fn set_available(&self, available: bool) {
        self.inner.available.store(available, Ordering::Release);
        if !available {
            // Wake parked receivers so they observe the outage.
            if let Ok(queues) = self.inner.queues.read() {
                for queue in queues.values() {
                    queue.notify.notify_waiters();
                }
            }
        }
        log::debug!("Memory broker available: {}", available);
    }

    pub fn is_available(&self) -> bool {
        self.inner.available.load(Ordering::Acquire)
    }

    fn ensure_available(&self) -> BrokerResult<()> {
        if self.is_available() {
            Ok(())
        } else {
            Err(BrokerError::Unavailable)
        }
    }

    fn queue(&self, name: &str) -> BrokerResult<Arc<MemoryQueue>> {
        let queues = handle_rwlock_read(self.inner.queues.read(), |message| {
            BrokerError::LockPoisoned { message }
        })?;
        queues
            .get(name)
            .cloned()
            .ok_or_else(|| BrokerError::NoSuchQueue {
                name: name.to_string(),
            })
    }

    /// Get-or-create a durable queue
    pub fn declare_queue(&self, name: &str) -> BrokerResult<()> {
        self.ensure_available()?;
        let mut queues = handle_rwlock_write(self.inner.queues.write(), |message| {
            BrokerError::LockPoisoned { message }
        })?;
        queues
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(MemoryQueue::new(name, false)));
        Ok(())
    }

    /// Create a short-lived queue; fails if the name is taken
    pub fn declare_ephemeral(&self, name: &str) -> BrokerResult<()> {
        self.ensure_available()?;
        let mut queues = handle_rwlock_write(self.inner.queues.write(), |message| {
            BrokerError::LockPoisoned { message }
        })?;
        if queues.contains_key(name) {
            return Err(BrokerError::QueueExists {
                name: name.to_string(),
            });
        }
        queues.insert(name.to_string(), Arc::new(MemoryQueue::new(name, true)));
        log::trace!("Declared ephemeral queue '{}'", name);
        Ok(())
    }

    /// Remove a queue and wake anything waiting on it
    pub fn delete_queue(&self, name: &str) -> bool {
        let removed = match self.inner.queues.write() {
            Ok(mut queues) => queues.remove(name),
            Err(poisoned) => poisoned.into_inner().remove(name),
        };
        match removed {
            Some(queue) => {
                queue.deleted.store(true, Ordering::Release);
                queue.notify.notify_waiters();
                log::trace!(
                    "Deleted {} queue '{}'",
                    if queue.ephemeral { "ephemeral" } else { "durable" },
                    queue.name
                );
                true
            }
            None => false,
        }
    }

    pub fn has_queue(&self, name: &str) -> bool {
        self.queue(name).is_ok()
    }

    /// Names of all ephemeral queues currently declared
    pub fn ephemeral_queues(&self) -> Vec<String> {
        match self.inner.queues.read() {
            Ok(queues) => {
                let mut names: Vec<String> = queues
                    .values()
                    .filter(|q| q.ephemeral)
                    .map(|q| q.name.clone())
                    .collect();
                names.sort();
                names
            }
            Err(_) => Vec::new(),
        }
    }

    /// Messages currently held by a queue (0 for unknown queues)
    pub fn depth(&self, name: &str) -> usize {
        self.queue(name)
            .ok()
            .and_then(|q| q.lock().ok().map(|state| state.entries.len()))
            .unwrap_or(0)
    }

    /// Append a message, returning its sequence number
    pub fn publish(&self, name: &str, message: Envelope) -> BrokerResult<u64> {
        self.ensure_available()?;
        let queue = self.queue(name)?;
        let sequence = {
            let mut state = queue.lock()?;
            if state.entries.len() >= self.inner.max_queue_size {
                return Err(BrokerError::QueueFull {
                    name: name.to_string(),
                    max_size: self.inner.max_queue_size,
                });
            }
            let sequence = state.next_sequence;
            state.next_sequence += 1;
            state.entries.push_back(Delivery { sequence, message });
            sequence
        };
        queue.notify.notify_one();
        log::trace!("Published #{} to '{}'", sequence, name);
        Ok(sequence)
    }

    /// Put a taken message back at the head of the queue for redelivery
    pub fn requeue_front(&self, name: &str, delivery: Delivery) -> BrokerResult<()> {
        let queue = self.queue(name)?;
        let sequence = delivery.sequence;
        queue.lock()?.entries.push_front(delivery);
        queue.notify.notify_one();
        log::trace!("Requeued #{} on '{}'", sequence, name);
        Ok(())
    }

    /// Take the next live message without waiting
    ///
    /// Expired messages at the head are discarded.
    pub fn try_pop(&self, name: &str) -> BrokerResult<Option<Envelope>> {
        Ok(self.try_take(name)?.map(|delivery| delivery.message))
    }

    /// [`try_pop`](Self::try_pop) keeping the sequence number
    pub fn try_take(&self, name: &str) -> BrokerResult<Option<Delivery>> {
        self.ensure_available()?;
        let queue = self.queue(name)?;
        Self::pop_live(&queue)
    }

    fn pop_live(queue: &MemoryQueue) -> BrokerResult<Option<Delivery>> {
        let mut state = queue.lock()?;
        while let Some(entry) = state.entries.pop_front() {
            if entry.message.is_expired() {
                log::debug!(
                    "Discarding expired message #{} on '{}'",
                    entry.sequence,
                    queue.name
                );
                continue;
            }
            return Ok(Some(entry));
        }
        Ok(None)
    }

    /// Take the next message, waiting up to `timeout` (forever when `None`)
    ///
    /// Returns `Ok(None)` on timeout. Deleting the queue or losing the broker
    /// while waiting ends the wait with an error.
    pub async fn pop_wait(
        &self,
        name: &str,
        timeout: Option<Duration>,
    ) -> BrokerResult<Option<Envelope>> {
        Ok(self
            .take_wait(name, timeout)
            .await?
            .map(|delivery| delivery.message))
    }

    /// [`pop_wait`](Self::pop_wait) keeping the sequence number
    pub async fn take_wait(
        &self,
        name: &str,
        timeout: Option<Duration>,
    ) -> BrokerResult<Option<Delivery>> {
        let queue = self.queue(name)?;
        let deadline = timeout.map(|t| Instant::now() + t);

        loop {
            let notified = queue.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if queue.is_deleted() {
                return Err(BrokerError::NoSuchQueue {
                    name: name.to_string(),
                });
            }
            self.ensure_available()?;
            if let Some(delivery) = Self::pop_live(&queue)? {
                return Ok(Some(delivery));
            }

            match deadline {
                Some(deadline) => {
                    if tokio::time::timeout_at(deadline, notified).await.is_err() {
                        return Ok(None);
                    }
                }
                None => notified.await,
            }
        }
    }
}

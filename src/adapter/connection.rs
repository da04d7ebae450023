//! Shared connection state machine for adapters
//!
//! All connect and disconnect transitions go through one async mutex. The
//! open flag is an atomic so `is_connected` stays a cheap synchronous read,
//! but it is only ever written while the mutex is held.

use crate::adapter::error::AdapterResult;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::Mutex;

#[derive(Debug)]
pub struct ConnectionGuard {
    queue_id: String,
    transition: Mutex<()>,
    open: AtomicBool,
    connects: AtomicU64,
}

impl ConnectionGuard {
    pub fn new(queue_id: impl Into<String>) -> Self {
        Self {
            queue_id: queue_id.into(),
            transition: Mutex::new(()),
            open: AtomicBool::new(false),
            connects: AtomicU64::new(0),
        }
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Number of underlying connects performed so far
    pub fn connect_count(&self) -> u64 {
        self.connects.load(Ordering::Relaxed)
    }

    /// Run `connect` unless already open. Returns whether a connect happened.
    ///
    /// A failing `connect` leaves the guard closed; cleaning up partial
    /// transport state is the closure's job.
    pub async fn open<F, Fut>(&self, connect: F) -> AdapterResult<bool>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = AdapterResult<()>>,
    {
        let _transition = self.transition.lock().await;
        if self.open.load(Ordering::Acquire) {
            return Ok(false);
        }

        connect().await?;
        self.open.store(true, Ordering::Release);
        let count = self.connects.fetch_add(1, Ordering::Relaxed) + 1;
        log::debug!("Queue '{}' connected (connect #{})", self.queue_id, count);
        Ok(true)
    }

    /// Run `disconnect` if open. Returns whether anything was closed.
    pub async fn close<F, Fut>(&self, disconnect: F) -> AdapterResult<bool>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = AdapterResult<()>>,
    {
        let _transition = self.transition.lock().await;
        if !self.open.load(Ordering::Acquire) {
            return Ok(false);
        }

        // The connection counts as closed even when teardown reports an error.
        self.open.store(false, Ordering::Release);
        disconnect().await?;
        log::debug!("Queue '{}' disconnected", self.queue_id);
        Ok(true)
    }

    /// Fast path when open, otherwise a serialized reconnect
    ///
    /// Concurrent callers against a closed connection queue up on the mutex;
    /// the first one connects and the rest find it open.
    pub async fn check_and_reconnect<F, Fut>(&self, connect: F) -> AdapterResult<()>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = AdapterResult<()>>,
    {
        if self.is_open() {
            return Ok(());
        }
        if self.open(connect).await? {
            log::info!("Queue '{}' reconnected", self.queue_id);
        }
        Ok(())
    }

    /// Record a connection dropped by the transport
    pub async fn mark_lost(&self) {
        let _transition = self.transition.lock().await;
        if self.open.swap(false, Ordering::AcqRel) {
            log::warn!("Queue '{}' lost its connection", self.queue_id);
        }
    }
}

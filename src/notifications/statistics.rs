//! Per-subscriber delivery statistics

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;
use std::time::Instant;

pub struct SubscriberStatistics {
    events_delivered: AtomicUsize,
    last_delivery_time: RwLock<Option<Instant>>,
}

impl Default for SubscriberStatistics {
    fn default() -> Self {
        Self::new()
    }
}

impl SubscriberStatistics {
    pub fn new() -> Self {
        Self {
            events_delivered: AtomicUsize::new(0),
            last_delivery_time: RwLock::new(None),
        }
    }

    pub fn events_delivered(&self) -> usize {
        self.events_delivered.load(Ordering::Relaxed)
    }

    pub fn record_delivery(&self) {
        self.events_delivered.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut time) = self.last_delivery_time.write() {
            *time = Some(Instant::now());
        }
    }

    pub fn last_delivery_time(&self) -> Option<Instant> {
        *self.last_delivery_time.read().ok()?
    }
}

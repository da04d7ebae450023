//! AsyncNotificationManager implementation

use crate::core::sync::handle_mutex_poison;
use crate::notifications::error::NotificationError;
use crate::notifications::event::{Event, EventFilter};
use crate::notifications::statistics::SubscriberStatistics;
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

struct SubscriberInfo {
    filter: EventFilter,
    source: String,
    sender: UnboundedSender<Event>,
    statistics: SubscriberStatistics,
}

/// Fan-out of events to filtered subscribers
///
/// Shared behind an `Arc` by whoever publishes. Delivery never blocks: each
/// subscriber gets an unbounded channel, and subscribers whose receiver has
/// been dropped are removed on the next publish.
#[derive(Default)]
pub struct AsyncNotificationManager {
    subscribers: Mutex<HashMap<String, SubscriberInfo>>,
}

impl std::fmt::Debug for AsyncNotificationManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncNotificationManager")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

impl AsyncNotificationManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(
        &self,
        subscriber_id: String,
        filter: EventFilter,
        source: String,
    ) -> Result<UnboundedReceiver<Event>, NotificationError> {
        let (sender, receiver) = unbounded_channel();

        let subscriber_info = SubscriberInfo {
            filter,
            source: source.clone(),
            sender,
            statistics: SubscriberStatistics::new(),
        };

        let mut subscribers = handle_mutex_poison(self.subscribers.lock(), |message| {
            NotificationError::LockPoisoned { message }
        })?;
        if let Some(existing) = subscribers.insert(subscriber_id.clone(), subscriber_info) {
            log::warn!(
                "Subscriber '{}' replaced existing subscription (source: {} -> {})",
                subscriber_id,
                existing.source,
                source
            );
        }

        Ok(receiver)
    }

    pub fn unsubscribe(&self, subscriber_id: &str) -> bool {
        self.subscribers
            .lock()
            .map(|mut s| s.remove(subscriber_id).is_some())
            .unwrap_or(false)
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn has_subscriber(&self, subscriber_id: &str) -> bool {
        self.subscribers
            .lock()
            .map(|s| s.contains_key(subscriber_id))
            .unwrap_or(false)
    }

    /// Events delivered so far to one subscriber
    pub fn delivered_count(&self, subscriber_id: &str) -> Option<usize> {
        self.subscribers
            .lock()
            .ok()?
            .get(subscriber_id)
            .map(|info| info.statistics.events_delivered())
    }

    /// Deliver `event` to every subscriber whose filter accepts it
    ///
    /// Subscribers with closed channels are pruned and reported in the error;
    /// delivery to the others still happens.
    pub fn publish(&self, event: Event) -> Result<(), NotificationError> {
        let mut subscribers = handle_mutex_poison(self.subscribers.lock(), |message| {
            NotificationError::LockPoisoned { message }
        })?;

        let mut failed_subscribers = Vec::new();
        for (subscriber_id, subscriber_info) in subscribers.iter() {
            if !subscriber_info.filter.accepts(&event) {
                continue;
            }
            match subscriber_info.sender.send(event.clone()) {
                Ok(()) => subscriber_info.statistics.record_delivery(),
                Err(_) => failed_subscribers.push(subscriber_id.clone()),
            }
        }

        for subscriber_id in &failed_subscribers {
            subscribers.remove(subscriber_id);
            log::trace!("Pruned closed subscriber '{}'", subscriber_id);
        }

        if !failed_subscribers.is_empty() {
            return Err(NotificationError::PublishFailed {
                event_type: event.kind_name().to_string(),
                failed_subscribers,
            });
        }

        Ok(())
    }
}

//! Processor invocation shared by every reactor
//!
//! Errors and panics raised by a processor stop here. They are counted,
//! logged at warn and published as `HandlerFailed`; nothing propagates into
//! the receive loop or the adapter's transport task.

use crate::adapter::QueueAdapter;
use crate::message::Envelope;
use crate::notifications::{AsyncNotificationManager, Event, ReactorEvent, ReactorEventType};
use crate::processor::{HandlerResult, Processor};
use crate::reactor::error::HandlerFailure;
use crate::reactor::kind::ReactorKind;
use crate::reactor::statistics::ReactorStatistics;
use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

pub(crate) struct Dispatcher {
    queue_id: String,
    kind: ReactorKind,
    statistics: Arc<ReactorStatistics>,
    notifications: Option<Arc<AsyncNotificationManager>>,
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

async fn guarded<T, Fut>(future: Fut) -> Result<T, HandlerFailure>
where
    Fut: Future<Output = HandlerResult<T>>,
{
    match AssertUnwindSafe(future).catch_unwind().await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(error)) => Err(HandlerFailure::Error {
            message: error.to_string(),
        }),
        Err(payload) => Err(HandlerFailure::Panicked {
            message: panic_message(payload.as_ref()),
        }),
    }
}

impl Dispatcher {
    pub(crate) fn new(
        queue_id: &str,
        kind: ReactorKind,
        notifications: Option<Arc<AsyncNotificationManager>>,
    ) -> Self {
        Self {
            queue_id: queue_id.to_string(),
            kind,
            statistics: Arc::new(ReactorStatistics::new()),
            notifications,
        }
    }

    pub(crate) fn statistics(&self) -> &ReactorStatistics {
        &self.statistics
    }

    pub(crate) fn publish(&self, event_type: ReactorEventType, message: Option<String>) {
        let Some(notifications) = &self.notifications else {
            return;
        };
        let event = match message {
            Some(message) => ReactorEvent::with_message(
                event_type,
                self.queue_id.clone(),
                self.kind,
                message,
            ),
            None => ReactorEvent::new(event_type, self.queue_id.clone(), self.kind),
        };
        if let Err(e) = notifications.publish(Event::Reactor(event)) {
            log::trace!("Queue '{}' event delivery incomplete: {}", self.queue_id, e);
        }
    }

    /// Run the processor for one message, routing replies for reply processors
    pub(crate) async fn dispatch(
        &self,
        adapter: &dyn QueueAdapter,
        processor: &Processor,
        message: Envelope,
    ) -> Result<(), HandlerFailure> {
        self.statistics.record_received();
        let message_id = message.id().unwrap_or("-").to_string();
        log::debug!(
            "Queue '{}' dispatching {} to {} processor",
            self.queue_id,
            message_id,
            processor.kind()
        );

        match processor {
            Processor::Consume(handler) => {
                let outcome = guarded(handler.handle(message)).await;
                self.settle(&message_id, outcome)
            }
            Processor::Reply(handler) => {
                let reply_destination = message.reply_destination.clone();
                let correlation_id = message.correlation_id().map(str::to_string);
                let outcome = guarded(handler.handle(message)).await;
                let response = self.settle(&message_id, outcome)?;
                self.route_reply(adapter, reply_destination, correlation_id, response)
                    .await;
                Ok(())
            }
        }
    }

    fn settle<T>(
        &self,
        message_id: &str,
        outcome: Result<T, HandlerFailure>,
    ) -> Result<T, HandlerFailure> {
        match outcome {
            Ok(value) => {
                self.statistics.record_processed();
                log::trace!("Queue '{}' processed {}", self.queue_id, message_id);
                Ok(value)
            }
            Err(failure) => {
                self.statistics.record_failed();
                log::warn!(
                    "Queue '{}' {} reactor: message {}: {}",
                    self.queue_id,
                    self.kind,
                    message_id,
                    failure
                );
                self.publish(ReactorEventType::HandlerFailed, Some(failure.to_string()));
                Err(failure)
            }
        }
    }

    fn suppress_reply(&self, reason: String) {
        self.statistics.record_reply_suppressed();
        log::warn!("Queue '{}' reply not sent: {}", self.queue_id, reason);
        self.publish(ReactorEventType::ReplySuppressed, Some(reason));
    }

    async fn route_reply(
        &self,
        adapter: &dyn QueueAdapter,
        reply_destination: Option<String>,
        correlation_id: Option<String>,
        mut response: Envelope,
    ) {
        let Some(destination) = reply_destination.filter(|d| !d.is_empty()) else {
            self.suppress_reply("inbound message has no reply destination".to_string());
            return;
        };
        let Some(duplex) = adapter.as_duplex() else {
            self.suppress_reply(format!(
                "adapter cannot reply to '{}' (no duplex capability)",
                destination
            ));
            return;
        };

        response.reply_destination = Some(destination.clone());
        if let Some(correlation_id) = correlation_id {
            response.set_correlation_id(correlation_id);
        }

        match duplex.reply(response).await {
            Ok(()) => {
                self.statistics.record_reply_sent();
                log::trace!("Queue '{}' replied to '{}'", self.queue_id, destination);
            }
            Err(e) => self.suppress_reply(e.to_string()),
        }
    }
}

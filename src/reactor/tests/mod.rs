//! Test modules for the reactor layer
//!
//! Every suite runs reactors against the in-memory broker.

mod lifecycle;
mod subscribed;

use crate::adapter::{Capabilities, MemoryAdapter, MemoryBroker, QueueAdapter};
use crate::config::{BrokerFamily, ProcessingMode, QueueEndpoint};
use crate::message::Envelope;
use crate::processor::Processor;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

pub(super) const WAIT: Duration = Duration::from_secs(2);

pub(super) fn endpoint(id: &str, mode: ProcessingMode) -> QueueEndpoint {
    QueueEndpoint::new(id, BrokerFamily::Memory, mode)
        .with_poll_interval(Duration::from_millis(20))
        .with_reply_timeout(Duration::from_secs(2))
}

pub(super) fn adapter(
    broker: &MemoryBroker,
    mode: ProcessingMode,
    capabilities: Capabilities,
) -> Arc<dyn QueueAdapter> {
    Arc::new(MemoryAdapter::new(
        endpoint("orders", mode),
        broker.clone(),
        capabilities,
    ))
}

/// Consume processor forwarding each message's text to a channel
pub(super) fn forwarding_processor() -> (Processor, mpsc::UnboundedReceiver<String>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let processor = Processor::consume_fn(move |message: Envelope| {
        let tx = tx.clone();
        async move {
            let text = message.payload.as_text().unwrap_or_default().to_string();
            let _ = tx.send(text);
            Ok(())
        }
    });
    (processor, rx)
}

pub(super) async fn next(rx: &mut mpsc::UnboundedReceiver<String>) -> String {
    tokio::time::timeout(WAIT, rx.recv())
        .await
        .expect("timed out waiting for delivery")
        .expect("processor channel closed")
}

/// Poll `condition` until it holds or the wait expires
pub(super) async fn eventually(mut condition: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + WAIT;
    while !condition() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not met in time"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

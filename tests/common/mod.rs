//! Shared helpers for integration tests

#![allow(dead_code)]

use queuebridge::adapter::{AdapterRegistry, MemoryBroker, MemoryProvider};
use queuebridge::config::{BrokerFamily, EndpointSet, ProcessingMode, QueueEndpoint};
use queuebridge::message::Envelope;
use queuebridge::processor::{Processor, ProcessorRegistry};
use queuebridge::reactor::ReactorFactory;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

pub const WAIT: Duration = Duration::from_secs(2);

/// Memory endpoint with a short poll interval
pub fn endpoint(id: &str, mode: ProcessingMode) -> QueueEndpoint {
    QueueEndpoint::new(id, BrokerFamily::Memory, mode).with_poll_interval(Duration::from_millis(20))
}

/// Factory backed by a memory provider on `broker`
pub fn factory(broker: &MemoryBroker, endpoints: Vec<QueueEndpoint>) -> ReactorFactory {
    let mut adapters = AdapterRegistry::new();
    adapters
        .register(Arc::new(MemoryProvider::new(broker.clone())))
        .expect("memory provider registers once");
    ReactorFactory::new(
        Arc::new(ProcessorRegistry::new()),
        Arc::new(adapters),
        Arc::new(EndpointSet::from_endpoints(endpoints).expect("valid endpoints")),
    )
}

/// Consume processor that forwards every received envelope
pub fn recording_processor() -> (Processor, mpsc::UnboundedReceiver<Envelope>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let processor = Processor::consume_fn(move |message: Envelope| {
        let tx = tx.clone();
        async move {
            let _ = tx.send(message);
            Ok(())
        }
    });
    (processor, rx)
}

pub async fn next_message(rx: &mut mpsc::UnboundedReceiver<Envelope>) -> Envelope {
    tokio::time::timeout(WAIT, rx.recv())
        .await
        .expect("timed out waiting for delivery")
        .expect("processor channel closed")
}

/// True if nothing arrives within `window`
pub async fn stays_quiet(rx: &mut mpsc::UnboundedReceiver<Envelope>, window: Duration) -> bool {
    tokio::time::timeout(window, rx.recv()).await.is_err()
}

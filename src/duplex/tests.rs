//! Tests for the request/reply coordinator against a scripted transport

use super::*;
use crate::adapter::{AdapterError, AdapterResult};
use crate::message::Envelope;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Clone, Copy, PartialEq)]
enum Script {
    Echo,
    Silent,
    FailSend,
    FailDeclare,
}

struct ScriptedTransport {
    script: Script,
    listeners: Mutex<HashMap<String, ReplyListener>>,
    declared: AtomicUsize,
    released: AtomicUsize,
    published: Mutex<Vec<(String, Envelope)>>,
}

impl ScriptedTransport {
    fn new(script: Script) -> Self {
        Self {
            script,
            listeners: Mutex::new(HashMap::new()),
            declared: AtomicUsize::new(0),
            released: AtomicUsize::new(0),
            published: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl EphemeralTransport for ScriptedTransport {
    async fn declare_reply_destination(
        &self,
        destination: &str,
        listener: ReplyListener,
    ) -> AdapterResult<()> {
        if self.script == Script::FailDeclare {
            return Err(AdapterError::ConnectionFailure {
                queue_id: "orders".to_string(),
                message: "channel closed".to_string(),
            });
        }
        self.declared.fetch_add(1, Ordering::SeqCst);
        self.listeners
            .lock()
            .unwrap()
            .insert(destination.to_string(), listener);
        Ok(())
    }

    fn release_reply_destination(&self, destination: &str) {
        self.released.fetch_add(1, Ordering::SeqCst);
        self.listeners.lock().unwrap().remove(destination);
    }

    async fn send_request(&self, mut request: Envelope) -> AdapterResult<Envelope> {
        if self.script == Script::FailSend {
            return Err(AdapterError::SendFailure {
                destination: "orders".to_string(),
                message: "broker rejected message".to_string(),
            });
        }
        request.mark_sent();
        if self.script == Script::Echo {
            let destination = request.reply_destination.clone().unwrap();
            let listener = self.listeners.lock().unwrap().get(&destination).cloned();
            // Echo the destination back the way a reply on the wire would carry it
            let reply = request
                .reply_with("pong")
                .with_reply_destination(destination.clone());
            if let Some(listener) = listener {
                tokio::spawn(async move {
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    listener.deliver(reply);
                });
            }
        }
        Ok(request)
    }

    async fn publish_reply(&self, destination: &str, reply: Envelope) -> AdapterResult<()> {
        self.published
            .lock()
            .unwrap()
            .push((destination.to_string(), reply));
        Ok(())
    }
}

#[tokio::test]
async fn test_round_trip_preserves_correlation_id() {
    let coordinator = RequestReplyCoordinator::new("orders", Duration::from_secs(2));
    let transport = ScriptedTransport::new(Script::Echo);

    let reply = coordinator
        .request_and_wait_response(&transport, Envelope::text("ping").with_correlation_id("X"))
        .await
        .unwrap();

    assert_eq!(reply.correlation_id(), Some("X"));
    assert_eq!(reply.payload.as_text(), Some("pong"));
    assert_eq!(reply.reply_destination, None);
    assert_eq!(coordinator.pending_count(), 0);
    assert_eq!(transport.declared.load(Ordering::SeqCst), 1);
    assert_eq!(transport.released.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_timeout_releases_destination_once() {
    let coordinator = RequestReplyCoordinator::new("orders", Duration::from_millis(200));
    let transport = ScriptedTransport::new(Script::Silent);

    let started = std::time::Instant::now();
    let result = coordinator
        .request_and_wait_response(&transport, Envelope::text("ping"))
        .await;

    assert!(started.elapsed() >= Duration::from_millis(200));
    match result {
        Err(AdapterError::ReplyTimeout {
            destination,
            timeout,
        }) => {
            assert!(destination.starts_with("orders.reply."));
            assert_eq!(timeout, Duration::from_millis(200));
        }
        other => panic!("expected timeout, got {:?}", other),
    }
    assert_eq!(coordinator.pending_count(), 0);
    assert_eq!(transport.released.load(Ordering::SeqCst), 1);
    assert!(transport.listeners.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_send_failure_cleans_up() {
    let coordinator = RequestReplyCoordinator::new("orders", Duration::from_secs(1));
    let transport = ScriptedTransport::new(Script::FailSend);

    let result = coordinator
        .request_and_wait_response(&transport, Envelope::text("ping"))
        .await;

    assert!(matches!(result, Err(AdapterError::SendFailure { .. })));
    assert_eq!(coordinator.pending_count(), 0);
    assert_eq!(transport.released.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_failed_declare_releases_nothing() {
    let coordinator = RequestReplyCoordinator::new("orders", Duration::from_secs(1));
    let transport = ScriptedTransport::new(Script::FailDeclare);

    let result = coordinator
        .request_and_wait_response(&transport, Envelope::text("ping"))
        .await;

    assert!(matches!(result, Err(AdapterError::ConnectionFailure { .. })));
    assert_eq!(coordinator.pending_count(), 0);
    assert_eq!(transport.released.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_cancelled_caller_cleans_up() {
    let coordinator = Arc::new(RequestReplyCoordinator::new("orders", Duration::from_secs(30)));
    let transport = Arc::new(ScriptedTransport::new(Script::Silent));

    let outcome = tokio::time::timeout(
        Duration::from_millis(50),
        coordinator.request_and_wait_response(transport.as_ref(), Envelope::text("ping")),
    )
    .await;

    assert!(outcome.is_err(), "caller gave up first");
    assert_eq!(coordinator.pending_count(), 0);
    assert_eq!(transport.released.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_late_delivery_is_ignored() {
    let coordinator = RequestReplyCoordinator::new("orders", Duration::from_millis(50));
    let transport = ScriptedTransport::new(Script::Silent);

    let _ = coordinator
        .request_and_wait_response(&transport, Envelope::text("ping"))
        .await;

    let stray = ReplyListener {
        destination: "orders.reply.gone".to_string(),
        pending: Arc::new(Mutex::new(HashMap::new())),
    };
    assert!(!stray.deliver(Envelope::text("late")));
}

#[tokio::test]
async fn test_reply_requires_destination() {
    let coordinator = RequestReplyCoordinator::new("orders", Duration::from_secs(1));
    let transport = ScriptedTransport::new(Script::Silent);

    let missing = coordinator
        .reply(&transport, Envelope::text("pong").with_correlation_id("X"))
        .await;
    assert!(matches!(missing, Err(AdapterError::SendFailure { .. })));

    coordinator
        .reply(
            &transport,
            Envelope::text("pong")
                .with_correlation_id("X")
                .with_reply_destination("orders.reply.abc"),
        )
        .await
        .unwrap();

    let published = transport.published.lock().unwrap();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].0, "orders.reply.abc");
    assert_eq!(published[0].1.correlation_id(), Some("X"));
    assert_eq!(published[0].1.reply_destination, None);
}

//! Request/reply over one-way queues, with and without a reactor

mod common;

use common::{endpoint, factory};
use queuebridge::adapter::{
    AdapterError, Capabilities, DuplexReply, MemoryAdapter, MemoryBroker, QueueAdapter,
};
use queuebridge::config::ProcessingMode;
use queuebridge::message::Envelope;
use queuebridge::processor::Processor;
use queuebridge::reactor::{Reactor, ReactorKind};
use std::sync::Arc;
use std::time::{Duration, Instant};

fn duplex_adapter(broker: &MemoryBroker, reply_timeout: Duration) -> Arc<MemoryAdapter> {
    Arc::new(MemoryAdapter::new(
        endpoint("quotes", ProcessingMode::ThreadPolling).with_reply_timeout(reply_timeout),
        broker.clone(),
        Capabilities::NONE.with_duplex(true),
    ))
}

#[tokio::test]
async fn direct_request_reply_preserves_correlation() {
    let broker = MemoryBroker::new();
    let requester = duplex_adapter(&broker, Duration::from_secs(2));
    let responder = duplex_adapter(&broker, Duration::from_secs(2));

    // Hand-rolled responder: receive one request and answer it
    let answer = {
        let responder = responder.clone();
        tokio::spawn(async move {
            let request = responder
                .receive(Some(Duration::from_secs(2)))
                .await
                .unwrap();
            let mut reply = request.reply_with("42.00");
            reply.reply_destination = request.reply_destination.clone();
            responder.reply(reply).await.unwrap();
        })
    };

    let reply = requester
        .request_and_wait_response(Envelope::text("price?").with_correlation_id("X"))
        .await
        .unwrap();
    answer.await.unwrap();

    assert_eq!(reply.correlation_id(), Some("X"));
    assert_eq!(reply.payload.as_text(), Some("42.00"));
    assert_eq!(requester.pending_requests(), 0);
    assert!(broker.ephemeral_queues().is_empty());
}

#[tokio::test]
async fn request_without_responder_times_out_and_cleans_up() {
    let broker = MemoryBroker::new();
    let requester = duplex_adapter(&broker, Duration::from_millis(200));

    let started = Instant::now();
    let err = requester
        .request_and_wait_response(Envelope::text("anyone?"))
        .await
        .unwrap_err();

    assert!(matches!(err, AdapterError::ReplyTimeout { .. }));
    assert!(started.elapsed() >= Duration::from_millis(200));
    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(requester.pending_requests(), 0);
    assert!(broker.ephemeral_queues().is_empty());
}

#[tokio::test]
async fn concurrent_requests_get_their_own_replies() {
    let broker = MemoryBroker::new();
    let factory = factory(
        &broker,
        vec![endpoint("quotes", ProcessingMode::SubscribeAndReply)],
    );
    factory
        .register(
            "quotes",
            Processor::reply_fn(|request: Envelope| async move {
                let text = request.payload.as_text().unwrap_or_default().to_string();
                Ok(request.reply_with(format!("re: {}", text)))
            }),
        )
        .unwrap();

    let mut reactor = factory.create_queue_reactor("quotes").unwrap();
    assert_eq!(reactor.kind(), ReactorKind::SubscribeAndReply);
    reactor.start().await.unwrap();

    let requester = duplex_adapter(&broker, Duration::from_secs(2));
    let mut tasks = Vec::new();
    for i in 0..8 {
        let requester = requester.clone();
        tasks.push(tokio::spawn(async move {
            let reply = requester
                .request_and_wait_response(Envelope::text(format!("q{}", i)))
                .await
                .unwrap();
            (i, reply.payload.as_text().unwrap_or_default().to_string())
        }));
    }
    for task in tasks {
        let (i, text) = task.await.unwrap();
        assert_eq!(text, format!("re: q{}", i));
    }

    reactor.stop().await.unwrap();
    assert_eq!(reactor.statistics().replies_sent, 8);
    assert_eq!(requester.pending_requests(), 0);
    assert!(broker.ephemeral_queues().is_empty());
}

#[tokio::test]
async fn reply_requires_a_destination() {
    let broker = MemoryBroker::new();
    let responder = duplex_adapter(&broker, Duration::from_secs(1));

    assert!(matches!(
        responder.reply(Envelope::text("orphan")).await,
        Err(AdapterError::SendFailure { .. })
    ));
}

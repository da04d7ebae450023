//! Push delivery and subscribe-and-reply

use super::{adapter, endpoint, eventually, forwarding_processor, next};
use crate::adapter::{
    AdapterError, Capabilities, DuplexReply, MemoryAdapter, MemoryBroker, QueueAdapter,
};
use crate::config::{ConfigError, ProcessingMode};
use crate::message::Envelope;
use crate::notifications::{AsyncNotificationManager, Event, EventFilter, ReactorEventType};
use crate::processor::{HandlerError, Processor};
use crate::reactor::{Reactor, ReactorError, ReactorKind, SubscribedReactor};
use std::sync::Arc;
use std::time::Duration;

fn push_adapter(broker: &MemoryBroker, mode: ProcessingMode) -> Arc<dyn QueueAdapter> {
    adapter(
        broker,
        mode,
        Capabilities::NONE.with_subscribing(true).with_duplex(true),
    )
}

/// Separate client adapter on the same queue, used to send requests
fn requester(broker: &MemoryBroker, reply_timeout: Duration) -> MemoryAdapter {
    MemoryAdapter::new(
        endpoint("orders", ProcessingMode::ThreadPolling).with_reply_timeout(reply_timeout),
        broker.clone(),
        Capabilities::NONE.with_duplex(true),
    )
}

fn uppercase_processor() -> Processor {
    Processor::reply_fn(|request: Envelope| async move {
        match request.payload.as_text() {
            Some("fail") => Err(HandlerError::from("cannot answer")),
            text => Ok(request.reply_with(text.unwrap_or_default().to_uppercase())),
        }
    })
}

#[tokio::test]
async fn test_subscribed_pushes_messages() {
    let broker = MemoryBroker::new();
    let (processor, mut rx) = forwarding_processor();
    let mut reactor =
        SubscribedReactor::new(push_adapter(&broker, ProcessingMode::Subscribe), processor, None)
            .unwrap();
    assert_eq!(reactor.kind(), ReactorKind::Subscribed);
    reactor.start().await.unwrap();
    assert!(reactor.adapter().is_connected());

    broker.publish("orders", Envelope::text("a")).unwrap();
    broker.publish("orders", Envelope::text("b")).unwrap();
    assert_eq!(next(&mut rx).await, "a");
    assert_eq!(next(&mut rx).await, "b");

    reactor.stop().await.unwrap();
    assert!(!reactor.adapter().is_connected());

    // Nothing is consumed once stopped
    broker.publish("orders", Envelope::text("late")).unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(broker.depth("orders"), 1);
    assert_eq!(reactor.statistics().processed, 2);
}

#[tokio::test]
async fn test_subscribed_survives_broker_outage() {
    let broker = MemoryBroker::new();
    let (processor, mut rx) = forwarding_processor();
    let mut reactor =
        SubscribedReactor::new(push_adapter(&broker, ProcessingMode::Subscribe), processor, None)
            .unwrap();
    reactor.start().await.unwrap();

    broker.set_available(false);
    tokio::time::sleep(Duration::from_millis(60)).await;
    assert!(!reactor.adapter().is_connected());
    broker.set_available(true);

    broker.publish("orders", Envelope::text("after outage")).unwrap();
    assert_eq!(next(&mut rx).await, "after outage");
    let adapter = reactor.adapter();
    eventually(|| adapter.is_connected()).await;

    reactor.stop().await.unwrap();
    assert!(!reactor.adapter().is_connected());
}

#[tokio::test]
async fn test_subscribed_requires_subscribing_adapter() {
    let broker = MemoryBroker::new();
    let (processor, _rx) = forwarding_processor();
    let result = SubscribedReactor::new(
        adapter(&broker, ProcessingMode::Subscribe, Capabilities::NONE),
        processor,
        None,
    );
    assert!(matches!(
        result,
        Err(ReactorError::Adapter(AdapterError::CapabilityMissing { .. }))
    ));
}

#[tokio::test]
async fn test_push_handler_failure_is_contained() {
    let broker = MemoryBroker::new();
    let notifications = Arc::new(AsyncNotificationManager::new());
    let mut events = notifications
        .subscribe(
            "failures".to_string(),
            EventFilter::ReactorOnly,
            "test".to_string(),
        )
        .unwrap();

    let processor = Processor::consume_fn(|message: Envelope| async move {
        if message.payload.as_text() == Some("boom") {
            panic!("push processor blew up");
        }
        Ok(())
    });
    let mut reactor = SubscribedReactor::new(
        push_adapter(&broker, ProcessingMode::Subscribe),
        processor,
        Some(notifications),
    )
    .unwrap();
    reactor.start().await.unwrap();

    broker.publish("orders", Envelope::text("boom")).unwrap();
    broker.publish("orders", Envelope::text("fine")).unwrap();
    eventually(|| reactor.statistics().received == 2).await;
    eventually(|| reactor.statistics().processed == 1).await;

    assert_eq!(reactor.statistics().failed, 1);
    assert!(reactor.adapter().is_connected());
    reactor.stop().await.unwrap();

    let mut failures = Vec::new();
    while let Ok(Event::Reactor(event)) = events.try_recv() {
        if event.event_type == ReactorEventType::HandlerFailed {
            failures.push(event.message.unwrap_or_default());
        }
    }
    assert_eq!(failures.len(), 1);
    assert!(failures[0].contains("push processor blew up"));
}

#[tokio::test]
async fn test_subscribe_and_reply_round_trip() {
    let broker = MemoryBroker::new();
    let mut reactor = SubscribedReactor::with_replies(
        push_adapter(&broker, ProcessingMode::SubscribeAndReply),
        uppercase_processor(),
        None,
    )
    .unwrap();
    assert_eq!(reactor.kind(), ReactorKind::SubscribeAndReply);
    reactor.start().await.unwrap();

    let client = requester(&broker, Duration::from_secs(2));
    let request = Envelope::text("ping").with_correlation_id("X");
    let reply = client.request_and_wait_response(request).await.unwrap();

    assert_eq!(reply.payload.as_text(), Some("PING"));
    assert_eq!(reply.correlation_id(), Some("X"));
    assert_eq!(reply.reply_destination, None);
    assert_eq!(client.pending_requests(), 0);
    assert!(broker.ephemeral_queues().is_empty());

    reactor.stop().await.unwrap();
    assert_eq!(reactor.statistics().replies_sent, 1);
}

#[tokio::test]
async fn test_failed_processor_sends_no_reply() {
    let broker = MemoryBroker::new();
    let mut reactor = SubscribedReactor::with_replies(
        push_adapter(&broker, ProcessingMode::SubscribeAndReply),
        uppercase_processor(),
        None,
    )
    .unwrap();
    reactor.start().await.unwrap();

    let client = requester(&broker, Duration::from_millis(200));
    let err = client
        .request_and_wait_response(Envelope::text("fail"))
        .await
        .unwrap_err();
    assert!(matches!(err, AdapterError::ReplyTimeout { .. }));

    reactor.stop().await.unwrap();
    let stats = reactor.statistics();
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.replies_sent, 0);
}

#[tokio::test]
async fn test_message_without_reply_destination_is_processed() {
    let broker = MemoryBroker::new();
    let mut reactor = SubscribedReactor::with_replies(
        push_adapter(&broker, ProcessingMode::SubscribeAndReply),
        uppercase_processor(),
        None,
    )
    .unwrap();
    reactor.start().await.unwrap();

    broker.publish("orders", Envelope::text("fire and forget")).unwrap();
    eventually(|| reactor.statistics().replies_suppressed == 1).await;

    let stats = reactor.statistics();
    assert_eq!(stats.processed, 1);
    assert_eq!(stats.replies_sent, 0);
    reactor.stop().await.unwrap();
}

#[tokio::test]
async fn test_with_replies_needs_reply_processor_and_duplex() {
    let broker = MemoryBroker::new();
    let (consume, _rx) = forwarding_processor();
    let result = SubscribedReactor::with_replies(
        push_adapter(&broker, ProcessingMode::SubscribeAndReply),
        consume,
        None,
    );
    assert!(matches!(
        result,
        Err(ReactorError::Configuration(
            ConfigError::UnsupportedCombination { .. }
        ))
    ));

    let result = SubscribedReactor::with_replies(
        adapter(
            &broker,
            ProcessingMode::SubscribeAndReply,
            Capabilities::NONE.with_subscribing(true),
        ),
        uppercase_processor(),
        None,
    );
    assert!(matches!(
        result,
        Err(ReactorError::Configuration(
            ConfigError::UnsupportedCombination { .. }
        ))
    ));
}

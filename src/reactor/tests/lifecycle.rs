//! Start/stop state machine

use super::{adapter, forwarding_processor};
use crate::adapter::{AdapterError, Capabilities, MemoryBroker};
use crate::config::ProcessingMode;
use crate::notifications::{AsyncNotificationManager, Event, EventFilter, ReactorEventType};
use crate::reactor::{
    PollingReactor, Reactor, ReactorError, ReactorKind, ReactorState, SubscribedReactor,
};
use std::sync::Arc;

#[tokio::test]
async fn test_start_twice_is_rejected() {
    let broker = MemoryBroker::new();
    let (processor, _rx) = forwarding_processor();
    let mut reactor = PollingReactor::new(
        adapter(&broker, ProcessingMode::ThreadPolling, Capabilities::NONE),
        processor,
        None,
    );
    assert_eq!(reactor.state(), ReactorState::Idle);

    reactor.start().await.unwrap();
    assert_eq!(reactor.state(), ReactorState::Running);
    assert!(reactor.adapter().is_connected());

    let err = reactor.start().await.unwrap_err();
    assert!(matches!(
        err,
        ReactorError::InvalidState {
            state: ReactorState::Running,
            ..
        }
    ));

    reactor.stop().await.unwrap();
    assert_eq!(reactor.state(), ReactorState::Stopped);
    assert!(!reactor.adapter().is_connected());
}

#[tokio::test]
async fn test_stop_is_idempotent_and_final() {
    let broker = MemoryBroker::new();
    let (processor, _rx) = forwarding_processor();
    let mut reactor = PollingReactor::new(
        adapter(&broker, ProcessingMode::ThreadPolling, Capabilities::NONE),
        processor,
        None,
    );

    reactor.start().await.unwrap();
    reactor.stop().await.unwrap();
    reactor.stop().await.unwrap();
    assert_eq!(reactor.state(), ReactorState::Stopped);

    assert!(matches!(
        reactor.start().await,
        Err(ReactorError::InvalidState {
            state: ReactorState::Stopped,
            ..
        })
    ));
}

#[tokio::test]
async fn test_stop_before_start_retires_reactor() {
    let broker = MemoryBroker::new();
    let (processor, _rx) = forwarding_processor();
    let mut reactor = SubscribedReactor::new(
        adapter(
            &broker,
            ProcessingMode::Subscribe,
            Capabilities::NONE.with_subscribing(true),
        ),
        processor,
        None,
    )
    .unwrap();

    reactor.stop().await.unwrap();
    assert_eq!(reactor.state(), ReactorState::Stopped);
    assert!(!broker.has_queue("orders"));
}

#[tokio::test]
async fn test_failed_start_leaves_reactor_idle() {
    let broker = MemoryBroker::new();
    broker.set_available(false);
    let (processor, _rx) = forwarding_processor();
    let mut reactor = PollingReactor::new(
        adapter(&broker, ProcessingMode::ThreadPolling, Capabilities::NONE),
        processor,
        None,
    );

    let err = reactor.start().await.unwrap_err();
    assert!(matches!(
        err,
        ReactorError::Adapter(AdapterError::ConnectionFailure { .. })
    ));
    assert!(err.is_transient());
    assert_eq!(reactor.state(), ReactorState::Idle);

    broker.set_available(true);
    reactor.start().await.unwrap();
    assert_eq!(reactor.state(), ReactorState::Running);
    reactor.stop().await.unwrap();
}

#[tokio::test]
async fn test_lifecycle_events_published() {
    let broker = MemoryBroker::new();
    let notifications = Arc::new(AsyncNotificationManager::new());
    let mut events = notifications
        .subscribe(
            "lifecycle".to_string(),
            EventFilter::Queue("orders".to_string()),
            "test".to_string(),
        )
        .unwrap();

    let (processor, _rx) = forwarding_processor();
    let mut reactor = PollingReactor::new(
        adapter(&broker, ProcessingMode::ThreadPolling, Capabilities::NONE),
        processor,
        Some(notifications.clone()),
    );
    reactor.start().await.unwrap();
    reactor.stop().await.unwrap();

    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let Event::Reactor(event) = event {
            assert_eq!(event.reactor, ReactorKind::Polling);
            seen.push(event.event_type);
        }
    }
    assert_eq!(
        seen,
        vec![ReactorEventType::Started, ReactorEventType::Stopped]
    );
}

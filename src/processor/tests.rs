//! Tests for the processor registry

use super::*;
use crate::message::Envelope;
use std::sync::Arc;

#[test]
fn test_register_returns_handle() {
    let registry = ProcessorRegistry::new();

    let handle = registry
        .register("orders", Processor::consume_fn(|_| async { Ok(()) }))
        .unwrap();

    assert_eq!(handle.queue_id(), "orders");
    assert_eq!(handle.kind(), ProcessorKind::Consume);
    assert!(registry.is_registered("orders"));
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_duplicate_registration_rejected() {
    let registry = ProcessorRegistry::new();
    registry
        .register("orders", Processor::consume_fn(|_| async { Ok(()) }))
        .unwrap();

    let err = registry
        .register(
            "orders",
            Processor::reply_fn(|m| async move { Ok(m.reply_with("ok")) }),
        )
        .unwrap_err();

    assert_eq!(
        err,
        RegistryError::ProcessorAlreadyRegistered {
            queue_id: "orders".to_string()
        }
    );
    // The first binding is untouched.
    assert_eq!(registry.get("orders").unwrap().kind(), ProcessorKind::Consume);
}

#[test]
fn test_get_unregistered_queue() {
    let registry = ProcessorRegistry::new();

    let err = registry.get("audit").unwrap_err();
    assert_eq!(
        err,
        RegistryError::NoProcessorRegistered {
            queue_id: "audit".to_string()
        }
    );
}

#[test]
fn test_queue_ids_sorted() {
    let registry = ProcessorRegistry::new();
    for id in ["payments", "audit", "orders"] {
        registry
            .register(id, Processor::consume_fn(|_| async { Ok(()) }))
            .unwrap();
    }

    assert_eq!(registry.queue_ids(), vec!["audit", "orders", "payments"]);
}

#[test]
fn test_concurrent_registration_has_one_winner() {
    let registry = Arc::new(ProcessorRegistry::new());
    let mut threads = Vec::new();

    for _ in 0..8 {
        let registry = registry.clone();
        threads.push(std::thread::spawn(move || {
            registry
                .register("orders", Processor::consume_fn(|_| async { Ok(()) }))
                .is_ok()
        }));
    }

    let winners = threads
        .into_iter()
        .map(|t| t.join().unwrap())
        .filter(|ok| *ok)
        .count();
    assert_eq!(winners, 1);
}

#[tokio::test]
async fn test_closure_processors_run() {
    let consume = Processor::consume_fn(|m: Envelope| async move {
        if m.payload.as_text() == Some("bad") {
            Err("rejected".into())
        } else {
            Ok(())
        }
    });
    let reply = Processor::reply_fn(|m: Envelope| async move { Ok(m.reply_with("pong")) });

    match consume {
        Processor::Consume(handler) => {
            assert!(handler.handle(Envelope::text("good")).await.is_ok());
            assert!(handler.handle(Envelope::text("bad")).await.is_err());
        }
        Processor::Reply(_) => panic!("expected consume processor"),
    }

    match reply {
        Processor::Reply(handler) => {
            let request = Envelope::text("ping").with_correlation_id("X");
            let response = handler.handle(request).await.unwrap();
            assert_eq!(response.correlation_id(), Some("X"));
        }
        Processor::Consume(_) => panic!("expected reply processor"),
    }
}

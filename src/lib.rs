//! Broker-agnostic message queue reactors
//!
//! Adapters expose a base send/receive contract plus optional capabilities
//! (push subscription, transactions, request/reply). A [`reactor::ReactorFactory`]
//! inspects those capabilities and the queue's configured processing mode to
//! pick the reactor that feeds each message to the queue's registered
//! processor.

pub mod adapter;
pub mod app;
pub mod config;
pub mod core;
pub mod duplex;
pub mod message;
pub mod notifications;
pub mod processor;
pub mod reactor;

//! Processor handler traits and closure adapters

use crate::message::Envelope;
use async_trait::async_trait;
use std::future::Future;
use std::marker::PhantomData;

/// Error type processors may return; reactors only log it
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

pub type HandlerResult<T> = Result<T, HandlerError>;

/// Consumes a message without producing a reply
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, message: Envelope) -> HandlerResult<()>;
}

/// Consumes a message and produces the reply envelope
#[async_trait]
pub trait ReplyHandler: Send + Sync {
    async fn handle(&self, message: Envelope) -> HandlerResult<Envelope>;
}

/// [`MessageHandler`] backed by an async closure
pub struct ConsumeFn<F, Fut> {
    f: F,
    _fut: PhantomData<fn() -> Fut>,
}

impl<F, Fut> ConsumeFn<F, Fut>
where
    F: Fn(Envelope) -> Fut + Send + Sync,
    Fut: Future<Output = HandlerResult<()>> + Send,
{
    pub fn new(f: F) -> Self {
        Self {
            f,
            _fut: PhantomData,
        }
    }
}

#[async_trait]
impl<F, Fut> MessageHandler for ConsumeFn<F, Fut>
where
    F: Fn(Envelope) -> Fut + Send + Sync,
    Fut: Future<Output = HandlerResult<()>> + Send,
{
    async fn handle(&self, message: Envelope) -> HandlerResult<()> {
        (self.f)(message).await
    }
}

/// [`ReplyHandler`] backed by an async closure
pub struct ReplyFn<F, Fut> {
    f: F,
    _fut: PhantomData<fn() -> Fut>,
}

impl<F, Fut> ReplyFn<F, Fut>
where
    F: Fn(Envelope) -> Fut + Send + Sync,
    Fut: Future<Output = HandlerResult<Envelope>> + Send,
{
    pub fn new(f: F) -> Self {
        Self {
            f,
            _fut: PhantomData,
        }
    }
}

#[async_trait]
impl<F, Fut> ReplyHandler for ReplyFn<F, Fut>
where
    F: Fn(Envelope) -> Fut + Send + Sync,
    Fut: Future<Output = HandlerResult<Envelope>> + Send,
{
    async fn handle(&self, message: Envelope) -> HandlerResult<Envelope> {
        (self.f)(message).await
    }
}

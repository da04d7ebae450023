//! Processor Registry
//!
//! Thread-safe map from queue id to the one processor bound to it. Bindings
//! are permanent for the registry's lifetime: a second registration for the
//! same queue is rejected rather than replacing the first.

use crate::core::sync::handle_mutex_poison;
use crate::processor::error::{RegistryError, RegistryResult};
use crate::processor::traits::{
    ConsumeFn, HandlerResult, MessageHandler, ReplyFn, ReplyHandler,
};
use crate::message::Envelope;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use strum_macros::Display;

/// What a processor produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum ProcessorKind {
    Consume,
    Reply,
}

/// Message handler bound to a queue
#[derive(Clone)]
pub enum Processor {
    /// message → nothing
    Consume(Arc<dyn MessageHandler>),
    /// message → reply envelope
    Reply(Arc<dyn ReplyHandler>),
}

impl std::fmt::Debug for Processor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Processor::{}", self.kind())
    }
}

impl Processor {
    pub fn kind(&self) -> ProcessorKind {
        match self {
            Processor::Consume(_) => ProcessorKind::Consume,
            Processor::Reply(_) => ProcessorKind::Reply,
        }
    }

    /// Consume processor from an async closure
    pub fn consume_fn<F, Fut>(f: F) -> Self
    where
        F: Fn(Envelope) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult<()>> + Send + 'static,
    {
        Processor::Consume(Arc::new(ConsumeFn::new(f)))
    }

    /// Reply processor from an async closure
    pub fn reply_fn<F, Fut>(f: F) -> Self
    where
        F: Fn(Envelope) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult<Envelope>> + Send + 'static,
    {
        Processor::Reply(Arc::new(ReplyFn::new(f)))
    }
}

/// Receipt for a successful registration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationHandle {
    queue_id: String,
    kind: ProcessorKind,
    registered_at: DateTime<Utc>,
}

impl RegistrationHandle {
    pub fn queue_id(&self) -> &str {
        &self.queue_id
    }

    pub fn kind(&self) -> ProcessorKind {
        self.kind
    }

    pub fn registered_at(&self) -> DateTime<Utc> {
        self.registered_at
    }
}

#[derive(Default)]
pub struct ProcessorRegistry {
    processors: Mutex<HashMap<String, Processor>>,
}

impl std::fmt::Debug for ProcessorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessorRegistry")
            .field("queues", &self.queue_ids())
            .finish()
    }
}

impl ProcessorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `processor` to `queue_id`
    pub fn register(
        &self,
        queue_id: impl Into<String>,
        processor: Processor,
    ) -> RegistryResult<RegistrationHandle> {
        let queue_id = queue_id.into();
        let mut processors = handle_mutex_poison(self.processors.lock(), |message| {
            RegistryError::LockPoisoned { message }
        })?;

        if processors.contains_key(&queue_id) {
            return Err(RegistryError::ProcessorAlreadyRegistered { queue_id });
        }

        let kind = processor.kind();
        processors.insert(queue_id.clone(), processor);
        log::debug!("Registered {} processor for queue '{}'", kind, queue_id);

        Ok(RegistrationHandle {
            queue_id,
            kind,
            registered_at: Utc::now(),
        })
    }

    /// Look up the processor bound to `queue_id`
    pub fn get(&self, queue_id: &str) -> RegistryResult<Processor> {
        let processors = handle_mutex_poison(self.processors.lock(), |message| {
            RegistryError::LockPoisoned { message }
        })?;
        processors
            .get(queue_id)
            .cloned()
            .ok_or_else(|| RegistryError::NoProcessorRegistered {
                queue_id: queue_id.to_string(),
            })
    }

    pub fn is_registered(&self, queue_id: &str) -> bool {
        self.processors
            .lock()
            .map(|p| p.contains_key(queue_id))
            .unwrap_or(false)
    }

    /// Registered queue ids, sorted
    pub fn queue_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .processors
            .lock()
            .map(|p| p.keys().cloned().collect())
            .unwrap_or_default();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.processors.lock().map(|p| p.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

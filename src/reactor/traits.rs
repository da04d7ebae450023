//! The reactor contract

use crate::adapter::QueueAdapter;
use crate::reactor::error::{ReactorError, ReactorResult};
use crate::reactor::kind::{ReactorKind, ReactorState};
use crate::reactor::statistics::StatisticsSnapshot;
use async_trait::async_trait;
use std::sync::Arc;

/// Drives one adapter and one processor binding
///
/// A reactor owns its adapter's lifecycle: `start` connects it, `stop`
/// disconnects it. Reactors are single-use; once stopped they stay stopped.
#[async_trait]
pub trait Reactor: Send + Sync {
    fn queue_id(&self) -> &str;

    fn kind(&self) -> ReactorKind;

    fn state(&self) -> ReactorState;

    fn adapter(&self) -> Arc<dyn QueueAdapter>;

    fn statistics(&self) -> StatisticsSnapshot;

    /// Connect and begin delivering messages. Only valid while idle.
    ///
    /// On failure the reactor is left idle so the start can be retried.
    async fn start(&mut self) -> ReactorResult<()>;

    /// Stop delivering, let the in-flight message finish, and disconnect
    ///
    /// Stopping a stopped reactor is a no-op; stopping an idle one just
    /// retires it.
    async fn stop(&mut self) -> ReactorResult<()>;
}

pub(crate) fn require_idle(queue_id: &str, state: ReactorState) -> ReactorResult<()> {
    if state == ReactorState::Idle {
        Ok(())
    } else {
        Err(ReactorError::InvalidState {
            queue_id: queue_id.to_string(),
            operation: "start".to_string(),
            state,
        })
    }
}

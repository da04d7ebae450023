//! Reactor strategies, lifecycle states and the selection rule

use crate::adapter::Capabilities;
use crate::config::ProcessingMode;
use strum_macros::{Display, EnumIter};

/// Dispatch strategy driving consumption for one queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum ReactorKind {
    #[strum(to_string = "polling")]
    Polling,
    #[strum(to_string = "subscribed")]
    Subscribed,
    #[strum(to_string = "transacted-polling")]
    TransactedPolling,
    #[strum(to_string = "subscribe-and-reply")]
    SubscribeAndReply,
}

impl ReactorKind {
    /// Pick the strategy for an adapter's capabilities and the configured mode
    ///
    /// First match wins:
    /// 1. transactional adapter → transacted polling, whatever the mode
    /// 2. subscribing adapter in `Subscribe` mode → subscribed
    /// 3. subscribing adapter in `SubscribeAndReply` mode → subscribe-and-reply
    /// 4. anything else → polling
    ///
    /// Checking for a registered processor comes before this and is the
    /// factory's job.
    pub fn select(capabilities: Capabilities, mode: ProcessingMode) -> ReactorKind {
        if capabilities.transactional {
            return ReactorKind::TransactedPolling;
        }
        match (capabilities.subscribing, mode) {
            (true, ProcessingMode::Subscribe) => ReactorKind::Subscribed,
            (true, ProcessingMode::SubscribeAndReply) => ReactorKind::SubscribeAndReply,
            _ => ReactorKind::Polling,
        }
    }

    pub fn is_push(&self) -> bool {
        matches!(self, ReactorKind::Subscribed | ReactorKind::SubscribeAndReply)
    }
}

/// Reactor lifecycle: `Idle → Running → Stopping → Stopped`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum ReactorState {
    Idle,
    Running,
    Stopping,
    Stopped,
}

//! Adapter Error Types

use crate::core::error_handling::ContextualError;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AdapterError {
    #[error("Failed to connect queue '{queue_id}': {message}")]
    ConnectionFailure { queue_id: String, message: String },

    #[error("Failed to send on '{destination}': {message}")]
    SendFailure {
        destination: String,
        message: String,
    },

    #[error("No message available on queue '{queue_id}'")]
    ReceiveEmpty { queue_id: String },

    #[error("No reply on '{destination}' within {timeout:?}")]
    ReplyTimeout {
        destination: String,
        timeout: Duration,
    },

    #[error("Adapter for queue '{queue_id}' does not support {capability}")]
    CapabilityMissing {
        queue_id: String,
        capability: String,
    },

    #[error("Transport error on queue '{queue_id}': {message}")]
    Transport { queue_id: String, message: String },
}

impl AdapterError {
    /// True for errors that a later reconnect may clear
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AdapterError::ConnectionFailure { .. } | AdapterError::Transport { .. }
        )
    }
}

impl ContextualError for AdapterError {
    fn is_user_actionable(&self) -> bool {
        matches!(self, AdapterError::CapabilityMissing { .. })
    }

    fn user_message(&self) -> Option<String> {
        match self {
            AdapterError::CapabilityMissing { .. } => Some(self.to_string()),
            _ => None,
        }
    }
}

/// Result type for adapter operations
pub type AdapterResult<T> = Result<T, AdapterError>;

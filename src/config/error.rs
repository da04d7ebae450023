//! Configuration Error Types

use crate::config::BrokerFamily;
use crate::core::error_handling::ContextualError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Queue '{queue_id}' is missing required field '{field}'")]
    MissingField { queue_id: String, field: String },

    #[error("Queue entry #{index} has an empty id")]
    EmptyId { index: usize },

    #[error("Queue id '{queue_id}' is configured more than once")]
    DuplicateId { queue_id: String },

    #[error("Queue '{queue_id}' has invalid {field} '{value}': {reason}")]
    InvalidValue {
        queue_id: String,
        field: String,
        value: String,
        reason: String,
    },

    #[error("Queue '{queue_id}' has a zero {field}")]
    ZeroDuration { queue_id: String, field: String },

    #[error("Queue '{queue_id}' uses broker '{broker}' but parameter '{parameter}' is not set")]
    MissingParameter {
        queue_id: String,
        broker: BrokerFamily,
        parameter: String,
    },

    #[error("Queue '{queue_id}' cannot run as configured: {reason}")]
    UnsupportedCombination { queue_id: String, reason: String },

    #[error("No adapter provider is registered for broker '{broker}'")]
    UnknownProvider { broker: BrokerFamily },

    #[error("An adapter provider for broker '{broker}' is already registered")]
    DuplicateProvider { broker: BrokerFamily },

    #[error("Queue '{queue_id}' is not configured")]
    UnknownQueue { queue_id: String },

    #[error("Failed to read configuration file {path}: {message}")]
    FileRead { path: String, message: String },

    #[error("Failed to parse configuration file {path}: {message}")]
    Parse { path: String, message: String },
}

impl ContextualError for ConfigError {
    fn is_user_actionable(&self) -> bool {
        true
    }

    fn user_message(&self) -> Option<String> {
        Some(self.to_string())
    }
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

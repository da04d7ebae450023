//! Reactor Error Types

use crate::adapter::AdapterError;
use crate::config::ConfigError;
use crate::core::error_handling::ContextualError;
use crate::processor::RegistryError;
use crate::reactor::kind::ReactorState;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReactorError {
    #[error("No processor is registered for queue '{queue_id}'")]
    NoProcessorRegistered { queue_id: String },

    #[error(transparent)]
    Configuration(#[from] ConfigError),

    #[error(transparent)]
    Adapter(#[from] AdapterError),

    #[error(transparent)]
    Registry(RegistryError),

    #[error("Reactor for queue '{queue_id}' cannot {operation} while {state}")]
    InvalidState {
        queue_id: String,
        operation: String,
        state: ReactorState,
    },
}

impl From<RegistryError> for ReactorError {
    fn from(error: RegistryError) -> Self {
        match error {
            RegistryError::NoProcessorRegistered { queue_id } => {
                ReactorError::NoProcessorRegistered { queue_id }
            }
            other => ReactorError::Registry(other),
        }
    }
}

impl ReactorError {
    /// True when retrying later might succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, ReactorError::Adapter(e) if e.is_transient())
    }
}

impl ContextualError for ReactorError {
    fn is_user_actionable(&self) -> bool {
        match self {
            ReactorError::NoProcessorRegistered { .. } => true,
            ReactorError::Configuration(e) => e.is_user_actionable(),
            ReactorError::Adapter(e) => e.is_user_actionable(),
            ReactorError::Registry(e) => e.is_user_actionable(),
            ReactorError::InvalidState { .. } => false,
        }
    }

    fn user_message(&self) -> Option<String> {
        match self {
            ReactorError::NoProcessorRegistered { .. } => Some(self.to_string()),
            ReactorError::Configuration(e) => e.user_message(),
            ReactorError::Adapter(e) => e.user_message(),
            ReactorError::Registry(e) => e.user_message(),
            ReactorError::InvalidState { .. } => None,
        }
    }
}

/// Result type for reactor operations
pub type ReactorResult<T> = Result<T, ReactorError>;

/// Failure inside a processor, caught at the reactor boundary
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HandlerFailure {
    #[error("processor returned an error: {message}")]
    Error { message: String },

    #[error("processor panicked: {message}")]
    Panicked { message: String },
}

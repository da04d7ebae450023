//! Registry Error Types

use crate::core::error_handling::ContextualError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("A processor is already registered for queue '{queue_id}'")]
    ProcessorAlreadyRegistered { queue_id: String },

    #[error("No processor is registered for queue '{queue_id}'")]
    NoProcessorRegistered { queue_id: String },

    #[error("Processor registry lock poisoned: {message}")]
    LockPoisoned { message: String },
}

impl ContextualError for RegistryError {
    fn is_user_actionable(&self) -> bool {
        !matches!(self, RegistryError::LockPoisoned { .. })
    }

    fn user_message(&self) -> Option<String> {
        match self {
            RegistryError::LockPoisoned { .. } => None,
            _ => Some(self.to_string()),
        }
    }
}

/// Result type for registry operations
pub type RegistryResult<T> = Result<T, RegistryError>;

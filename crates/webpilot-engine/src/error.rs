//! Engine-local errors.

use thiserror::Error;

/// Node registry errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegistryError {
    #[error("Handler already registered for node type: {0}")]
    AlreadyRegistered(String),

    #[error("No handler registered for node type: {0}")]
    NotFound(String),
}

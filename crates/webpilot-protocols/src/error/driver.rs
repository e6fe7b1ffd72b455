//! Automation driver errors.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DriverError {
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Navigation failed: {0}")]
    NavigationFailed(String),

    #[error("Timeout after {timeout_ms}ms: {action}")]
    Timeout { action: String, timeout_ms: u64 },

    #[error("Script error: {0}")]
    Script(String),

    #[error("Driver not connected")]
    NotConnected,

    #[error("Unsupported by driver: {0}")]
    Unsupported(String),

    #[error("Action failed: {0}")]
    ActionFailed(String),
}

impl DriverError {
    /// Selector carried by the error, if it is an element lookup failure.
    pub fn selector(&self) -> Option<&str> {
        match self {
            Self::ElementNotFound(selector) => Some(selector),
            _ => None,
        }
    }
}

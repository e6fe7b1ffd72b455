//! Node handler errors.

use thiserror::Error;

use super::DriverError;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum NodeError {
    #[error("missing required field '{0}'")]
    MissingField(String),

    #[error("invalid field '{field}': {reason}")]
    InvalidField { field: String, reason: String },

    #[error(transparent)]
    Driver(#[from] DriverError),

    #[error("unsupported: {0}")]
    Unsupported(String),
}

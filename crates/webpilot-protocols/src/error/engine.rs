//! Execution engine errors.

use thiserror::Error;

use super::DriverError;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("Invalid graph: {0}")]
    InvalidGraph(String),

    #[error("Graph structure error: {0}")]
    GraphStructure(String),

    #[error("Unknown node type '{node_type}' on node '{node_id}'")]
    UnknownNodeType { node_id: String, node_type: String },

    #[error("Node '{node_id}' failed: {message}")]
    ActionFailure { node_id: String, message: String },

    #[error("Execution already in progress: {0}")]
    ExecutionInProgress(String),

    #[error("Execution is not paused")]
    NotPaused,

    #[error("No active execution")]
    NoActiveExecution,

    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),
}

impl EngineError {
    /// Whether the error is a structural problem detected before traversal.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::InvalidGraph(_) | Self::GraphStructure(_) | Self::UnknownNodeType { .. }
        )
    }
}

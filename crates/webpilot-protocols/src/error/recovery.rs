//! Recovery pipeline errors.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RecoveryError {
    #[error("Unknown node: {0}")]
    UnknownNode(String),

    #[error("Strategy unavailable: {0}")]
    StrategyUnavailable(String),

    #[error("Candidate from {strategy} rejected: {reason}")]
    InvalidCandidate { strategy: String, reason: String },

    #[error("Recovery exhausted: {0}")]
    RecoveryExhausted(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_node() {
        let err = RecoveryError::UnknownNode("ghost".to_string());
        assert_eq!(err.to_string(), "Unknown node: ghost");
    }

    #[test]
    fn test_invalid_candidate() {
        let err = RecoveryError::InvalidCandidate {
            strategy: "llm".to_string(),
            reason: "edge references unknown node".to_string(),
        };
        assert!(err.to_string().contains("llm"));
        assert!(err.to_string().contains("unknown node"));
    }

    #[test]
    fn test_exhausted() {
        let err = RecoveryError::RecoveryExhausted("3 strategies tried".to_string());
        assert!(err.to_string().starts_with("Recovery exhausted"));
    }
}

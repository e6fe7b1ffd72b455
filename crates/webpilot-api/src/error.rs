//! API error type and its HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use webpilot_protocols::{EngineError, RecoveryError};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Recovery(#[from] RecoveryError),

    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Engine(e) if e.is_structural() => StatusCode::BAD_REQUEST,
            Self::Engine(EngineError::ExecutionInProgress(_))
            | Self::Engine(EngineError::NotPaused)
            | Self::Engine(EngineError::NoActiveExecution) => StatusCode::CONFLICT,
            Self::Engine(EngineError::Driver(_)) => StatusCode::BAD_GATEWAY,
            Self::Engine(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Recovery(RecoveryError::UnknownNode(_)) => StatusCode::BAD_REQUEST,
            Self::Recovery(RecoveryError::RecoveryExhausted(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Recovery(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Engine(EngineError::InvalidGraph(_)) => "INVALID_GRAPH",
            Self::Engine(EngineError::GraphStructure(_)) => "GRAPH_STRUCTURE",
            Self::Engine(EngineError::UnknownNodeType { .. }) => "UNKNOWN_NODE_TYPE",
            Self::Engine(EngineError::ActionFailure { .. }) => "ACTION_FAILURE",
            Self::Engine(EngineError::ExecutionInProgress(_)) => "EXECUTION_IN_PROGRESS",
            Self::Engine(EngineError::NotPaused) => "NOT_PAUSED",
            Self::Engine(EngineError::NoActiveExecution) => "NO_ACTIVE_EXECUTION",
            Self::Engine(EngineError::Driver(_)) => "DRIVER_ERROR",
            Self::Recovery(RecoveryError::UnknownNode(_)) => "UNKNOWN_NODE",
            Self::Recovery(RecoveryError::RecoveryExhausted(_)) => "RECOVERY_EXHAUSTED",
            Self::Recovery(_) => "RECOVERY_ERROR",
            Self::BadRequest(_) => "BAD_REQUEST",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({
            "success": false,
            "code": self.code(),
            "message": self.to_string(),
        });
        (self.status_code(), Json(body)).into_response()
    }
}

//! Execution lifecycle events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of lifecycle event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionEventType {
    NodeStart,
    NodeComplete,
    NodeError,
    ExecutionComplete,
    ExecutionError,
}

impl ExecutionEventType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NodeStart => "node_start",
            Self::NodeComplete => "node_complete",
            Self::NodeError => "node_error",
            Self::ExecutionComplete => "execution_complete",
            Self::ExecutionError => "execution_error",
        }
    }
}

/// An event published on the event bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionEvent {
    #[serde(rename = "type")]
    pub event_type: ExecutionEventType,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    pub timestamp: DateTime<Utc>,
}

impl ExecutionEvent {
    pub fn new(event_type: ExecutionEventType) -> Self {
        Self {
            event_type,
            execution_id: None,
            node_id: None,
            message: None,
            timestamp: Utc::now(),
        }
    }

    pub fn node_start(node_id: impl Into<String>) -> Self {
        Self::new(ExecutionEventType::NodeStart).with_node(node_id)
    }

    pub fn node_complete(node_id: impl Into<String>) -> Self {
        Self::new(ExecutionEventType::NodeComplete).with_node(node_id)
    }

    pub fn node_error(node_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ExecutionEventType::NodeError)
            .with_node(node_id)
            .with_message(message)
    }

    pub fn execution_complete() -> Self {
        Self::new(ExecutionEventType::ExecutionComplete)
    }

    pub fn execution_error(message: impl Into<String>) -> Self {
        Self::new(ExecutionEventType::ExecutionError).with_message(message)
    }

    pub fn with_execution(mut self, execution_id: impl Into<String>) -> Self {
        self.execution_id = Some(execution_id.into());
        self
    }

    pub fn with_node(mut self, node_id: impl Into<String>) -> Self {
        self.node_id = Some(node_id.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_shape() {
        let event = ExecutionEvent::node_error("n1", "Element not found: #go").with_execution("e1");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "node_error");
        assert_eq!(json["nodeId"], "n1");
        assert_eq!(json["executionId"], "e1");
        assert_eq!(json["message"], "Element not found: #go");
        assert!(json["timestamp"].is_string());
    }

    #[test]
    fn test_optional_fields_omitted() {
        let json = serde_json::to_value(ExecutionEvent::execution_complete()).unwrap();
        assert_eq!(json["type"], "execution_complete");
        assert!(json.get("nodeId").is_none());
        assert!(json.get("message").is_none());
    }
}

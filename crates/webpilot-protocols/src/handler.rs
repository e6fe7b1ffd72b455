//! Node handler protocol.
//!
//! A handler executes one node type. Handlers are registered by type name and
//! looked up by the engine for every visited node.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::driver::AutomationDriver;
use crate::error::NodeError;
use crate::workflow::Node;

/// Context passed to a handler for one dispatch.
pub struct NodeContext<'a> {
    pub execution_id: &'a str,
    pub driver: &'a Arc<dyn AutomationDriver>,
    /// Run variables (node outputs, loop cursors).
    pub variables: &'a HashMap<String, Value>,
    /// Effective timeout for driver actions.
    pub timeout: Duration,
}

impl NodeContext<'_> {
    /// Look up a run variable, following dotted paths into objects.
    pub fn variable(&self, path: &str) -> Option<&Value> {
        lookup_variable(self.variables, path)
    }
}

/// Resolve `name` or `name.field.0` against run variables.
///
/// An exact key wins over path traversal, so variables whose names contain
/// dots stay reachable.
pub fn lookup_variable<'v>(variables: &'v HashMap<String, Value>, path: &str) -> Option<&'v Value> {
    if let Some(value) = variables.get(path) {
        return Some(value);
    }
    let mut parts = path.split('.');
    let mut current = variables.get(parts.next()?)?;
    for part in parts {
        current = match current {
            Value::Object(map) => map.get(part)?,
            Value::Array(items) => items.get(part.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Result of a node dispatch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeOutput {
    /// Value stored as a run variable under the node id.
    pub value: Option<Value>,
    /// Output handle to follow (branch nodes).
    pub handle: Option<String>,
    /// Suspend after this node until the user resumes.
    pub wait_for_user: bool,
}

impl NodeOutput {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_value(value: impl Into<Value>) -> Self {
        Self {
            value: Some(value.into()),
            ..Self::default()
        }
    }

    pub fn with_handle(handle: impl Into<String>) -> Self {
        Self {
            handle: Some(handle.into()),
            ..Self::default()
        }
    }

    pub fn wait_for_user() -> Self {
        Self {
            wait_for_user: true,
            ..Self::default()
        }
    }
}

/// Executes nodes of one type.
#[async_trait]
pub trait NodeHandler: Send + Sync {
    /// Node type this handler serves.
    fn node_type(&self) -> &str;

    /// Execute the node. `node.data` has run variables already substituted.
    async fn execute(&self, node: &Node, ctx: &NodeContext<'_>) -> Result<NodeOutput, NodeError>;
}

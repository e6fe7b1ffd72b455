//! Field patches on node data.
//!
//! Patches never add or remove nodes or edges. A patch that names a node the
//! workflow does not have is reported back; every other patch still applies.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use webpilot_protocols::{RecoveryError, Workflow};

/// Set `data[field] = value` on one node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodePatch {
    pub node_id: String,
    pub field: String,
    pub value: Value,
}

impl NodePatch {
    pub fn new(node_id: impl Into<String>, field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            node_id: node_id.into(),
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn selector(node_id: impl Into<String>, selector: impl Into<String>) -> Self {
        Self::new(node_id, "selector", selector.into())
    }

    pub fn timeout(node_id: impl Into<String>, timeout_ms: u64) -> Self {
        Self::new(node_id, "timeout", timeout_ms)
    }
}

/// Result of applying a patch set.
#[derive(Debug, Clone)]
pub struct PatchOutcome {
    pub workflow: Workflow,
    pub applied: Vec<NodePatch>,
    pub failures: Vec<(NodePatch, RecoveryError)>,
}

impl PatchOutcome {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

pub struct WorkflowModifier;

impl WorkflowModifier {
    /// Apply every valid patch and collect the failures.
    pub fn apply(workflow: &Workflow, patches: &[NodePatch]) -> PatchOutcome {
        let mut patched = workflow.clone();
        let mut applied = Vec::new();
        let mut failures = Vec::new();

        for patch in patches {
            match patched.node_mut(&patch.node_id) {
                Some(node) => {
                    debug!(node = %patch.node_id, field = %patch.field, "Applying patch");
                    node.data.insert(patch.field.clone(), patch.value.clone());
                    applied.push(patch.clone());
                }
                None => {
                    failures.push((
                        patch.clone(),
                        RecoveryError::UnknownNode(patch.node_id.clone()),
                    ));
                }
            }
        }

        PatchOutcome {
            workflow: patched,
            applied,
            failures,
        }
    }

    /// Timeout patch raising a node's timeout to at least `floor_ms`.
    ///
    /// Returns `None` when the node already waits that long or does not exist.
    pub fn timeout_floor(workflow: &Workflow, node_id: &str, floor_ms: u64) -> Option<NodePatch> {
        let node = workflow.node(node_id)?;
        match node.timeout_ms() {
            Some(current) if current >= floor_ms => None,
            _ => Some(NodePatch::timeout(node_id, floor_ms)),
        }
    }
}

//! Structural validation of workflow graphs.
//!
//! Used before every execution and to vet candidate workflows produced by the
//! recovery pipeline.

use std::collections::{BTreeMap, HashSet};

use crate::error::EngineError;
use crate::workflow::{node_types, Edge, Node, Workflow};

/// Output handle names.
pub mod handles {
    /// Single output of a non-branch node.
    pub const NEXT: &str = "next";
    pub const BODY: &str = "body";
    pub const EXIT: &str = "exit";
    pub const TRUE: &str = "true";
    pub const FALSE: &str = "false";

    /// Handles a node type exposes, in the order unlabeled edges fill them.
    pub fn for_type(node_type: &str) -> &'static [&'static str] {
        match node_type {
            super::node_types::LOOP => &[BODY, EXIT],
            super::node_types::CONDITION => &[TRUE, FALSE],
            _ => &[NEXT],
        }
    }
}

/// Check graph invariants.
///
/// - node ids are unique, exactly one `start` node exists, and every edge
///   references existing nodes (`InvalidGraph`);
/// - non-branch nodes have at most one outgoing edge and branch nodes at most
///   one edge per handle (`GraphStructure`).
pub fn validate_workflow(workflow: &Workflow) -> Result<(), EngineError> {
    let mut ids = HashSet::new();
    for node in &workflow.nodes {
        if node.id.trim().is_empty() {
            return Err(EngineError::InvalidGraph("node with empty id".to_string()));
        }
        if !ids.insert(node.id.as_str()) {
            return Err(EngineError::InvalidGraph(format!(
                "duplicate node id '{}'",
                node.id
            )));
        }
    }

    match workflow.start_nodes().count() {
        1 => {}
        0 => return Err(EngineError::InvalidGraph("no start node".to_string())),
        n => {
            return Err(EngineError::InvalidGraph(format!(
                "expected exactly one start node, found {}",
                n
            )));
        }
    }

    for edge in &workflow.edges {
        for endpoint in [&edge.source, &edge.target] {
            if !ids.contains(endpoint.as_str()) {
                return Err(EngineError::InvalidGraph(format!(
                    "edge '{}' references unknown node '{}'",
                    edge.id, endpoint
                )));
            }
        }
    }

    for node in &workflow.nodes {
        resolve_handles(workflow, node)?;
    }

    Ok(())
}

/// Map each output handle of a node to its target node id.
///
/// Non-branch nodes expose a single [`handles::NEXT`] handle. For branch
/// nodes, labeled edges claim their handle first; unlabeled edges then fill
/// the remaining handles in declaration order (`body` before `exit`, `true`
/// before `false`).
pub fn resolve_handles(
    workflow: &Workflow,
    node: &Node,
) -> Result<BTreeMap<&'static str, String>, EngineError> {
    let outgoing: Vec<&Edge> = workflow.outgoing(&node.id).collect();
    let mut resolved = BTreeMap::new();

    if !node.is_branch() {
        return match outgoing.as_slice() {
            [] => Ok(resolved),
            [edge] => {
                resolved.insert(handles::NEXT, edge.target.clone());
                Ok(resolved)
            }
            _ => Err(EngineError::GraphStructure(format!(
                "node '{}' of type '{}' has {} outgoing edges; only branch nodes ({}) may fan out",
                node.id,
                node.node_type,
                outgoing.len(),
                node_types::BRANCH.join(", ")
            ))),
        };
    }

    let available = handles::for_type(&node.node_type);
    let mut unlabeled = Vec::new();

    for edge in outgoing {
        let Some(label) = edge.source_handle.as_deref().filter(|h| !h.is_empty()) else {
            unlabeled.push(edge);
            continue;
        };
        let Some(handle) = available.iter().find(|h| **h == label) else {
            return Err(EngineError::GraphStructure(format!(
                "node '{}' has no output handle '{}' (expected one of: {})",
                node.id,
                label,
                available.join(", ")
            )));
        };
        if resolved.insert(*handle, edge.target.clone()).is_some() {
            return Err(EngineError::GraphStructure(format!(
                "node '{}' has more than one '{}' edge",
                node.id, handle
            )));
        }
    }

    for edge in unlabeled {
        let Some(handle) = available.iter().find(|h| !resolved.contains_key(*h)) else {
            return Err(EngineError::GraphStructure(format!(
                "node '{}' has more outgoing edges than output handles ({})",
                node.id,
                available.join(", ")
            )));
        };
        resolved.insert(*handle, edge.target.clone());
    }

    Ok(resolved)
}

#[cfg(test)]
#[path = "validation_tests.rs"]
mod tests;

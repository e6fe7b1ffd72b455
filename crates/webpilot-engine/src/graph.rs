//! Immutable graph model for one execution.

use std::collections::{BTreeMap, HashMap};

use webpilot_protocols::validation::handles;
use webpilot_protocols::{node_types, resolve_handles, validate_workflow, EngineError, Node, Workflow};

use crate::registry::NodeRegistry;

/// Validated workflow with outgoing edges indexed by `(node, handle)`.
///
/// Built once per `execute` call and shared read-only with the traversal task.
#[derive(Debug, Clone)]
pub struct WorkflowGraph {
    workflow: Workflow,
    index: HashMap<String, usize>,
    outputs: HashMap<String, BTreeMap<&'static str, String>>,
    start: String,
}

impl WorkflowGraph {
    /// Validate `workflow` and index it.
    ///
    /// Every node type must have a registered handler, except `loop`, which
    /// the engine drives itself.
    pub fn build(workflow: Workflow, registry: &NodeRegistry) -> Result<Self, EngineError> {
        validate_workflow(&workflow)?;

        for node in &workflow.nodes {
            if node.node_type != node_types::LOOP && !registry.contains(&node.node_type) {
                return Err(EngineError::UnknownNodeType {
                    node_id: node.id.clone(),
                    node_type: node.node_type.clone(),
                });
            }
        }

        let mut outputs = HashMap::with_capacity(workflow.nodes.len());
        for node in &workflow.nodes {
            outputs.insert(node.id.clone(), resolve_handles(&workflow, node)?);
        }

        let start = workflow
            .start_nodes()
            .next()
            .map(|n| n.id.clone())
            .ok_or_else(|| EngineError::InvalidGraph("no start node".to_string()))?;

        let index = workflow
            .nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.id.clone(), i))
            .collect();

        Ok(Self {
            workflow,
            index,
            outputs,
            start,
        })
    }

    pub fn start_id(&self) -> &str {
        &self.start
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.index.get(id).map(|&i| &self.workflow.nodes[i])
    }

    /// Target of the node's output handle.
    ///
    /// `None` handle means the single output of a non-branch node.
    pub fn next(&self, id: &str, handle: Option<&str>) -> Option<&str> {
        let handle = handle.unwrap_or(handles::NEXT);
        self.outputs
            .get(id)?
            .get(handle)
            .map(String::as_str)
    }

    pub fn workflow(&self) -> &Workflow {
        &self.workflow
    }

    pub fn len(&self) -> usize {
        self.workflow.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workflow.nodes.is_empty()
    }
}

//! Workflow document: nodes, edges, and typed access to node data.
//!
//! The document is produced by the graph editor and consumed as-is. Fields
//! the engine does not understand (layout positions, styling) are kept in
//! `extra` so a repaired workflow round-trips back to the editor intact.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Node type names understood by the built-in handlers.
pub mod node_types {
    pub const START: &str = "start";
    pub const END: &str = "end";
    pub const NAVIGATE: &str = "navigate";
    pub const CLICK: &str = "click";
    pub const TYPE: &str = "type";
    pub const EXTRACT: &str = "extract";
    pub const WAIT: &str = "wait";
    pub const CODE: &str = "code";
    pub const CONDITION: &str = "condition";
    pub const LOOP: &str = "loop";

    /// Node types that may fan out to several outgoing edges, told apart by handle.
    pub const BRANCH: &[&str] = &[LOOP, CONDITION];

    /// Required `data` fields per node type.
    ///
    /// Each inner slice is a group of alternatives: at least one field of the
    /// group must be present.
    pub fn required_fields(node_type: &str) -> &'static [&'static [&'static str]] {
        match node_type {
            NAVIGATE => &[&["url"]],
            CLICK => &[&["selector"]],
            TYPE => &[&["selector"], &["text"]],
            EXTRACT => &[&["selector"]],
            WAIT => &[&["duration", "selector", "waitForUser"]],
            CODE => &[&["code"]],
            CONDITION => &[&["expression", "variable"]],
            LOOP => &[&["items", "count"]],
            _ => &[],
        }
    }

    /// Whether a node of this type may have more than one outgoing edge.
    pub fn is_branch(node_type: &str) -> bool {
        BRANCH.contains(&node_type)
    }
}

/// A workflow graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    #[serde(default)]
    pub nodes: Vec<Node>,

    #[serde(default)]
    pub edges: Vec<Edge>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Workflow {
    /// Create a workflow from nodes and edges.
    pub fn new(nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        Self {
            nodes,
            edges,
            extra: Map::new(),
        }
    }

    /// Get a node by ID.
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Get a mutable node by ID.
    pub fn node_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    /// Check whether a node ID exists.
    pub fn contains_node(&self, id: &str) -> bool {
        self.nodes.iter().any(|n| n.id == id)
    }

    /// All nodes of type `start`.
    pub fn start_nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes
            .iter()
            .filter(|n| n.node_type == node_types::START)
    }

    /// Outgoing edges of a node, in document order.
    pub fn outgoing<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |e| e.source == id)
    }

    /// Nodes whose `selector` equals the given selector.
    pub fn nodes_with_selector<'a>(
        &'a self,
        selector: &'a str,
    ) -> impl Iterator<Item = &'a Node> + 'a {
        self.nodes
            .iter()
            .filter(move |n| n.selector().is_some_and(|s| s.trim() == selector.trim()))
    }

    /// Whether both workflows have the same node set and edge set.
    ///
    /// Node data and layout extras are ignored.
    pub fn same_topology(&self, other: &Workflow) -> bool {
        let nodes = |w: &Workflow| -> HashSet<(String, String)> {
            w.nodes
                .iter()
                .map(|n| (n.id.clone(), n.node_type.clone()))
                .collect()
        };
        let edges = |w: &Workflow| -> HashSet<(String, String, Option<String>)> {
            w.edges
                .iter()
                .map(|e| (e.source.clone(), e.target.clone(), e.source_handle.clone()))
                .collect()
        };
        self.nodes.len() == other.nodes.len()
            && self.edges.len() == other.edges.len()
            && nodes(self) == nodes(other)
            && edges(self) == edges(other)
    }

    /// Page URL each node runs against.
    ///
    /// A node's URL is its own `pageUrl` field when present, otherwise the URL
    /// of the closest `navigate` node (or `pageUrl`) before it on the path from
    /// the start node. Nodes visited before any navigation are absent.
    pub fn page_urls(&self) -> HashMap<String, String> {
        let mut urls = HashMap::new();
        let mut visited = HashSet::new();
        let mut stack: Vec<(&str, Option<String>)> = self
            .start_nodes()
            .map(|n| (n.id.as_str(), None))
            .collect();

        while let Some((id, inherited)) = stack.pop() {
            if !visited.insert(id.to_string()) {
                continue;
            }
            let Some(node) = self.node(id) else {
                continue;
            };

            let current = node
                .str_field("pageUrl")
                .map(str::to_string)
                .or_else(|| {
                    (node.node_type == node_types::NAVIGATE)
                        .then(|| node.str_field("url").map(str::to_string))
                        .flatten()
                })
                .or(inherited);

            if let Some(url) = &current {
                urls.insert(id.to_string(), url.clone());
            }

            let targets: Vec<&str> = self.outgoing(id).map(|e| e.target.as_str()).collect();
            for target in targets.into_iter().rev() {
                stack.push((target, current.clone()));
            }
        }

        urls
    }

    /// Page URL recorded for a single node.
    pub fn page_url_for(&self, node_id: &str) -> Option<String> {
        self.page_urls().remove(node_id)
    }
}

/// A node in the workflow graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,

    #[serde(rename = "type")]
    pub node_type: String,

    /// Action-specific configuration (selector, text, timeout, loop bounds).
    #[serde(default)]
    pub data: Map<String, Value>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Node {
    /// Create a node with empty data.
    pub fn new(id: impl Into<String>, node_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            node_type: node_type.into(),
            data: Map::new(),
            extra: Map::new(),
        }
    }

    /// Set a data field.
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Non-empty string field from `data`.
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.data
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
    }

    /// Whether a data field is present and non-empty.
    pub fn has_field(&self, key: &str) -> bool {
        match self.data.get(key) {
            None | Some(Value::Null) => false,
            Some(Value::String(s)) => !s.trim().is_empty(),
            Some(Value::Array(items)) => !items.is_empty(),
            Some(_) => true,
        }
    }

    /// The node's selector, if any.
    pub fn selector(&self) -> Option<&str> {
        self.str_field("selector")
    }

    /// The node's label, if any.
    pub fn label(&self) -> Option<&str> {
        self.str_field("label")
    }

    /// Per-node timeout in milliseconds.
    ///
    /// Accepts numbers and numeric strings, as editors emit both.
    pub fn timeout_ms(&self) -> Option<u64> {
        match self.data.get("timeout")? {
            Value::Number(n) => n.as_u64().or_else(|| n.as_f64().map(|f| f.max(0.0) as u64)),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Whether the node carries a breakpoint marker.
    pub fn is_breakpoint_marked(&self) -> bool {
        self.data
            .get("breakpoint")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Whether the node may fan out.
    pub fn is_branch(&self) -> bool {
        node_types::is_branch(&self.node_type)
    }

    /// Required field groups that are not satisfied.
    ///
    /// Each entry names the alternatives of one unsatisfied group, joined with `|`.
    pub fn missing_required_fields(&self) -> Vec<String> {
        node_types::required_fields(&self.node_type)
            .iter()
            .filter(|group| !group.iter().any(|f| self.has_field(f)))
            .map(|group| group.join("|"))
            .collect()
    }
}

/// A directed edge between two nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    #[serde(default)]
    pub id: String,

    pub source: String,

    pub target: String,

    /// Output handle of the source node (e.g. a loop's `body` or `exit`).
    #[serde(
        rename = "sourceHandle",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub source_handle: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Edge {
    /// Create an edge without a handle.
    pub fn new(id: impl Into<String>, source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            source_handle: None,
            extra: Map::new(),
        }
    }

    /// Set the source handle.
    pub fn with_handle(mut self, handle: impl Into<String>) -> Self {
        self.source_handle = Some(handle.into());
        self
    }
}

#[cfg(test)]
#[path = "workflow_tests.rs"]
mod tests;

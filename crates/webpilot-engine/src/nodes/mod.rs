//! Built-in node handlers.
//!
//! `loop` has no handler: iteration state belongs to the traversal and is
//! driven by the engine.

mod browser;
mod flow;
mod logic;

use std::sync::Arc;

use serde_json::Value;
use webpilot_protocols::{Node, NodeError, NodeHandler};

pub use browser::{ClickHandler, ExtractHandler, NavigateHandler, TypeHandler, WaitHandler};
pub use flow::{EndHandler, StartHandler};
pub use logic::{CodeHandler, ConditionHandler};

/// Every built-in handler.
pub fn builtin_handlers() -> Vec<Arc<dyn NodeHandler>> {
    vec![
        Arc::new(StartHandler),
        Arc::new(EndHandler),
        Arc::new(NavigateHandler),
        Arc::new(ClickHandler),
        Arc::new(TypeHandler),
        Arc::new(ExtractHandler),
        Arc::new(WaitHandler),
        Arc::new(CodeHandler),
        Arc::new(ConditionHandler),
    ]
}

/// Required non-empty string field.
pub(crate) fn require_str<'a>(node: &'a Node, field: &str) -> Result<&'a str, NodeError> {
    node.str_field(field)
        .ok_or_else(|| NodeError::MissingField(field.to_string()))
}

/// Field rendered as text; numbers and booleans are accepted as typed input.
pub(crate) fn text_field(node: &Node, field: &str) -> Option<String> {
    match node.data.get(field)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
#[path = "nodes_tests.rs"]
mod tests;

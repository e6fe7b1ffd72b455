//! `{{variable}}` substitution in node data.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde_json::{Map, Value};
use webpilot_protocols::{lookup_variable, Node};

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*([^{}]+?)\s*\}\}").expect("valid regex"));

/// Copy of `node` with placeholders in its data replaced by run variables.
///
/// A string that is exactly one placeholder takes the variable's JSON value
/// (so arrays stay arrays); otherwise values are rendered into the string.
/// Unknown variables are left as written.
pub fn resolve_node(node: &Node, variables: &HashMap<String, Value>) -> Node {
    if variables.is_empty() {
        return node.clone();
    }
    let mut resolved = node.clone();
    resolved.data = resolve_map(&node.data, variables);
    resolved
}

fn resolve_map(map: &Map<String, Value>, variables: &HashMap<String, Value>) -> Map<String, Value> {
    map.iter()
        .map(|(k, v)| (k.clone(), resolve_value(v, variables)))
        .collect()
}

/// Resolve placeholders inside any JSON value.
pub fn resolve_value(value: &Value, variables: &HashMap<String, Value>) -> Value {
    match value {
        Value::String(s) => resolve_str(s, variables),
        Value::Array(items) => Value::Array(items.iter().map(|v| resolve_value(v, variables)).collect()),
        Value::Object(map) => Value::Object(resolve_map(map, variables)),
        other => other.clone(),
    }
}

fn resolve_str(text: &str, variables: &HashMap<String, Value>) -> Value {
    if !text.contains("{{") {
        return Value::String(text.to_string());
    }

    if let Some(caps) = PLACEHOLDER.captures(text) {
        if caps.get(0).is_some_and(|m| m.start() == 0 && m.end() == text.len()) {
            if let Some(value) = lookup_variable(variables, &caps[1]) {
                return value.clone();
            }
        }
    }

    let rendered = PLACEHOLDER.replace_all(text, |caps: &Captures<'_>| {
        match lookup_variable(variables, &caps[1]) {
            Some(Value::String(s)) => s.clone(),
            Some(value) => value.to_string(),
            None => caps[0].to_string(),
        }
    });
    Value::String(rendered.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn vars() -> HashMap<String, Value> {
        let mut vars = HashMap::new();
        vars.insert("user".to_string(), json!("alice"));
        vars.insert("items".to_string(), json!(["a", "b"]));
        vars.insert("loop".to_string(), json!({"index": 1, "item": "b"}));
        vars
    }

    #[test]
    fn test_inline_substitution() {
        let value = resolve_value(&json!("hello {{ user }}, row {{loop.index}}"), &vars());
        assert_eq!(value, json!("hello alice, row 1"));
    }

    #[test]
    fn test_whole_placeholder_keeps_type() {
        assert_eq!(resolve_value(&json!("{{items}}"), &vars()), json!(["a", "b"]));
        assert_eq!(resolve_value(&json!("{{loop.index}}"), &vars()), json!(1));
    }

    #[test]
    fn test_unknown_left_alone() {
        assert_eq!(resolve_value(&json!("{{nope}}"), &vars()), json!("{{nope}}"));
        assert_eq!(resolve_value(&json!("x {{nope}}"), &vars()), json!("x {{nope}}"));
    }

    #[test]
    fn test_resolve_node_nested() {
        let node = Node::new("t", "type")
            .with_data("selector", "#name-{{loop.index}}")
            .with_data("meta", json!({"list": ["{{user}}"]}))
            .with_data("timeout", 500);
        let resolved = resolve_node(&node, &vars());
        assert_eq!(resolved.data["selector"], "#name-1");
        assert_eq!(resolved.data["meta"]["list"][0], "alice");
        assert_eq!(resolved.data["timeout"], 500);
        assert_eq!(node.data["selector"], "#name-{{loop.index}}");
    }
}

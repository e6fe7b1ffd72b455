//! Script evaluation and branching.

use async_trait::async_trait;
use serde_json::Value;
use webpilot_protocols::validation::handles;
use webpilot_protocols::{node_types, Node, NodeContext, NodeError, NodeHandler, NodeOutput};

use super::require_str;

pub struct CodeHandler;

#[async_trait]
impl NodeHandler for CodeHandler {
    fn node_type(&self) -> &str {
        node_types::CODE
    }

    async fn execute(&self, node: &Node, ctx: &NodeContext<'_>) -> Result<NodeOutput, NodeError> {
        let code = require_str(node, "code")?;
        let value = ctx.driver.evaluate(code, ctx.timeout).await?;
        Ok(NodeOutput::with_value(value))
    }
}

/// Chooses the `true` or `false` output.
///
/// `variable` tests a run variable for truthiness. `expression` supports
/// `left == right`, `left != right`, `!operand` and a bare operand, where an
/// operand names a run variable or is a literal.
pub struct ConditionHandler;

#[async_trait]
impl NodeHandler for ConditionHandler {
    fn node_type(&self) -> &str {
        node_types::CONDITION
    }

    async fn execute(&self, node: &Node, ctx: &NodeContext<'_>) -> Result<NodeOutput, NodeError> {
        let result = if let Some(expression) = node.data.get("expression") {
            match expression {
                Value::Bool(b) => *b,
                Value::String(s) => evaluate(s, ctx),
                other => truthy(other),
            }
        } else {
            let name = require_str(node, "variable")?;
            ctx.variable(name).is_some_and(truthy)
        };

        let mut output = NodeOutput::with_handle(if result { handles::TRUE } else { handles::FALSE });
        output.value = Some(Value::Bool(result));
        Ok(output)
    }
}

fn evaluate(expression: &str, ctx: &NodeContext<'_>) -> bool {
    let expression = expression.trim();

    if let Some((left, right)) = expression.split_once("!=") {
        return operand(left, ctx) != operand(right, ctx);
    }
    if let Some((left, right)) = expression.split_once("==") {
        return operand(left, ctx) == operand(right, ctx);
    }
    if let Some(rest) = expression.strip_prefix('!') {
        return !truthy(&operand(rest, ctx));
    }
    truthy(&operand(expression, ctx))
}

/// Operand as comparable JSON: variable value, else literal.
fn operand(raw: &str, ctx: &NodeContext<'_>) -> Value {
    let raw = raw.trim();
    if let Some(value) = ctx.variable(raw) {
        return normalize(value.clone());
    }
    let unquoted = raw
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .or_else(|| raw.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')));
    if let Some(s) = unquoted {
        return normalize(Value::String(s.to_string()));
    }
    normalize(serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string())))
}

/// Compare numbers by value regardless of integer/float representation.
fn normalize(value: Value) -> Value {
    match value {
        Value::Number(n) => n
            .as_f64()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::Number(n)),
        Value::String(s) => match s.trim().parse::<f64>().ok().and_then(serde_json::Number::from_f64) {
            Some(n) => Value::Number(n),
            None => Value::String(s),
        },
        other => other,
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty() && s != "false" && s != "0",
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

//! Handlers that act on the page through the driver.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;
use webpilot_protocols::{node_types, Node, NodeContext, NodeError, NodeHandler, NodeOutput};

use super::{require_str, text_field};

pub struct NavigateHandler;

#[async_trait]
impl NodeHandler for NavigateHandler {
    fn node_type(&self) -> &str {
        node_types::NAVIGATE
    }

    async fn execute(&self, node: &Node, ctx: &NodeContext<'_>) -> Result<NodeOutput, NodeError> {
        let url = require_str(node, "url")?;
        debug!(node = %node.id, %url, "navigate");
        ctx.driver.navigate(url, ctx.timeout).await?;
        Ok(NodeOutput::with_value(url))
    }
}

pub struct ClickHandler;

#[async_trait]
impl NodeHandler for ClickHandler {
    fn node_type(&self) -> &str {
        node_types::CLICK
    }

    async fn execute(&self, node: &Node, ctx: &NodeContext<'_>) -> Result<NodeOutput, NodeError> {
        let selector = require_str(node, "selector")?;
        ctx.driver.click(selector, ctx.timeout).await?;
        Ok(NodeOutput::none())
    }
}

pub struct TypeHandler;

#[async_trait]
impl NodeHandler for TypeHandler {
    fn node_type(&self) -> &str {
        node_types::TYPE
    }

    async fn execute(&self, node: &Node, ctx: &NodeContext<'_>) -> Result<NodeOutput, NodeError> {
        let selector = require_str(node, "selector")?;
        let text = text_field(node, "text").ok_or_else(|| NodeError::MissingField("text".to_string()))?;
        ctx.driver.type_text(selector, &text, ctx.timeout).await?;
        Ok(NodeOutput::none())
    }
}

pub struct ExtractHandler;

#[async_trait]
impl NodeHandler for ExtractHandler {
    fn node_type(&self) -> &str {
        node_types::EXTRACT
    }

    async fn execute(&self, node: &Node, ctx: &NodeContext<'_>) -> Result<NodeOutput, NodeError> {
        let selector = require_str(node, "selector")?;
        let attribute = node.str_field("attribute");
        let value = ctx.driver.extract(selector, attribute, ctx.timeout).await?;
        Ok(NodeOutput::with_value(value))
    }
}

/// Sleeps, waits for an element, or hands control to the user.
pub struct WaitHandler;

#[async_trait]
impl NodeHandler for WaitHandler {
    fn node_type(&self) -> &str {
        node_types::WAIT
    }

    async fn execute(&self, node: &Node, ctx: &NodeContext<'_>) -> Result<NodeOutput, NodeError> {
        if node.data.get("waitForUser").and_then(Value::as_bool).unwrap_or(false) {
            return Ok(NodeOutput::wait_for_user());
        }

        if let Some(selector) = node.selector() {
            ctx.driver.wait_for(selector, ctx.timeout).await?;
            return Ok(NodeOutput::none());
        }

        let duration = match node.data.get("duration") {
            Some(Value::Number(n)) => n.as_u64().or_else(|| n.as_f64().map(|f| f.max(0.0) as u64)),
            Some(Value::String(s)) => s.trim().parse::<u64>().ok(),
            _ => None,
        };
        match duration {
            Some(ms) => {
                tokio::time::sleep(Duration::from_millis(ms)).await;
                Ok(NodeOutput::none())
            }
            None if node.data.contains_key("duration") => Err(NodeError::InvalidField {
                field: "duration".to_string(),
                reason: "expected milliseconds".to_string(),
            }),
            None => Err(NodeError::MissingField("duration".to_string())),
        }
    }
}

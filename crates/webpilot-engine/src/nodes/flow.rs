//! Entry and exit markers.

use async_trait::async_trait;
use webpilot_protocols::{node_types, Node, NodeContext, NodeError, NodeHandler, NodeOutput};

pub struct StartHandler;

#[async_trait]
impl NodeHandler for StartHandler {
    fn node_type(&self) -> &str {
        node_types::START
    }

    async fn execute(&self, _node: &Node, _ctx: &NodeContext<'_>) -> Result<NodeOutput, NodeError> {
        Ok(NodeOutput::none())
    }
}

pub struct EndHandler;

#[async_trait]
impl NodeHandler for EndHandler {
    fn node_type(&self) -> &str {
        node_types::END
    }

    async fn execute(&self, _node: &Node, _ctx: &NodeContext<'_>) -> Result<NodeOutput, NodeError> {
        Ok(NodeOutput::none())
    }
}

//! Node handler registry.
//!
//! Maps node type names to handlers. Built-in handlers are registered by
//! [`NodeRegistry::with_builtins`]; plugins add their own before the engine
//! is constructed.

use std::sync::Arc;

use dashmap::DashMap;
use webpilot_protocols::{node_types, NodeHandler};

use crate::error::RegistryError;
use crate::nodes;

/// Thread-safe map from node type to handler.
pub struct NodeRegistry {
    handlers: DashMap<String, Arc<dyn NodeHandler>>,
}

impl NodeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            handlers: DashMap::new(),
        }
    }

    /// Create a registry holding every built-in handler.
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        for handler in nodes::builtin_handlers() {
            registry.register_or_replace(handler);
        }
        registry
    }

    /// Register a handler.
    ///
    /// Returns an error if a handler for the same node type is already registered.
    pub fn register(&self, handler: Arc<dyn NodeHandler>) -> Result<(), RegistryError> {
        let node_type = handler.node_type().to_string();
        if self.handlers.contains_key(&node_type) {
            return Err(RegistryError::AlreadyRegistered(node_type));
        }
        self.handlers.insert(node_type, handler);
        Ok(())
    }

    /// Register a handler, replacing any existing one for the type.
    pub fn register_or_replace(&self, handler: Arc<dyn NodeHandler>) -> Option<Arc<dyn NodeHandler>> {
        self.handlers.insert(handler.node_type().to_string(), handler)
    }

    /// Unregister a handler by node type.
    pub fn unregister(&self, node_type: &str) -> Result<(), RegistryError> {
        self.handlers
            .remove(node_type)
            .ok_or_else(|| RegistryError::NotFound(node_type.to_string()))?;
        Ok(())
    }

    /// Get the handler for a node type.
    pub fn get(&self, node_type: &str) -> Option<Arc<dyn NodeHandler>> {
        self.handlers.get(node_type).map(|h| h.clone())
    }

    pub fn contains(&self, node_type: &str) -> bool {
        self.handlers.contains_key(node_type)
    }

    /// Registered node types, sorted.
    pub fn node_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.handlers.iter().map(|e| e.key().clone()).collect();
        types.sort();
        types
    }

    /// Types a workflow may use: the registered ones plus `loop`, which the
    /// graph expands without a handler.
    pub fn workflow_types(&self) -> Vec<String> {
        let mut types = self.node_types();
        if !types.iter().any(|t| t == node_types::LOOP) {
            types.push(node_types::LOOP.to_string());
        }
        types
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

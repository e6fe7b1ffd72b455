//! # webpilot Protocols
//!
//! Shared data model and collaborator traits for the webpilot workflow engine.
//! Contains the workflow document, execution state and event types, error
//! analyses, and the interfaces the engine talks to - no engine logic.
//!
//! ## Core Traits
//!
//! - [`AutomationDriver`] - Opaque browser automation capability
//! - [`NodeHandler`] - Executes one node type against a driver
//! - [`LLMProvider`] - Chat completion backend used by LLM-assisted repair

pub mod analysis;
pub mod driver;
pub mod error;
pub mod event;
pub mod execution;
pub mod handler;
pub mod page;
pub mod provider;
pub mod validation;
pub mod workflow;

pub use analysis::{ErrorAnalysis, ErrorCategory, Severity};
pub use driver::AutomationDriver;
pub use error::{DriverError, EngineError, NodeError, ProviderError, RecoveryError};
pub use event::{ExecutionEvent, ExecutionEventType};
pub use execution::{
    BreakpointAt, BreakpointConfig, BreakpointFor, ExecutionState, ExecutionStatus, PauseReason,
};
pub use handler::{lookup_variable, NodeContext, NodeHandler, NodeOutput};
pub use page::{DomContext, PageDebugInfo};
pub use provider::{
    CompletionRequest, CompletionResponse, LLMProvider, Message, MessageRole, Usage,
};
pub use validation::{resolve_handles, validate_workflow};
pub use workflow::{node_types, Edge, Node, Workflow};

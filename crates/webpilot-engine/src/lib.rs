//! # webpilot Engine
//!
//! Runs workflow graphs against an [`AutomationDriver`]: graph model, node
//! registry with the built-in handlers, the execution state machine with
//! breakpoints and cancellation, the event bus, and the DOM snapshot store.
//!
//! [`AutomationDriver`]: webpilot_protocols::AutomationDriver

pub mod engine;
pub mod error;
pub mod event_bus;
pub mod graph;
pub mod mock_driver;
pub mod nodes;
pub mod pause;
pub mod registry;
mod runner;
pub mod snapshot;
pub mod template;

pub use engine::{ExecutionEngine, ExecutionOptions};
pub use error::RegistryError;
pub use event_bus::EventBus;
pub use graph::WorkflowGraph;
pub use mock_driver::MockDriver;
pub use pause::{PauseController, PauseDecision};
pub use registry::NodeRegistry;
pub use snapshot::SnapshotStore;

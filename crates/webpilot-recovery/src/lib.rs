//! # webpilot Recovery
//!
//! Turns a failed run into a repaired workflow.
//!
//! - [`analyzer`] classifies an error message (and trace logs) into
//!   [`ErrorAnalysis`](webpilot_protocols::ErrorAnalysis) records.
//! - [`dom`] infers replacement selectors from a captured page.
//! - [`modifier`] applies field patches to node data.
//! - [`strategy`] holds the DOM, LLM and rule-based fixers, which the
//!   [`RecoveryOrchestrator`] tries in order.

pub mod analyzer;
pub mod dom;
pub mod modifier;
pub mod orchestrator;
pub mod strategy;

pub use analyzer::{analyze, analyze_with_dom};
pub use dom::{update_selectors_for_page, DomIndex, PageUpdate, Resolution, SelectorUpdate};
pub use modifier::{NodePatch, PatchOutcome, WorkflowModifier};
pub use orchestrator::{AttemptOutcome, RecoveryOrchestrator, RecoveryReport, StrategyAttempt};
pub use strategy::{
    DomStrategy, FixContext, FixOutcome, FixStrategy, LlmStrategy, RuleBasedStrategy,
};

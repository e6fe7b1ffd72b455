//! Fix strategies.
//!
//! Each strategy either proposes a repaired workflow or reports that it is
//! unavailable for this failure. Strategies never fail the whole recovery;
//! the orchestrator moves on to the next one.

mod dom;
mod llm;
mod rules;

pub use dom::DomStrategy;
pub use llm::LlmStrategy;
pub use rules::RuleBasedStrategy;

use async_trait::async_trait;
use webpilot_protocols::{ErrorAnalysis, PageDebugInfo, RecoveryError, Workflow};

use crate::dom::{same_page, SelectorUpdate};

/// Inputs shared by every strategy.
#[derive(Debug, Clone, Default)]
pub struct FixContext {
    /// Page snapshots for the failed run, oldest first.
    pub snapshots: Vec<PageDebugInfo>,
    pub error_message: Option<String>,
}

impl FixContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshots(mut self, snapshots: Vec<PageDebugInfo>) -> Self {
        self.snapshots = snapshots;
        self
    }

    pub fn with_snapshot(mut self, snapshot: PageDebugInfo) -> Self {
        self.snapshots.push(snapshot);
        self
    }

    pub fn with_error_message(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    /// Latest snapshot of `page_url`, or the latest of all when no URL is known.
    pub fn snapshot_for(&self, page_url: Option<&str>) -> Option<&PageDebugInfo> {
        self.snapshot_position(page_url).map(|i| &self.snapshots[i])
    }

    /// Snapshot to repair `analysis` against.
    ///
    /// A capture taken for the analysed node wins over URL matching: after a
    /// redirect or a followed link the node's recorded URL is not the page
    /// the browser was on.
    pub fn snapshot_for_analysis(&self, analysis: &ErrorAnalysis) -> Option<&PageDebugInfo> {
        self.analysis_position(analysis).map(|i| &self.snapshots[i])
    }

    pub(crate) fn analysis_position(&self, analysis: &ErrorAnalysis) -> Option<usize> {
        analysis
            .node_id
            .as_deref()
            .and_then(|id| self.snapshots.iter().rposition(|s| s.node_id.as_deref() == Some(id)))
            .or_else(|| self.snapshot_position(analysis.page_url.as_deref()))
    }

    fn snapshot_position(&self, page_url: Option<&str>) -> Option<usize> {
        match page_url {
            Some(url) => self.snapshots.iter().rposition(|s| same_page(&s.url, url)),
            None => self.snapshots.len().checked_sub(1),
        }
    }
}

/// A proposed repair.
#[derive(Debug, Clone)]
pub struct FixOutcome {
    pub workflow: Workflow,
    pub updates: Vec<SelectorUpdate>,
    pub notes: Vec<String>,
}

impl FixOutcome {
    pub fn new(workflow: Workflow) -> Self {
        Self {
            workflow,
            updates: Vec::new(),
            notes: Vec::new(),
        }
    }
}

/// One way of repairing a workflow.
#[async_trait]
pub trait FixStrategy: Send + Sync {
    /// Short name used in reports and logs.
    fn name(&self) -> &str;

    /// Propose a repaired workflow.
    ///
    /// Returns `RecoveryError::StrategyUnavailable` when the strategy has
    /// nothing to offer for these analyses.
    async fn attempt(
        &self,
        workflow: &Workflow,
        analyses: &[ErrorAnalysis],
        ctx: &FixContext,
    ) -> Result<FixOutcome, RecoveryError>;
}

/// Selectors that differ between two versions of a workflow.
pub(crate) fn selector_changes(before: &Workflow, after: &Workflow) -> Vec<SelectorUpdate> {
    after
        .nodes
        .iter()
        .filter_map(|node| {
            let old = before.node(&node.id)?.selector()?;
            let new = node.selector()?;
            (old != new).then(|| SelectorUpdate {
                node_id: node.id.clone(),
                old_selector: old.to_string(),
                new_selector: new.to_string(),
            })
        })
        .collect()
}

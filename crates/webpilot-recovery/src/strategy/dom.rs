//! Selector repair from captured page snapshots.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tracing::{debug, info};
use webpilot_protocols::{ErrorAnalysis, ErrorCategory, RecoveryError, Workflow};

use super::{FixContext, FixOutcome, FixStrategy};
use crate::dom::update_page;
use crate::modifier::WorkflowModifier;

/// Rewrites broken selectors using the DOM captured for the failed run.
///
/// Selector failures are grouped by snapshot: the capture taken for the
/// failing node when there is one, else the latest snapshot of its page.
/// Every node whose selector changed also gets its timeout raised to the
/// configured floor.
pub struct DomStrategy {
    timeout_floor_ms: u64,
}

impl DomStrategy {
    pub fn new(timeout_floor_ms: u64) -> Self {
        Self { timeout_floor_ms }
    }

    fn repair(
        &self,
        workflow: &Workflow,
        failures: &[&ErrorAnalysis],
        ctx: &FixContext,
    ) -> Result<FixOutcome, RecoveryError> {
        let mut outcome = FixOutcome::new(workflow.clone());
        let mut groups: BTreeMap<usize, Vec<ErrorAnalysis>> = BTreeMap::new();
        for analysis in failures {
            match ctx.analysis_position(analysis) {
                Some(position) => groups.entry(position).or_default().push((*analysis).clone()),
                None => {
                    debug!(page = ?analysis.page_url, node = ?analysis.node_id, "No snapshot for failure");
                    let page = analysis.page_url.as_deref().unwrap_or("unknown page");
                    let note = format!("no DOM snapshot for {}", page);
                    if !outcome.notes.contains(&note) {
                        outcome.notes.push(note);
                    }
                }
            }
        }

        for (position, group) in groups {
            let dom = &ctx.snapshots[position];
            let result = update_page(&outcome.workflow, &dom.url, dom, &group);
            outcome.workflow = result.workflow;
            outcome.updates.extend(result.updates);
        }

        if outcome.updates.is_empty() {
            return Err(RecoveryError::StrategyUnavailable(
                "no replacement selector found in the captured DOM".to_string(),
            ));
        }

        let floors: Vec<_> = outcome
            .updates
            .iter()
            .filter_map(|u| WorkflowModifier::timeout_floor(&outcome.workflow, &u.node_id, self.timeout_floor_ms))
            .collect();
        outcome.workflow = WorkflowModifier::apply(&outcome.workflow, &floors).workflow;

        info!(updates = outcome.updates.len(), "DOM repair proposed");
        Ok(outcome)
    }
}

#[async_trait]
impl FixStrategy for DomStrategy {
    fn name(&self) -> &str {
        "dom"
    }

    async fn attempt(
        &self,
        workflow: &Workflow,
        analyses: &[ErrorAnalysis],
        ctx: &FixContext,
    ) -> Result<FixOutcome, RecoveryError> {
        if ctx.snapshots.is_empty() {
            return Err(RecoveryError::StrategyUnavailable("no DOM snapshot captured".to_string()));
        }
        let failures: Vec<&ErrorAnalysis> = analyses
            .iter()
            .filter(|a| a.category == ErrorCategory::Selector)
            .collect();
        if failures.is_empty() {
            return Err(RecoveryError::StrategyUnavailable("no selector errors".to_string()));
        }
        self.repair(workflow, &failures, ctx)
    }
}

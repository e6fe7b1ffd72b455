//! Deterministic per-category patches.

use async_trait::async_trait;
use tracing::info;
use webpilot_protocols::{ErrorAnalysis, ErrorCategory, RecoveryError, Workflow};

use super::{selector_changes, FixContext, FixOutcome, FixStrategy};
use crate::modifier::{NodePatch, WorkflowModifier};

/// Longest timeout the rules will write.
const MAX_TIMEOUT_MS: u64 = 300_000;

/// Last-resort repairs that need neither a page snapshot nor a model.
///
/// - `selector`: use the analysis' `correct_selector` when there is one and
///   raise the timeout to the floor; without one, raise the timeout.
/// - `timeout`: raise the timeout (to the floor, or double it once above).
/// - `configuration`: backfill a missing `label` from the node type. Missing
///   required fields are reported, not invented.
/// - `missing_node`: reported as an unsupported automatic repair.
pub struct RuleBasedStrategy {
    timeout_floor_ms: u64,
}

impl RuleBasedStrategy {
    pub fn new(timeout_floor_ms: u64) -> Self {
        Self { timeout_floor_ms }
    }

    fn raised_timeout(&self, workflow: &Workflow, node_id: &str) -> Option<NodePatch> {
        let current = workflow.node(node_id)?.timeout_ms();
        let raised = match current {
            Some(ms) if ms >= self.timeout_floor_ms => ms.saturating_mul(2).min(MAX_TIMEOUT_MS),
            _ => self.timeout_floor_ms,
        };
        (Some(raised) != current).then(|| NodePatch::timeout(node_id, raised))
    }

    fn patches_for(
        &self,
        workflow: &Workflow,
        analysis: &ErrorAnalysis,
        notes: &mut Vec<String>,
    ) -> Vec<NodePatch> {
        if analysis.category == ErrorCategory::MissingNode {
            notes.push(format!(
                "{}: unsupported automatic repair",
                describe(analysis.node_id.as_deref())
            ));
            return Vec::new();
        }

        let Some(node) = analysis.node_id.as_deref().and_then(|id| workflow.node(id)) else {
            if analysis.category != ErrorCategory::Other {
                notes.push(format!(
                    "{} error without a known node; no rule applies",
                    analysis.category.as_str()
                ));
            }
            return Vec::new();
        };

        let mut patches = Vec::new();
        match analysis.category {
            ErrorCategory::Selector => match analysis.correct_selector.as_deref() {
                Some(correct) => {
                    if node.selector() != Some(correct) {
                        patches.push(NodePatch::selector(node.id.clone(), correct));
                    }
                    patches.extend(WorkflowModifier::timeout_floor(workflow, &node.id, self.timeout_floor_ms));
                }
                None => patches.extend(self.raised_timeout(workflow, &node.id)),
            },
            ErrorCategory::Timeout => patches.extend(self.raised_timeout(workflow, &node.id)),
            ErrorCategory::Configuration => {
                if !node.has_field("label") {
                    patches.push(NodePatch::new(node.id.clone(), "label", node.node_type.clone()));
                }
                let missing = node.missing_required_fields();
                if !missing.is_empty() {
                    notes.push(format!(
                        "node '{}' still needs {}; supply it manually",
                        node.id,
                        missing.join(", ")
                    ));
                }
            }
            ErrorCategory::MissingNode | ErrorCategory::Other => {}
        }
        patches
    }
}

#[async_trait]
impl FixStrategy for RuleBasedStrategy {
    fn name(&self) -> &str {
        "rules"
    }

    async fn attempt(
        &self,
        workflow: &Workflow,
        analyses: &[ErrorAnalysis],
        _ctx: &FixContext,
    ) -> Result<FixOutcome, RecoveryError> {
        let mut notes = Vec::new();
        let mut patches: Vec<NodePatch> = Vec::new();
        for analysis in analyses {
            for patch in self.patches_for(workflow, analysis, &mut notes) {
                if !patches.contains(&patch) {
                    patches.push(patch);
                }
            }
        }

        if patches.is_empty() {
            return Err(RecoveryError::StrategyUnavailable(match notes.first() {
                Some(note) => format!("no rule applies ({})", note),
                None => "no rule applies".to_string(),
            }));
        }

        let applied = WorkflowModifier::apply(workflow, &patches);
        info!(patches = applied.applied.len(), "Rule-based repair proposed");
        let mut outcome = FixOutcome::new(applied.workflow);
        outcome.updates = selector_changes(workflow, &outcome.workflow);
        outcome.notes = notes;
        Ok(outcome)
    }
}

fn describe(node_id: Option<&str>) -> String {
    match node_id {
        Some(id) => format!("node '{}'", id),
        None => "missing node".to_string(),
    }
}

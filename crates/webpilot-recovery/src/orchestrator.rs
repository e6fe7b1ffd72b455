//! Ordered fix strategies with candidate validation.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};
use webpilot_config::RecoveryConfig;
use webpilot_protocols::{
    validate_workflow, ErrorAnalysis, ErrorCategory, LLMProvider, RecoveryError, Workflow,
};

use crate::dom::SelectorUpdate;
use crate::strategy::{DomStrategy, FixContext, FixStrategy, LlmStrategy, RuleBasedStrategy};

/// What happened to one strategy during a recovery attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum AttemptOutcome {
    Applied,
    Unavailable(String),
    Rejected(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategyAttempt {
    pub strategy: String,
    pub outcome: AttemptOutcome,
}

/// Result of a recovery attempt.
///
/// When nothing succeeded `workflow` is the input, unchanged, and
/// `recovered` is false.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoveryReport {
    pub workflow: Workflow,
    pub recovered: bool,
    pub strategy: Option<String>,
    pub updates: Vec<SelectorUpdate>,
    pub attempts: Vec<StrategyAttempt>,
    pub notes: Vec<String>,
}

/// Runs strategies in order and keeps the first structurally valid candidate.
pub struct RecoveryOrchestrator {
    strategies: Vec<Arc<dyn FixStrategy>>,
    node_types: Option<HashSet<String>>,
}

impl RecoveryOrchestrator {
    pub fn new() -> Self {
        Self {
            strategies: Vec::new(),
            node_types: None,
        }
    }

    /// Only accept candidates whose nodes all have one of these types.
    ///
    /// Without this, any node type passes validation.
    pub fn with_node_types<I, S>(mut self, node_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.node_types = Some(node_types.into_iter().map(Into::into).collect());
        self
    }

    /// Append a strategy; earlier strategies are tried first.
    pub fn with_strategy(mut self, strategy: Arc<dyn FixStrategy>) -> Self {
        self.strategies.push(strategy);
        self
    }

    /// DOM, then LLM (when a provider is given), then rules, as enabled.
    pub fn from_config(
        config: &RecoveryConfig,
        provider: Option<Arc<dyn LLMProvider>>,
        model: Option<String>,
    ) -> Self {
        let mut orchestrator = Self::new();
        if config.dom_enabled {
            orchestrator = orchestrator.with_strategy(Arc::new(DomStrategy::new(config.timeout_floor_ms)));
        }
        if config.llm_enabled {
            if let Some(provider) = provider {
                let mut llm = LlmStrategy::new(provider);
                if let Some(model) = model {
                    llm = llm.with_model(model);
                }
                orchestrator = orchestrator.with_strategy(Arc::new(llm));
            }
        }
        if config.rules_enabled {
            orchestrator =
                orchestrator.with_strategy(Arc::new(RuleBasedStrategy::new(config.timeout_floor_ms)));
        }
        orchestrator
    }

    pub fn strategy_names(&self) -> Vec<String> {
        self.strategies.iter().map(|s| s.name().to_string()).collect()
    }

    /// Try every strategy until one yields a valid, changed workflow.
    ///
    /// Strategy failures are recorded in the report and never abort the
    /// attempt.
    pub async fn fix(
        &self,
        workflow: &Workflow,
        analyses: &[ErrorAnalysis],
        ctx: &FixContext,
    ) -> RecoveryReport {
        let mut report = RecoveryReport {
            workflow: workflow.clone(),
            recovered: false,
            strategy: None,
            updates: Vec::new(),
            attempts: Vec::new(),
            notes: unrepairable_notes(analyses),
        };

        for strategy in &self.strategies {
            let name = strategy.name().to_string();
            let outcome = match strategy.attempt(workflow, analyses, ctx).await {
                Ok(candidate) => match self.check_candidate(&name, workflow, &candidate.workflow) {
                    Ok(()) => {
                        info!(strategy = %name, updates = candidate.updates.len(), "Recovery candidate accepted");
                        report.workflow = candidate.workflow;
                        report.recovered = true;
                        report.strategy = Some(name.clone());
                        report.updates = candidate.updates;
                        extend_unique(&mut report.notes, candidate.notes);
                        report.attempts.push(StrategyAttempt {
                            strategy: name,
                            outcome: AttemptOutcome::Applied,
                        });
                        return report;
                    }
                    Err(RecoveryError::InvalidCandidate { reason, .. }) => {
                        warn!(strategy = %name, %reason, "Recovery candidate rejected");
                        AttemptOutcome::Rejected(reason)
                    }
                    Err(e) => AttemptOutcome::Rejected(e.to_string()),
                },
                Err(RecoveryError::StrategyUnavailable(reason)) => {
                    debug!(strategy = %name, %reason, "Strategy unavailable");
                    AttemptOutcome::Unavailable(reason)
                }
                Err(e) => {
                    warn!(strategy = %name, error = %e, "Strategy failed");
                    AttemptOutcome::Unavailable(e.to_string())
                }
            };
            report.attempts.push(StrategyAttempt { strategy: name, outcome });
        }

        info!(tried = report.attempts.len(), "Recovery did not produce a fix");
        report
    }

    /// [`fix`](Self::fix), failing with `RecoveryExhausted` when nothing applied.
    pub async fn try_fix(
        &self,
        workflow: &Workflow,
        analyses: &[ErrorAnalysis],
        ctx: &FixContext,
    ) -> Result<RecoveryReport, RecoveryError> {
        let report = self.fix(workflow, analyses, ctx).await;
        if report.recovered {
            return Ok(report);
        }
        let summary = if report.attempts.is_empty() {
            "no strategies configured".to_string()
        } else {
            report
                .attempts
                .iter()
                .map(|a| match &a.outcome {
                    AttemptOutcome::Applied => format!("{}: applied", a.strategy),
                    AttemptOutcome::Unavailable(reason) | AttemptOutcome::Rejected(reason) => {
                        format!("{}: {}", a.strategy, reason)
                    }
                })
                .collect::<Vec<_>>()
                .join("; ")
        };
        Err(RecoveryError::RecoveryExhausted(summary))
    }

    fn check_candidate(&self, strategy: &str, original: &Workflow, candidate: &Workflow) -> Result<(), RecoveryError> {
        let rejected = |reason: String| RecoveryError::InvalidCandidate {
            strategy: strategy.to_string(),
            reason,
        };
        validate_workflow(candidate).map_err(|e| rejected(e.to_string()))?;
        if let Some(known) = &self.node_types {
            if let Some(node) = candidate.nodes.iter().find(|n| !known.contains(&n.node_type)) {
                return Err(rejected(format!("node '{}' has unknown type '{}'", node.id, node.node_type)));
            }
        }
        if candidate == original {
            return Err(rejected("candidate is identical to the input".to_string()));
        }
        Ok(())
    }
}

impl Default for RecoveryOrchestrator {
    fn default() -> Self {
        Self::from_config(&RecoveryConfig::default(), None, None)
    }
}

fn unrepairable_notes(analyses: &[ErrorAnalysis]) -> Vec<String> {
    let mut seen = HashSet::new();
    analyses
        .iter()
        .filter(|a| a.category == ErrorCategory::MissingNode)
        .filter(|a| seen.insert(a.node_id.clone()))
        .map(|a| match &a.node_id {
            Some(id) => format!("node '{}': unsupported automatic repair", id),
            None => "missing node: unsupported automatic repair".to_string(),
        })
        .collect()
}

fn extend_unique(notes: &mut Vec<String>, more: Vec<String>) {
    for note in more {
        if !notes.contains(&note) {
            notes.push(note);
        }
    }
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;

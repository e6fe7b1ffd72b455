//! Execution state and breakpoint configuration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::workflow::Node;

/// Status of the (single) execution owned by an engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    #[default]
    Idle,
    Running,
    Paused,
    Completed,
    Error,
    Stopped,
}

impl ExecutionStatus {
    /// Whether the run has finished (successfully or not).
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Error | Self::Stopped)
    }

    /// Whether the run still holds the engine (running or paused).
    pub fn is_active(self) -> bool {
        matches!(self, Self::Running | Self::Paused)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Error => "error",
            Self::Stopped => "stopped",
        }
    }
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why traversal is suspended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PauseReason {
    /// A `wait` node asked for the user to continue.
    WaitPause,
    /// A breakpoint matched.
    Breakpoint,
}

/// Snapshot of the execution state as exposed to status pollers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionState {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_id: Option<String>,

    pub status: ExecutionStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_node_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub paused_node_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub pause_reason: Option<PauseReason>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl ExecutionState {
    /// State before any execution.
    pub fn idle() -> Self {
        Self::default()
    }

    /// Fresh state for a new run.
    pub fn running(execution_id: impl Into<String>) -> Self {
        Self {
            execution_id: Some(execution_id.into()),
            status: ExecutionStatus::Running,
            started_at: Some(Utc::now()),
            ..Self::default()
        }
    }

    /// Whether this state belongs to the given run.
    pub fn is_run(&self, execution_id: &str) -> bool {
        self.execution_id.as_deref() == Some(execution_id)
    }
}

/// Where breakpoints trigger relative to node dispatch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BreakpointAt {
    #[default]
    Pre,
    Post,
    Both,
}

/// Which nodes breakpoints apply to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BreakpointFor {
    #[default]
    All,
    /// Only nodes with `data.breakpoint == true`.
    Marked,
}

/// Breakpoint settings supplied when an execution starts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BreakpointConfig {
    pub enabled: bool,
    pub breakpoint_at: BreakpointAt,
    pub breakpoint_for: BreakpointFor,
}

impl BreakpointConfig {
    /// Breakpoints on every node, before dispatch.
    pub fn pre_all() -> Self {
        Self {
            enabled: true,
            breakpoint_at: BreakpointAt::Pre,
            breakpoint_for: BreakpointFor::All,
        }
    }

    fn targets(&self, node: &Node) -> bool {
        self.enabled
            && match self.breakpoint_for {
                BreakpointFor::All => true,
                BreakpointFor::Marked => node.is_breakpoint_marked(),
            }
    }

    /// Whether to pause before dispatching the node.
    pub fn pauses_before(&self, node: &Node) -> bool {
        self.targets(node) && matches!(self.breakpoint_at, BreakpointAt::Pre | BreakpointAt::Both)
    }

    /// Whether to pause after the node completed.
    pub fn pauses_after(&self, node: &Node) -> bool {
        self.targets(node) && matches!(self.breakpoint_at, BreakpointAt::Post | BreakpointAt::Both)
    }
}

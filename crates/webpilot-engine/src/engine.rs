//! Execution state machine.
//!
//! One [`ExecutionEngine`] owns at most one active execution. Traversal runs on
//! a spawned task; status reads and `stop`/`resume`/`skip` come from other
//! tasks. Every state transition happens under a single mutex, and each one is
//! mirrored into a `watch` channel for callers that wait instead of polling.

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use webpilot_config::EngineConfig;
use webpilot_protocols::{
    AutomationDriver, BreakpointConfig, EngineError, ExecutionState, ExecutionStatus,
    PageDebugInfo, Workflow,
};

use crate::event_bus::EventBus;
use crate::graph::WorkflowGraph;
use crate::pause::{PauseController, PauseDecision};
use crate::registry::NodeRegistry;
use crate::runner::Runner;
use crate::snapshot::SnapshotStore;

/// Per-run options supplied with `execute`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutionOptions {
    pub breakpoint_config: BreakpointConfig,
    /// Keep a bounded trace of the run (see [`ExecutionEngine::trace_logs`]).
    pub trace_logs: bool,
    /// Ask the driver to record the session.
    pub record_session: bool,
}

impl ExecutionOptions {
    pub fn with_breakpoints(mut self, config: BreakpointConfig) -> Self {
        self.breakpoint_config = config;
        self
    }

    pub fn with_trace_logs(mut self, enabled: bool) -> Self {
        self.trace_logs = enabled;
        self
    }

    pub fn with_record_session(mut self, enabled: bool) -> Self {
        self.record_session = enabled;
        self
    }
}

/// Shared control block: the state behind the mutex plus its watch mirror.
pub(crate) struct Control {
    inner: Mutex<Inner>,
    status: watch::Sender<ExecutionState>,
}

pub(crate) struct Inner {
    pub(crate) state: ExecutionState,
    pub(crate) pause: PauseController,
    cancel: CancellationToken,
    trace: TraceLog,
}

impl Inner {
    pub(crate) fn trace(&mut self, line: String) {
        self.trace.push(line);
    }
}

struct TraceLog {
    enabled: bool,
    limit: usize,
    lines: VecDeque<String>,
}

impl TraceLog {
    fn new(enabled: bool, limit: usize) -> Self {
        Self {
            enabled,
            limit,
            lines: VecDeque::new(),
        }
    }

    fn push(&mut self, line: String) {
        if !self.enabled || self.limit == 0 {
            return;
        }
        while self.lines.len() >= self.limit {
            self.lines.pop_front();
        }
        self.lines.push_back(line);
    }
}

impl Control {
    fn new() -> Self {
        let (status, _) = watch::channel(ExecutionState::idle());
        Self {
            inner: Mutex::new(Inner {
                state: ExecutionState::idle(),
                pause: PauseController::new(),
                cancel: CancellationToken::new(),
                trace: TraceLog::new(false, 0),
            }),
            status,
        }
    }

    /// Apply a transition on behalf of a run.
    ///
    /// Returns `None` without touching anything when the run is stale (a newer
    /// execution replaced it) or already terminal.
    pub(crate) fn apply<R>(&self, execution_id: &str, f: impl FnOnce(&mut Inner) -> R) -> Option<R> {
        let mut inner = self.inner.lock();
        if !inner.state.is_run(execution_id) || inner.state.status.is_terminal() {
            return None;
        }
        let result = f(&mut inner);
        self.status.send_replace(inner.state.clone());
        Some(result)
    }

    /// Append a trace line for a run, if tracing is on.
    pub(crate) fn trace(&self, execution_id: &str, line: String) {
        let mut inner = self.inner.lock();
        if inner.state.is_run(execution_id) {
            inner.trace(line);
        }
    }
}

/// Runs workflows against an automation driver.
pub struct ExecutionEngine {
    registry: Arc<NodeRegistry>,
    driver: Arc<dyn AutomationDriver>,
    events: Arc<EventBus>,
    snapshots: Arc<SnapshotStore>,
    config: EngineConfig,
    control: Arc<Control>,
}

impl ExecutionEngine {
    /// Create an engine with default limits.
    pub fn new(driver: Arc<dyn AutomationDriver>, registry: Arc<NodeRegistry>) -> Self {
        Self::with_config(driver, registry, EngineConfig::default())
    }

    /// Create an engine with explicit limits.
    pub fn with_config(
        driver: Arc<dyn AutomationDriver>,
        registry: Arc<NodeRegistry>,
        config: EngineConfig,
    ) -> Self {
        Self {
            registry,
            driver,
            events: Arc::new(EventBus::new(config.event_buffer, config.event_history)),
            snapshots: Arc::new(SnapshotStore::new(config.snapshot_retention)),
            config,
            control: Arc::new(Control::new()),
        }
    }

    /// Use a shared event bus.
    pub fn with_event_bus(mut self, events: Arc<EventBus>) -> Self {
        self.events = events;
        self
    }

    /// Use a shared snapshot store.
    pub fn with_snapshot_store(mut self, snapshots: Arc<SnapshotStore>) -> Self {
        self.snapshots = snapshots;
        self
    }

    /// Start executing a workflow and return its execution id.
    ///
    /// Fails with `ExecutionInProgress` while another run is running or
    /// paused, and with a structural error (`InvalidGraph`, `GraphStructure`,
    /// `UnknownNodeType`) before any traversal. Must be called from within a
    /// Tokio runtime.
    pub fn execute(&self, workflow: Workflow, options: ExecutionOptions) -> Result<String, EngineError> {
        self.ensure_idle()?;
        let graph = Arc::new(WorkflowGraph::build(workflow, &self.registry)?);

        let execution_id = uuid::Uuid::new_v4().to_string();
        let cancel = CancellationToken::new();
        {
            let mut inner = self.control.inner.lock();
            if inner.state.status.is_active() {
                return Err(EngineError::ExecutionInProgress(
                    inner.state.execution_id.clone().unwrap_or_default(),
                ));
            }
            inner.state = ExecutionState::running(&execution_id);
            inner.pause = PauseController::new();
            inner.cancel = cancel.clone();
            inner.trace = TraceLog::new(options.trace_logs, self.config.trace_log_limit);
            self.control.status.send_replace(inner.state.clone());
        }

        info!(
            execution = %execution_id,
            nodes = graph.len(),
            breakpoints = options.breakpoint_config.enabled,
            "Starting workflow execution"
        );

        let runner = Runner {
            execution_id: execution_id.clone(),
            graph,
            registry: Arc::clone(&self.registry),
            driver: Arc::clone(&self.driver),
            events: Arc::clone(&self.events),
            snapshots: Arc::clone(&self.snapshots),
            control: Arc::clone(&self.control),
            options,
            config: self.config.clone(),
            cancel,
            variables: Default::default(),
            loops: Default::default(),
            loop_stack: Vec::new(),
        };
        tokio::spawn(runner.run());

        Ok(execution_id)
    }

    fn ensure_idle(&self) -> Result<(), EngineError> {
        let inner = self.control.inner.lock();
        if inner.state.status.is_active() {
            return Err(EngineError::ExecutionInProgress(
                inner.state.execution_id.clone().unwrap_or_default(),
            ));
        }
        Ok(())
    }

    /// Current execution state.
    pub fn status(&self) -> ExecutionState {
        self.control.inner.lock().state.clone()
    }

    /// Watch state transitions.
    pub fn subscribe_status(&self) -> watch::Receiver<ExecutionState> {
        self.control.status.subscribe()
    }

    /// Wait until the state satisfies `predicate`, up to `timeout`.
    pub async fn wait_until(
        &self,
        timeout: Duration,
        mut predicate: impl FnMut(&ExecutionState) -> bool,
    ) -> Option<ExecutionState> {
        let mut rx = self.subscribe_status();
        match tokio::time::timeout(timeout, rx.wait_for(|s| predicate(s))).await {
            Ok(Ok(state)) => Some(state.clone()),
            _ => None,
        }
    }

    /// Wait for the current run to reach a terminal status.
    pub async fn wait_for_terminal(&self, timeout: Duration) -> Option<ExecutionState> {
        self.wait_until(timeout, |s| s.status.is_terminal()).await
    }

    /// Stop the active run.
    ///
    /// Cancels any in-flight dispatch and releases a pending pause. Returns
    /// `false` (and changes nothing) when no run is active.
    pub fn stop(&self) -> bool {
        let mut inner = self.control.inner.lock();
        if !inner.state.status.is_active() {
            return false;
        }
        inner.state.status = ExecutionStatus::Stopped;
        inner.state.paused_node_id = None;
        inner.state.pause_reason = None;
        inner.state.finished_at = Some(Utc::now());
        inner.pause.clear();
        inner.cancel.cancel();
        inner.trace.push(format!("{} execution stopped", Utc::now().to_rfc3339()));
        self.control.status.send_replace(inner.state.clone());

        info!(execution = ?inner.state.execution_id, "Execution stopped");
        true
    }

    /// Resume a paused run.
    pub fn resume(&self) -> Result<(), EngineError> {
        self.release(PauseDecision::Resume)
    }

    /// Continue a paused run without dispatching the paused node.
    pub fn skip(&self) -> Result<(), EngineError> {
        self.release(PauseDecision::Skip)
    }

    fn release(&self, decision: PauseDecision) -> Result<(), EngineError> {
        let mut inner = self.control.inner.lock();
        if inner.state.status != ExecutionStatus::Paused || !inner.pause.release(decision) {
            return Err(EngineError::NotPaused);
        }
        let node = inner.state.paused_node_id.take();
        inner.state.pause_reason = None;
        inner.state.status = ExecutionStatus::Running;
        inner.trace.push(format!(
            "{} {:?} at {}",
            Utc::now().to_rfc3339(),
            decision,
            node.as_deref().unwrap_or("-")
        ));
        self.control.status.send_replace(inner.state.clone());

        info!(execution = ?inner.state.execution_id, node = ?node, ?decision, "Execution released");
        Ok(())
    }

    /// Capture the page of the paused run and file it under the execution.
    pub async fn capture_dom(&self) -> Result<PageDebugInfo, EngineError> {
        let (execution_id, node_id) = {
            let inner = self.control.inner.lock();
            if inner.state.status != ExecutionStatus::Paused {
                return Err(EngineError::NotPaused);
            }
            (
                inner.state.execution_id.clone().unwrap_or_default(),
                inner.state.paused_node_id.clone(),
            )
        };

        let mut snapshot = self.driver.snapshot().await?;
        if snapshot.node_id.is_none() {
            snapshot.node_id = node_id;
        }
        self.snapshots.record(&execution_id, snapshot.clone());
        Ok(snapshot)
    }

    /// Trace lines of the latest run (empty unless `trace_logs` was requested).
    pub fn trace_logs(&self) -> Vec<String> {
        self.control.inner.lock().trace.lines.iter().cloned().collect()
    }

    /// Snapshots filed for an execution.
    pub fn snapshots_for(&self, execution_id: &str) -> Vec<PageDebugInfo> {
        self.snapshots.get(execution_id)
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    pub fn snapshot_store(&self) -> &Arc<SnapshotStore> {
        &self.snapshots
    }

    pub fn registry(&self) -> &Arc<NodeRegistry> {
        &self.registry
    }

    pub fn driver(&self) -> &Arc<dyn AutomationDriver> {
        &self.driver
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Validate a workflow against this engine's registry without running it.
    pub fn validate(&self, workflow: &Workflow) -> Result<(), EngineError> {
        WorkflowGraph::build(workflow.clone(), &self.registry).map(|_| ())
    }
}

impl Drop for ExecutionEngine {
    fn drop(&mut self) {
        let inner = self.control.inner.lock();
        if inner.state.status.is_active() {
            warn!(execution = ?inner.state.execution_id, "Engine dropped with an active execution; cancelling");
            inner.cancel.cancel();
        }
    }
}

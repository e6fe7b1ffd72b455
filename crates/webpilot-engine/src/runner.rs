//! Traversal task for one execution.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use webpilot_config::EngineConfig;
use webpilot_protocols::validation::handles;
use webpilot_protocols::{
    lookup_variable, node_types, AutomationDriver, EngineError, ExecutionEvent, ExecutionStatus,
    Node, NodeContext, NodeError, NodeOutput, PauseReason,
};

use crate::engine::{Control, ExecutionOptions};
use crate::event_bus::EventBus;
use crate::graph::WorkflowGraph;
use crate::pause::PauseDecision;
use crate::registry::NodeRegistry;
use crate::snapshot::SnapshotStore;
use crate::template;

/// Upper bound on the best-effort DOM capture after a node failure.
const FAILURE_SNAPSHOT_TIMEOUT: Duration = Duration::from_secs(5);

/// Iteration cursor of an active loop node.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct LoopState {
    index: u64,
}

enum Outcome {
    Completed,
    Failed(EngineError),
    TimedOut,
    Cancelled,
}

pub(crate) struct Runner {
    pub(crate) execution_id: String,
    pub(crate) graph: Arc<WorkflowGraph>,
    pub(crate) registry: Arc<NodeRegistry>,
    pub(crate) driver: Arc<dyn AutomationDriver>,
    pub(crate) events: Arc<EventBus>,
    pub(crate) snapshots: Arc<SnapshotStore>,
    pub(crate) control: Arc<Control>,
    pub(crate) options: ExecutionOptions,
    pub(crate) config: EngineConfig,
    pub(crate) cancel: CancellationToken,
    pub(crate) variables: HashMap<String, Value>,
    pub(crate) loops: HashMap<String, LoopState>,
    /// Active loop node ids, innermost last.
    pub(crate) loop_stack: Vec<String>,
}

impl Runner {
    pub(crate) async fn run(mut self) {
        if self.options.record_session {
            if let Err(e) = self.driver.set_recording(true).await {
                warn!(execution = %self.execution_id, error = %e, "Failed to start session recording");
            }
        }

        let cancel = self.cancel.clone();
        let deadline = self.config.max_duration();
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Outcome::Cancelled,
            result = tokio::time::timeout(deadline, self.traverse()) => match result {
                Ok(Ok(())) => Outcome::Completed,
                Ok(Err(e)) => Outcome::Failed(e),
                Err(_) => Outcome::TimedOut,
            },
        };

        match outcome {
            Outcome::Completed => {
                if self.finish(ExecutionStatus::Completed, None, ExecutionEvent::execution_complete()) {
                    info!(execution = %self.execution_id, "Workflow completed successfully");
                }
            }
            Outcome::Failed(err) => {
                let message = err.to_string();
                let mut event = ExecutionEvent::execution_error(message.clone());
                if let EngineError::ActionFailure { node_id, .. } = &err {
                    event = event.with_node(node_id.clone());
                }
                if self.finish(ExecutionStatus::Error, Some(message.clone()), event) {
                    error!(execution = %self.execution_id, error = %message, "Workflow failed");
                }
            }
            Outcome::TimedOut => {
                let message = format!(
                    "Execution exceeded maximum duration of {}s",
                    self.config.max_duration_secs
                );
                // The timed-out dispatch never reported, so the node is still current.
                let node_id = self
                    .control
                    .apply(&self.execution_id, |inner| inner.state.current_node_id.clone())
                    .flatten();
                let mut event = ExecutionEvent::execution_error(message.clone());
                if let Some(node_id) = node_id {
                    event = event.with_node(node_id);
                }
                if self.finish(ExecutionStatus::Error, Some(message.clone()), event) {
                    error!(execution = %self.execution_id, "{}", message);
                }
            }
            Outcome::Cancelled => {
                debug!(execution = %self.execution_id, "Traversal cancelled");
            }
        }

        if self.options.record_session {
            if let Err(e) = self.driver.set_recording(false).await {
                warn!(execution = %self.execution_id, error = %e, "Failed to stop session recording");
            }
        }
    }

    async fn traverse(&mut self) -> Result<(), EngineError> {
        let mut cursor = Some(self.graph.start_id().to_string());
        while let Some(node_id) = cursor {
            cursor = self.visit(&node_id).await?;
        }
        Ok(())
    }

    /// Run one node and return the next node to visit.
    async fn visit(&mut self, node_id: &str) -> Result<Option<String>, EngineError> {
        let graph = Arc::clone(&self.graph);
        let node = graph.node(node_id).ok_or_else(|| {
            EngineError::GraphStructure(format!("edge target '{}' is not a node", node_id))
        })?;

        self.control.apply(&self.execution_id, |inner| {
            inner.state.current_node_id = Some(node_id.to_string());
        });
        self.emit(ExecutionEvent::node_start(node_id));
        debug!(execution = %self.execution_id, node = node_id, node_type = %node.node_type, "Visiting node");

        let breakpoints = self.options.breakpoint_config;
        if breakpoints.pauses_before(node)
            && self.pause(node_id, PauseReason::Breakpoint).await? == PauseDecision::Skip
        {
            info!(execution = %self.execution_id, node = node_id, "Node skipped by user");
            self.emit(ExecutionEvent::node_complete(node_id).with_message("Skipped by user"));
            let handle = self.skip_handle(node);
            return Ok(self.advance(node, handle));
        }

        let output = match self.run_node(node).await {
            Ok(output) => output,
            Err(err) => return Err(self.fail(node_id, err).await),
        };
        self.store_output(node, &output);
        self.emit(ExecutionEvent::node_complete(node_id));

        if output.wait_for_user {
            self.pause(node_id, PauseReason::WaitPause).await?;
        }
        if breakpoints.pauses_after(node) {
            self.pause(node_id, PauseReason::Breakpoint).await?;
        }

        Ok(self.advance(node, output.handle.as_deref()))
    }

    async fn run_node(&mut self, node: &Node) -> Result<NodeOutput, NodeError> {
        if node.node_type == node_types::LOOP {
            return self.step_loop(node);
        }

        let handler = self.registry.get(&node.node_type).ok_or_else(|| {
            NodeError::Unsupported(format!("no handler for node type '{}'", node.node_type))
        })?;
        let resolved = template::resolve_node(node, &self.variables);
        let timeout = resolved
            .timeout_ms()
            .map(Duration::from_millis)
            .unwrap_or_else(|| self.config.default_node_timeout());

        let ctx = NodeContext {
            execution_id: &self.execution_id,
            driver: &self.driver,
            variables: &self.variables,
            timeout,
        };
        handler.execute(&resolved, &ctx).await
    }

    /// Advance a loop node by one visit.
    ///
    /// The bound is evaluated on every visit. The first visit starts the loop;
    /// later visits come back from the body and move to the next iteration.
    fn step_loop(&mut self, node: &Node) -> Result<NodeOutput, NodeError> {
        let items = loop_items(node, &self.variables, self.config.max_loop_iterations)?;

        let index = match self.loops.get_mut(&node.id) {
            Some(state) => {
                state.index += 1;
                state.index
            }
            None => {
                self.loops.insert(node.id.clone(), LoopState::default());
                self.loop_stack.push(node.id.clone());
                0
            }
        };

        let total = items.len();
        if index < total as u64 {
            let item = items.get(index as usize).cloned().unwrap_or(Value::Null);
            let cursor = json!({ "index": index, "item": item, "total": total });
            self.variables.insert(node.id.clone(), cursor.clone());
            self.variables.insert("loop".to_string(), cursor);
            debug!(execution = %self.execution_id, node = %node.id, index, total, "Loop iteration");
            Ok(NodeOutput::with_handle(handles::BODY))
        } else {
            self.end_loop(&node.id);
            Ok(NodeOutput::with_handle(handles::EXIT))
        }
    }

    fn end_loop(&mut self, loop_id: &str) {
        self.loops.remove(loop_id);
        self.loop_stack.retain(|id| id != loop_id);
        match self.loop_stack.last().and_then(|outer| self.variables.get(outer)).cloned() {
            Some(outer) => {
                self.variables.insert("loop".to_string(), outer);
            }
            None => {
                self.variables.remove("loop");
            }
        }
    }

    fn store_output(&mut self, node: &Node, output: &NodeOutput) {
        let Some(value) = &output.value else {
            return;
        };
        self.variables.insert(node.id.clone(), value.clone());
        if let Some(name) = node.str_field("outputVariable") {
            self.variables.insert(name.to_string(), value.clone());
        }
    }

    /// Next node after `node`, or the innermost active loop at a path end.
    fn advance(&self, node: &Node, handle: Option<&str>) -> Option<String> {
        let next = if node.node_type == node_types::END {
            None
        } else {
            self.graph.next(&node.id, handle)
        };
        next.map(str::to_string)
            .or_else(|| self.loop_stack.last().cloned())
    }

    /// Output followed when a branch node is skipped.
    fn skip_handle(&mut self, node: &Node) -> Option<&'static str> {
        match node.node_type.as_str() {
            node_types::LOOP => {
                self.end_loop(&node.id);
                Some(handles::EXIT)
            }
            node_types::CONDITION => Some(handles::FALSE),
            _ => None,
        }
    }

    async fn pause(&self, node_id: &str, reason: PauseReason) -> Result<PauseDecision, EngineError> {
        let receiver = self
            .control
            .apply(&self.execution_id, |inner| {
                inner.state.status = ExecutionStatus::Paused;
                inner.state.paused_node_id = Some(node_id.to_string());
                inner.state.pause_reason = Some(reason);
                inner.pause.arm(node_id, reason)
            })
            .ok_or(EngineError::NoActiveExecution)?;

        info!(execution = %self.execution_id, node = node_id, ?reason, "Execution paused");
        self.control.trace(
            &self.execution_id,
            format!("{} paused at {} ({:?})", Utc::now().to_rfc3339(), node_id, reason),
        );

        receiver.await.map_err(|_| EngineError::NoActiveExecution)
    }

    async fn fail(&self, node_id: &str, err: NodeError) -> EngineError {
        let message = err.to_string();
        error!(execution = %self.execution_id, node = node_id, error = %message, "Node failed");
        self.emit(ExecutionEvent::node_error(node_id, message.clone()));
        self.capture_failure_snapshot(node_id).await;
        EngineError::ActionFailure {
            node_id: node_id.to_string(),
            message,
        }
    }

    async fn capture_failure_snapshot(&self, node_id: &str) {
        match tokio::time::timeout(FAILURE_SNAPSHOT_TIMEOUT, self.driver.snapshot()).await {
            Ok(Ok(mut snapshot)) => {
                snapshot.node_id = Some(node_id.to_string());
                self.snapshots.record(&self.execution_id, snapshot);
            }
            Ok(Err(e)) => {
                debug!(execution = %self.execution_id, error = %e, "No DOM snapshot after failure");
            }
            Err(_) => {
                debug!(execution = %self.execution_id, "DOM snapshot after failure timed out");
            }
        }
    }

    /// Move to a terminal status and publish the closing event.
    ///
    /// The event goes out under the state lock, so anyone who observes the
    /// terminal status can already find the event in the history.
    fn finish(&self, status: ExecutionStatus, error: Option<String>, event: ExecutionEvent) -> bool {
        let event = event.with_execution(self.execution_id.clone());
        let line = trace_line(&event);
        self.control
            .apply(&self.execution_id, |inner| {
                inner.state.status = status;
                inner.state.error = error;
                inner.state.paused_node_id = None;
                inner.state.pause_reason = None;
                inner.state.finished_at = Some(Utc::now());
                inner.pause.clear();
                inner.trace(line);
                self.events.publish(event);
            })
            .is_some()
    }

    fn emit(&self, event: ExecutionEvent) {
        let event = event.with_execution(self.execution_id.clone());
        self.control.trace(&self.execution_id, trace_line(&event));
        self.events.publish(event);
    }
}

fn trace_line(event: &ExecutionEvent) -> String {
    format!(
        "{} {} {} {}",
        event.timestamp.to_rfc3339(),
        event.event_type.as_str(),
        event.node_id.as_deref().unwrap_or("-"),
        event.message.as_deref().unwrap_or("")
    )
    .trim_end()
    .to_string()
}

/// Items a loop iterates over: `items` (array, variable name or JSON text) or `count`.
fn loop_items(
    node: &Node,
    variables: &HashMap<String, Value>,
    max_iterations: u64,
) -> Result<Vec<Value>, NodeError> {
    let resolved = template::resolve_node(node, variables);

    let items = if let Some(items) = resolved.data.get("items").filter(|v| !v.is_null()) {
        match items {
            Value::Array(items) => items.clone(),
            Value::String(s) => match lookup_variable(variables, s.trim()) {
                Some(Value::Array(items)) => items.clone(),
                _ => serde_json::from_str::<Vec<Value>>(s).map_err(|_| NodeError::InvalidField {
                    field: "items".to_string(),
                    reason: "expected an array or the name of an array variable".to_string(),
                })?,
            },
            _ => {
                return Err(NodeError::InvalidField {
                    field: "items".to_string(),
                    reason: "expected an array".to_string(),
                });
            }
        }
    } else if let Some(count) = resolved.data.get("count") {
        let count = match count {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse::<u64>().ok(),
            _ => None,
        }
        .ok_or_else(|| NodeError::InvalidField {
            field: "count".to_string(),
            reason: "must be a non-negative integer".to_string(),
        })?;
        if count > max_iterations {
            return Err(NodeError::InvalidField {
                field: "count".to_string(),
                reason: format!("{} iterations exceeds the limit of {}", count, max_iterations),
            });
        }
        (0..count).map(|i| json!(i)).collect()
    } else {
        return Err(NodeError::MissingField("count".to_string()));
    };

    if items.len() as u64 > max_iterations {
        return Err(NodeError::InvalidField {
            field: "items".to_string(),
            reason: format!(
                "{} iterations exceeds the limit of {}",
                items.len(),
                max_iterations
            ),
        });
    }
    Ok(items)
}

//! Execution handlers.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use webpilot_engine::ExecutionOptions;
use webpilot_protocols::{
    BreakpointConfig, ExecutionEvent, ExecutionState, ExecutionStatus, PageDebugInfo, Workflow,
};

use crate::error::ApiError;
use crate::state::AppState;

/// Events returned by `/execution/events` when no limit is given.
const DEFAULT_EVENT_LIMIT: usize = 100;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteRequest {
    pub workflow: Workflow,

    #[serde(default)]
    pub trace_logs: bool,

    #[serde(default)]
    pub record_session: bool,

    #[serde(default)]
    pub breakpoint_config: Option<BreakpointConfig>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteResponse {
    pub execution_id: String,
    pub status: ExecutionStatus,
}

/// `{ success, message }` acknowledgement.
#[derive(Debug, Serialize)]
pub struct ActionResponse {
    pub success: bool,
    pub message: String,
}

impl ActionResponse {
    fn ok(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            success: true,
            message: message.into(),
        })
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PauseAction {
    Skip,
    Resume,
}

#[derive(Debug, Deserialize)]
pub struct PauseControlRequest {
    pub action: PauseAction,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureDomResponse {
    pub success: bool,
    pub debug_info: PageDebugInfo,
}

#[derive(Debug, Serialize)]
pub struct LogsResponse {
    pub logs: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventsQuery {
    pub limit: Option<usize>,
    pub execution_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct EventsResponse {
    pub events: Vec<ExecutionEvent>,
}

/// POST /execute
pub async fn execute(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ExecuteRequest>,
) -> Result<Json<ExecuteResponse>, ApiError> {
    let options = ExecutionOptions::default()
        .with_breakpoints(request.breakpoint_config.unwrap_or_default())
        .with_trace_logs(request.trace_logs)
        .with_record_session(request.record_session);

    let execution_id = state.engine.execute(request.workflow, options)?;
    info!(execution = %execution_id, "Execution requested over HTTP");

    Ok(Json(ExecuteResponse {
        execution_id,
        status: ExecutionStatus::Running,
    }))
}

/// GET /execution/status
pub async fn status(State(state): State<Arc<AppState>>) -> Json<ExecutionState> {
    Json(state.engine.status())
}

/// POST /execution/stop
///
/// Succeeds whether or not a run was active.
pub async fn stop(State(state): State<Arc<AppState>>) -> Json<ActionResponse> {
    if state.engine.stop() {
        ActionResponse::ok("Execution stopped")
    } else {
        ActionResponse::ok("No active execution")
    }
}

/// POST /execution/pause-control
pub async fn pause_control(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PauseControlRequest>,
) -> Result<Json<ActionResponse>, ApiError> {
    match request.action {
        PauseAction::Resume => {
            state.engine.resume()?;
            Ok(ActionResponse::ok("Execution resumed"))
        }
        PauseAction::Skip => {
            state.engine.skip()?;
            Ok(ActionResponse::ok("Node skipped"))
        }
    }
}

/// POST /execution/capture-dom
pub async fn capture_dom(State(state): State<Arc<AppState>>) -> Result<Json<CaptureDomResponse>, ApiError> {
    let debug_info = state.engine.capture_dom().await?;
    Ok(Json(CaptureDomResponse {
        success: true,
        debug_info,
    }))
}

/// GET /execution/logs
pub async fn logs(State(state): State<Arc<AppState>>) -> Json<LogsResponse> {
    Json(LogsResponse {
        logs: state.engine.trace_logs(),
    })
}

/// GET /execution/events
pub async fn events(
    State(state): State<Arc<AppState>>,
    Query(query): Query<EventsQuery>,
) -> Json<EventsResponse> {
    let limit = query.limit.unwrap_or(DEFAULT_EVENT_LIMIT);
    let bus = state.engine.events();
    let events = match query.execution_id {
        Some(id) => {
            let all = bus.for_execution(&id);
            let skip = all.len().saturating_sub(limit);
            all.into_iter().skip(skip).collect()
        }
        None => bus.recent(limit),
    };
    Json(EventsResponse { events })
}

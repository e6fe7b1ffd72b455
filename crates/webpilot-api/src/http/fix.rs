//! Fix surface: error analysis and workflow repair.

use std::sync::Arc;

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use webpilot_protocols::{ErrorAnalysis, PageDebugInfo, Workflow};
use webpilot_recovery::{analyze, analyze_with_dom, FixContext, RecoveryReport};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    pub workflow: Workflow,

    #[serde(default, alias = "error")]
    pub error_message: String,

    /// Trace lines; defaults to the engine's trace when `executionId` is the latest run.
    #[serde(default)]
    pub logs: Option<Vec<String>>,

    #[serde(default)]
    pub current_node_id: Option<String>,

    /// Cross-reference with the latest snapshot captured for this run.
    #[serde(default)]
    pub execution_id: Option<String>,

    /// Snapshot supplied by the caller; wins over captured ones.
    #[serde(default)]
    pub dom_context: Option<PageDebugInfo>,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub analyses: Vec<ErrorAnalysis>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyRequest {
    pub workflow: Workflow,

    /// Analyses to act on; when empty, `errorMessage` is analysed first.
    #[serde(default, alias = "analyses")]
    pub error_analysis: Vec<ErrorAnalysis>,

    #[serde(default)]
    pub error_message: Option<String>,

    #[serde(default)]
    pub execution_id: Option<String>,

    /// Use the snapshots the engine captured for `executionId`.
    #[serde(default, rename = "useDOMCapture", alias = "useDomCapture")]
    pub use_dom_capture: bool,

    #[serde(default)]
    pub dom_context: Option<PageDebugInfo>,
}

/// POST /fix/analyze
pub async fn analyze_errors(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    if request.error_message.trim().is_empty() && request.logs.as_ref().is_none_or(|l| l.is_empty()) {
        return Err(ApiError::BadRequest("errorMessage or logs is required".to_string()));
    }

    let logs = match request.logs {
        Some(logs) => logs,
        None => match &request.execution_id {
            Some(id) if state.engine.status().is_run(id) => state.engine.trace_logs(),
            _ => Vec::new(),
        },
    };
    let dom = request.dom_context.or_else(|| {
        request
            .execution_id
            .as_deref()
            .and_then(|id| state.engine.snapshot_store().latest(id))
    });

    let current = request.current_node_id.as_deref();
    let analyses = match &dom {
        Some(dom) => analyze_with_dom(&request.workflow, &request.error_message, &logs, current, dom),
        None => analyze(&request.workflow, &request.error_message, &logs, current),
    };
    debug!(count = analyses.len(), with_dom = dom.is_some(), "Errors analysed over HTTP");
    Ok(Json(AnalyzeResponse { analyses }))
}

/// POST /fix/apply
pub async fn apply_fix(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ApplyRequest>,
) -> Result<Json<RecoveryReport>, ApiError> {
    let mut snapshots = Vec::new();
    if request.use_dom_capture {
        let id = request.execution_id.as_deref().ok_or_else(|| {
            ApiError::BadRequest("useDOMCapture requires executionId".to_string())
        })?;
        snapshots = state.engine.snapshots_for(id);
    }
    if let Some(dom) = request.dom_context {
        snapshots.push(dom);
    }

    let mut analyses = request.error_analysis;
    if analyses.is_empty() {
        if let Some(message) = &request.error_message {
            analyses = match snapshots.last() {
                Some(dom) => analyze_with_dom(&request.workflow, message, &[], None, dom),
                None => analyze(&request.workflow, message, &[], None),
            };
        }
    }

    let mut ctx = FixContext::new().with_snapshots(snapshots);
    if let Some(message) = request.error_message {
        ctx = ctx.with_error_message(message);
    }

    let report = state.recovery.fix(&request.workflow, &analyses, &ctx).await;
    info!(
        recovered = report.recovered,
        strategy = ?report.strategy,
        updates = report.updates.len(),
        "Fix requested over HTTP"
    );
    Ok(Json(report))
}

//! Application state.

use std::sync::Arc;
use std::time::{Duration, Instant};

use webpilot_engine::ExecutionEngine;
use webpilot_recovery::RecoveryOrchestrator;

/// Shared by every handler.
pub struct AppState {
    pub engine: Arc<ExecutionEngine>,
    pub recovery: Arc<RecoveryOrchestrator>,
    start_time: Instant,
}

impl AppState {
    pub fn new(engine: Arc<ExecutionEngine>, recovery: Arc<RecoveryOrchestrator>) -> Self {
        Self {
            engine,
            recovery,
            start_time: Instant::now(),
        }
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }
}

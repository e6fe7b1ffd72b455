//! # webpilot API
//!
//! External surface of the engine:
//! - **Execution**: start, stop, pause control, DOM capture, status, logs and events
//! - **Fix**: error analysis and workflow repair
//! - **WebSocket**: live event push
//! - **Probes**: health, liveness, readiness
//!
//! ```text
//! /execute                      POST  start a run
//! /execution/status             GET   current ExecutionState
//! /execution/stop               POST  stop the active run
//! /execution/pause-control      POST  { action: skip | resume }
//! /execution/capture-dom        POST  snapshot of the paused page
//! /execution/logs               GET   trace lines of the latest run
//! /execution/events?limit=N     GET   recent events
//! /fix/analyze                  POST  classify an error
//! /fix/apply                    POST  repair a workflow
//! /health /livez /readyz        GET   probes
//! /ws                           GET   event stream
//! ```

pub mod error;
pub mod http;
pub mod server;
pub mod state;
pub mod websocket;

pub use error::ApiError;
pub use http::routes::create_router;
pub use server::ApiServer;
pub use state::AppState;

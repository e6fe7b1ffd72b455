//! API server.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;
use webpilot_config::ServerConfig;

use crate::http::routes::create_router;
use crate::state::AppState;

pub struct ApiServer {
    config: ServerConfig,
    state: Arc<AppState>,
}

impl ApiServer {
    pub fn new(config: ServerConfig, state: Arc<AppState>) -> Self {
        Self { config, state }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.config.host, self.config.port)
    }

    /// Serve until the process is stopped.
    pub async fn run(&self) -> Result<(), Box<dyn std::error::Error>> {
        self.run_until(std::future::pending()).await
    }

    /// Serve until `shutdown` resolves; in-flight requests are drained first.
    pub async fn run_until(
        &self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let app = create_router(self.state.clone());

        let addr: SocketAddr = self.addr().parse()?;
        let listener = TcpListener::bind(addr).await?;

        info!("API server listening on {}", addr);
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("API server stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use webpilot_engine::{ExecutionEngine, MockDriver, NodeRegistry};
    use webpilot_recovery::RecoveryOrchestrator;

    fn server(host: &str, port: u16) -> ApiServer {
        let engine = Arc::new(ExecutionEngine::new(
            Arc::new(MockDriver::new()),
            Arc::new(NodeRegistry::with_builtins()),
        ));
        let state = Arc::new(AppState::new(engine, Arc::new(RecoveryOrchestrator::default())));
        let config = ServerConfig {
            host: host.to_string(),
            port,
        };
        ApiServer::new(config, state)
    }

    #[test]
    fn test_addr() {
        assert_eq!(server("127.0.0.1", 8080).addr(), "127.0.0.1:8080");
        assert_eq!(server("0.0.0.0", 3000).addr(), "0.0.0.0:3000");
    }

    #[tokio::test]
    async fn test_run_until_shutdown() {
        let server = server("127.0.0.1", 0);
        server.run_until(async {}).await.unwrap();
    }

    #[tokio::test]
    async fn test_bad_address() {
        assert!(server("not a host", 8080).run_until(async {}).await.is_err());
    }
}

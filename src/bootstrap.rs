//! Builds the runtime components from configuration.

use std::error::Error;
use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};
use webpilot_config::{Config, DriverConfig, LlmConfig};
use webpilot_driver_http::HttpDriver;
use webpilot_engine::{ExecutionEngine, NodeRegistry};
use webpilot_protocols::{AutomationDriver, LLMProvider, PageDebugInfo, Workflow};
use webpilot_provider_openai::OpenAIProvider;
use webpilot_recovery::RecoveryOrchestrator;

pub(crate) type BoxError = Box<dyn Error + Send + Sync>;

pub(crate) fn build_driver(config: &DriverConfig) -> Result<Arc<dyn AutomationDriver>, BoxError> {
    match config.kind.as_str() {
        "http" => Ok(Arc::new(HttpDriver::new(config)?)),
        other => Err(format!("Unknown driver kind '{}'", other).into()),
    }
}

/// LLM provider for repair, when a key is configured.
pub(crate) fn build_provider(config: &LlmConfig) -> Option<Arc<dyn LLMProvider>> {
    let api_key = config.api_key()?.to_string();
    match config.provider.as_str() {
        "openai" => {
            let provider = match &config.base_url {
                Some(url) => OpenAIProvider::with_url(api_key, url.clone()),
                None => OpenAIProvider::new(api_key),
            };
            info!(provider = "openai", model = %config.model, "LLM provider registered");
            Some(Arc::new(provider.with_default_model(config.model.clone())))
        }
        other => {
            warn!(provider = other, "Unknown LLM provider, LLM-assisted repair disabled");
            None
        }
    }
}

pub(crate) fn build_engine(config: &Config) -> Result<ExecutionEngine, BoxError> {
    let driver = build_driver(&config.driver)?;
    let registry = Arc::new(NodeRegistry::with_builtins());
    Ok(ExecutionEngine::with_config(driver, registry, config.engine.clone()))
}

/// Recovery that only accepts workflows `registry` can run.
pub(crate) fn build_recovery(config: &Config, registry: &NodeRegistry) -> RecoveryOrchestrator {
    let provider = build_provider(&config.llm);
    RecoveryOrchestrator::from_config(&config.recovery, provider, Some(config.llm.model.clone()))
        .with_node_types(registry.workflow_types())
}

pub(crate) fn load_workflow(path: &Path) -> Result<Workflow, BoxError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    let workflow = serde_json::from_str(&content)
        .map_err(|e| format!("Invalid workflow JSON in {}: {}", path.display(), e))?;
    Ok(workflow)
}

pub(crate) fn load_page(path: &Path, url: &str) -> Result<PageDebugInfo, BoxError> {
    let html = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    Ok(PageDebugInfo::new(url, html))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;
    use webpilot_config::RecoveryConfig;

    #[test]
    fn test_unknown_driver_kind() {
        let config = DriverConfig {
            kind: "chrome".to_string(),
            ..DriverConfig::default()
        };
        let err = build_driver(&config).err().unwrap();
        assert_eq!(err.to_string(), "Unknown driver kind 'chrome'");
        assert_eq!(build_driver(&DriverConfig::default()).unwrap().id(), "http");
    }

    #[test]
    fn test_provider_needs_key() {
        assert!(build_provider(&LlmConfig::default()).is_none());

        let config = LlmConfig {
            api_key: Some("sk-test".to_string()),
            model: "gpt-4o".to_string(),
            ..LlmConfig::default()
        };
        let provider = build_provider(&config).unwrap();
        assert_eq!(provider.id(), "openai");
        assert_eq!(provider.default_model(), "gpt-4o");

        let config = LlmConfig {
            provider: "other".to_string(),
            ..config
        };
        assert!(build_provider(&config).is_none());
    }

    #[test]
    fn test_recovery_follows_config() {
        let registry = NodeRegistry::with_builtins();
        let mut config = Config::default();
        assert_eq!(build_recovery(&config, &registry).strategy_names(), vec!["dom", "rules"]);

        config.llm.api_key = Some("sk-test".to_string());
        assert_eq!(
            build_recovery(&config, &registry).strategy_names(),
            vec!["dom", "llm", "rules"]
        );

        config.recovery = RecoveryConfig {
            dom_enabled: false,
            ..RecoveryConfig::default()
        };
        assert_eq!(build_recovery(&config, &registry).strategy_names(), vec!["llm", "rules"]);
    }

    #[test]
    fn test_load_workflow() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"nodes":[{{"id":"s","type":"start","data":{{}}}}],"edges":[]}}"#
        )
        .unwrap();
        let workflow = load_workflow(file.path()).unwrap();
        assert_eq!(workflow.nodes.len(), 1);

        let mut bad = NamedTempFile::new().unwrap();
        write!(bad, "not json").unwrap();
        assert!(load_workflow(bad.path()).unwrap_err().to_string().starts_with("Invalid workflow JSON"));
    }
}

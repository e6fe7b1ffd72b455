use super::*;

fn with_api_key() -> Config {
    let mut config = Config::default();
    config.llm.api_key = Some("sk-test".to_string());
    config
}

#[test]
fn test_validate_default_config() {
    let result = ConfigValidator::validate(&with_api_key());
    assert!(result.is_valid());
    assert!(result.warnings.is_empty());
}

#[test]
fn test_validate_invalid_port() {
    let mut config = with_api_key();
    config.server.port = 0;

    let result = ConfigValidator::validate(&config);
    assert!(!result.is_valid());
    assert!(result.errors.iter().any(|e| e.path == "server.port"));
}

#[test]
fn test_validate_zero_buffers() {
    let mut config = with_api_key();
    config.engine.event_buffer = 0;
    config.engine.max_duration_secs = 0;

    let result = ConfigValidator::validate(&config);
    assert!(result.errors.iter().any(|e| e.path == "engine.event_buffer"));
    assert!(result.errors.iter().any(|e| e.path == "engine.max_duration_secs"));
}

#[test]
fn test_validate_zero_timeout_floor() {
    let mut config = with_api_key();
    config.recovery.timeout_floor_ms = 0;

    let result = ConfigValidator::validate(&config);
    assert!(result.errors.iter().any(|e| e.path == "recovery.timeout_floor_ms"));
}

#[test]
fn test_missing_api_key_is_warning() {
    let result = ConfigValidator::validate(&Config::default());
    assert!(result.is_valid());
    assert!(result.warnings.iter().any(|w| w.path == "llm.api_key"));
}

#[test]
fn test_missing_api_key_ignored_when_llm_disabled() {
    let mut config = Config::default();
    config.recovery.llm_enabled = false;
    let result = ConfigValidator::validate(&config);
    assert!(!result.warnings.iter().any(|w| w.path == "llm.api_key"));
}

#[test]
fn test_validate_invalid_base_url() {
    let mut config = with_api_key();
    config.llm.base_url = Some("invalid-url".to_string());

    let result = ConfigValidator::validate(&config);
    assert!(!result.is_valid());
}

#[test]
fn test_unknown_driver_kind() {
    let mut config = with_api_key();
    config.driver.kind = "cdp".to_string();

    let result = ConfigValidator::validate(&config);
    assert!(result.errors.iter().any(|e| e.path == "driver.kind"));
}

#[test]
fn test_all_strategies_disabled_warning() {
    let mut config = with_api_key();
    config.recovery.dom_enabled = false;
    config.recovery.llm_enabled = false;
    config.recovery.rules_enabled = false;

    let result = ConfigValidator::validate(&config);
    assert!(result.is_valid());
    assert!(result.warnings.iter().any(|w| w.path == "recovery"));
}

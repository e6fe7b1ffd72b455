use super::*;

#[test]
fn test_defaults() {
    let config = Config::default();
    assert_eq!(config.server.host, "127.0.0.1");
    assert_eq!(config.server.port, 8080);
    assert_eq!(config.engine.max_duration_secs, 600);
    assert_eq!(config.engine.default_node_timeout_ms, 30_000);
    assert_eq!(config.engine.max_loop_iterations, 1000);
    assert_eq!(config.recovery.timeout_floor_ms, 30_000);
    assert!(config.recovery.dom_enabled);
    assert_eq!(config.llm.provider, "openai");
    assert_eq!(config.llm.model, "gpt-4o-mini");
    assert_eq!(config.driver.kind, "http");
    assert_eq!(config.logging.level, "info");
    assert!(!config.logging.json);
}

#[test]
fn test_partial_section_keeps_field_defaults() {
    let config: Config = toml::from_str(
        r#"
        [engine]
        max_duration_secs = 60
        "#,
    )
    .unwrap();
    assert_eq!(config.engine.max_duration_secs, 60);
    assert_eq!(config.engine.event_buffer, 256);
    assert_eq!(config.engine.max_duration(), Duration::from_secs(60));
}

#[test]
fn test_blank_api_key_ignored() {
    let mut llm = LlmConfig::default();
    assert!(llm.api_key().is_none());
    llm.api_key = Some("  ".to_string());
    assert!(llm.api_key().is_none());
    llm.api_key = Some("sk-test".to_string());
    assert_eq!(llm.api_key(), Some("sk-test"));
}

#[test]
fn test_log_dir() {
    let logging = LoggingConfig {
        dir: Some(PathBuf::from("/var/log/webpilot")),
        ..LoggingConfig::default()
    };
    assert_eq!(logging.log_dir(), PathBuf::from("/var/log/webpilot"));
    assert!(LoggingConfig::default().log_dir().ends_with(".webpilot/logs"));
}

#[test]
fn test_serialize_roundtrip_through_toml() {
    let text = toml::to_string(&Config::default()).unwrap();
    let parsed: Config = toml::from_str(&text).unwrap();
    assert_eq!(parsed.server.port, 8080);
}

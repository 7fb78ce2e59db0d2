#![allow(clippy::field_reassign_with_default)]
//! Config load/save round-trip tests.
//!
//! Exercises `Config` persistence with isolated temp directories and partial
//! TOML files to verify serde defaults and file round-trips.

use std::fs;
use webpilot::config::{Config, ExecutionConfig};

// ─────────────────────────────────────────────────────────────────────────────
// Defaults
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn config_default_has_no_credentials() {
    let config = Config::default();
    assert!(config.api_key.is_none(), "default config must not ship a key");
    assert_eq!(
        config.provider.as_deref(),
        Some("openai"),
        "default provider should be openai"
    );
}

#[test]
fn config_default_temperature_in_range() {
    let config = Config::default();
    assert!(
        (0.0..=2.0).contains(&config.temperature),
        "default temperature should be valid, got {}",
        config.temperature
    );
}

#[test]
fn execution_config_default_budgets() {
    let execution = ExecutionConfig::default();
    assert_eq!(execution.max_steps, 100, "default max_steps should be 100");
    assert_eq!(execution.max_failures, 3, "default max_failures should be 3");
    assert_eq!(
        execution.planning_interval, 3,
        "default planning_interval should be 3"
    );
    assert!(execution.enable_planner, "planner should default on");
    assert!(execution.enable_validator, "validator should default on");
}

#[test]
fn browser_config_default_webdriver_url() {
    let config = Config::default();
    assert_eq!(
        config.browser.webdriver_url, "http://localhost:9515",
        "default WebDriver endpoint should be chromedriver's"
    );
}

#[test]
fn gateway_config_default_binds_loopback() {
    let config = Config::default();
    assert_eq!(config.gateway.host, "127.0.0.1");
    assert_ne!(config.gateway.port, 0);
}

// ─────────────────────────────────────────────────────────────────────────────
// TOML round-trips
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn config_toml_roundtrip_preserves_provider() {
    let config = Config {
        provider: Some("openrouter".into()),
        model: Some("anthropic/claude-sonnet".into()),
        temperature: 0.5,
        ..Default::default()
    };

    let toml_str = toml::to_string(&config).expect("config should serialize to TOML");
    let parsed: Config = toml::from_str(&toml_str).expect("TOML should deserialize back");

    assert_eq!(parsed.provider.as_deref(), Some("openrouter"));
    assert_eq!(parsed.model.as_deref(), Some("anthropic/claude-sonnet"));
    assert!((parsed.temperature - 0.5).abs() < f64::EPSILON);
}

#[test]
fn config_toml_roundtrip_preserves_role_models() {
    let mut config = Config::default();
    config.execution.planner_model = Some("o3-mini".into());
    config.execution.validator_model = Some("gpt-4o-mini".into());
    config.execution.use_vision = true;

    let toml_str = toml::to_string(&config).expect("config should serialize to TOML");
    let parsed: Config = toml::from_str(&toml_str).expect("TOML should deserialize back");

    assert_eq!(parsed.execution.planner_model.as_deref(), Some("o3-mini"));
    assert_eq!(
        parsed.execution.validator_model.as_deref(),
        Some("gpt-4o-mini")
    );
    assert!(parsed.execution.use_vision);
}

#[test]
fn config_file_write_read_roundtrip() {
    let tmp = tempfile::TempDir::new().expect("tempdir creation should succeed");
    let config_path = tmp.path().join("config.toml");

    let config = Config {
        provider: Some("ollama".into()),
        api_url: Some("http://localhost:11434/v1".into()),
        model: Some("qwen2.5:14b".into()),
        execution: ExecutionConfig {
            max_steps: 25,
            ..Default::default()
        },
        ..Default::default()
    };

    let toml_str = toml::to_string(&config).expect("config should serialize");
    fs::write(&config_path, &toml_str).expect("config file write should succeed");

    let read_back = fs::read_to_string(&config_path).expect("config file read should succeed");
    let parsed: Config = toml::from_str(&read_back).expect("TOML should parse back");

    assert_eq!(parsed.provider.as_deref(), Some("ollama"));
    assert_eq!(parsed.api_url.as_deref(), Some("http://localhost:11434/v1"));
    assert_eq!(parsed.execution.max_steps, 25);
}

#[test]
fn config_file_with_missing_sections_uses_defaults() {
    let minimal_toml = r#"
provider = "openai"
model = "gpt-4o"
"#;
    let parsed: Config = toml::from_str(minimal_toml).expect("minimal TOML should parse");

    assert_eq!(parsed.execution.max_steps, 100);
    assert_eq!(parsed.browser.webdriver_url, "http://localhost:9515");
    assert_eq!(parsed.gateway.host, "127.0.0.1");
}

#[test]
fn config_file_with_partial_execution_section() {
    let toml_with_execution = r#"
provider = "openai"

[execution]
max_steps = 10
use_vision = true
"#;
    let parsed: Config =
        toml::from_str(toml_with_execution).expect("TOML with execution section should parse");

    assert_eq!(parsed.execution.max_steps, 10);
    assert!(parsed.execution.use_vision);
    // Untouched fields keep their defaults.
    assert_eq!(parsed.execution.max_failures, 3);
    assert!(parsed.execution.enable_validator);
}

#[test]
fn config_path_is_never_serialized() {
    let config = Config::default();
    let toml_str = toml::to_string(&config).expect("config should serialize");
    assert!(
        !toml_str.contains("config_path"),
        "config_path is runtime-only state"
    );
}

// ─────────────────────────────────────────────────────────────────────────────
// Validation
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn validate_accepts_defaults() {
    Config::default().validate().expect("defaults should validate");
}

#[test]
fn validate_rejects_zero_max_steps() {
    let mut config = Config::default();
    config.execution.max_steps = 0;
    assert!(config.validate().is_err());
}

#[test]
fn validate_rejects_zero_gateway_port() {
    let mut config = Config::default();
    config.gateway.port = 0;
    assert!(config.validate().is_err());
}

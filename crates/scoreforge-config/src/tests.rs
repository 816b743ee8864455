//! Tests for engine configuration.

use super::*;

#[test]
fn test_toml_parsing() {
    let toml = r#"
        environment_mode = "fast_assert"
        constraint_match_enabled = true
        event_queue_capacity = 256

        [constraint_weights]
        "Overlapping shifts" = "1hard/0soft"
    "#;

    let config = EngineConfig::from_toml_str(toml).unwrap();
    assert_eq!(config.environment_mode, EnvironmentMode::FastAssert);
    assert!(config.constraint_match_enabled);
    assert_eq!(config.event_queue_capacity, 256);
    assert_eq!(
        config.constraint_weights.get("Overlapping shifts").map(String::as_str),
        Some("1hard/0soft")
    );
}

#[test]
fn test_yaml_parsing() {
    let yaml = r#"
        environment_mode: full_assert
        constraint_weights:
          Balance: "0hard/-2soft"
    "#;

    let config = EngineConfig::from_yaml_str(yaml).unwrap();
    assert_eq!(config.environment_mode, EnvironmentMode::FullAssert);
    assert!(!config.constraint_match_enabled);
    assert_eq!(config.event_queue_capacity, 64);
    assert_eq!(config.constraint_weights.len(), 1);
}

#[test]
fn test_empty_document_gives_defaults() {
    assert_eq!(EngineConfig::from_toml_str("").unwrap(), EngineConfig::default());
}

#[test]
fn test_builder() {
    let config = EngineConfig::new()
        .with_environment_mode(EnvironmentMode::FullAssert)
        .with_constraint_match_enabled(true)
        .with_constraint_weight("Balance", "7")
        .with_event_queue_capacity(8);

    assert!(config.environment_mode.is_fully_asserted());
    assert!(config.environment_mode.is_asserted());
    assert_eq!(config.event_queue_capacity, 8);
    assert_eq!(config.constraint_weights["Balance"], "7");
}

#[test]
fn test_blank_weight_rejected() {
    let toml = r#"
        [constraint_weights]
        Balance = "  "
    "#;
    assert!(matches!(
        EngineConfig::from_toml_str(toml),
        Err(ConfigError::Invalid(_))
    ));
}

#[test]
fn test_unknown_mode_rejected() {
    assert!(matches!(
        EngineConfig::from_toml_str(r#"environment_mode = "reproducible""#),
        Err(ConfigError::Toml(_))
    ));
}

#[test]
fn test_missing_file() {
    assert!(matches!(
        EngineConfig::load("/nonexistent/engine.toml"),
        Err(ConfigError::Io(_))
    ));
}

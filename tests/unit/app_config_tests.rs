/*!
 * Tests for application configuration functionality
 */

use std::time::Duration;

use doctrans::app_config::{Config, LogLevel, TranslationProvider};

use crate::common::create_temp_dir;

/// Test default configuration values
#[test]
fn test_default_config_withNoParameters_shouldHaveCorrectDefaults() {
    let config = Config::default();

    assert_eq!(config.source_language, None);
    assert_eq!(config.target_language, "hi");
    assert_eq!(config.translation.provider, TranslationProvider::LibreTranslate);
    assert_eq!(config.log_level, LogLevel::Info);
    assert!(config.ocr.enabled);
    assert_eq!(config.layout.max_expansion_ratio, 1.5);

    let options = config.adapter_options();
    assert_eq!(options.call_timeout, Duration::from_secs(30));
    assert_eq!(options.retry_count, 2);
    assert_eq!(options.concurrency_limit, 4);
}

#[test]
fn test_config_saveThenLoad_shouldKeepSettings() {
    let dir = create_temp_dir().unwrap();
    let path = dir.path().join("conf.json");

    let mut config = Config::default();
    config.target_language = "ta".to_string();
    config.translation.provider = TranslationProvider::Ollama;
    config.translation.active_provider_config_mut().model = "mistral:7b".to_string();
    config.layout.max_expansion_ratio = 1.25;
    config.save(&path).unwrap();

    let loaded = Config::from_file(&path).unwrap();
    assert_eq!(loaded.target_language, "ta");
    assert_eq!(loaded.translation.provider, TranslationProvider::Ollama);
    assert_eq!(loaded.translation.get_model(), "mistral:7b");
    assert_eq!(loaded.layout.max_expansion_ratio, 1.25);
}

#[test]
fn test_config_validation_withVariousConfigs_shouldValidateCorrectly() {
    assert!(Config::default().validate().is_ok());

    let mut bad_source = Config::default();
    bad_source.source_language = Some("zz".to_string());
    assert!(bad_source.validate().is_err());

    let mut bad_endpoint = Config::default();
    bad_endpoint.translation.active_provider_config_mut().endpoint = "not a url".to_string();
    assert!(bad_endpoint.validate().is_err());

    let mut zero_limit = Config::default();
    zero_limit.translation.common.backend_concurrency_limit = Some(0);
    assert!(zero_limit.validate().is_err());

    let mut zero_workers = Config::default();
    zero_workers.workers = Some(0);
    assert!(zero_workers.validate().is_err());

    let mut empty_ladder = Config::default();
    empty_ladder.layout.scale_ladder.clear();
    assert!(empty_ladder.validate().is_err());
}

#[test]
fn test_providerSpecificDefaults_shouldFollowBackendProfile() {
    let mut config = Config::default();
    config.translation.provider = TranslationProvider::Ollama;

    assert_eq!(config.translation.get_endpoint(), "http://localhost:11434");
    assert_eq!(config.translation.call_timeout(), Duration::from_secs(120));
    assert_eq!(config.translation.concurrency_limit(), 8);

    config.translation.common.backend_concurrency_limit = Some(2);
    assert_eq!(config.adapter_options().concurrency_limit, 2);
}

#[test]
fn test_providerTimeout_shouldOverrideProfile() {
    let mut config = Config::default();
    config.translation.active_provider_config_mut().timeout_secs = Some(5);
    assert_eq!(config.adapter_options().call_timeout, Duration::from_secs(5));
}

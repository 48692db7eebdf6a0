use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::path::Path;
use std::time::Duration;

use crate::language_utils;
use crate::layout::LayoutConfig;
use crate::translation::{AdapterOptions, BackendProfile};

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Source language override (ISO); detected per block when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_language: Option<String>,

    /// Target language code (ISO)
    pub target_language: String,

    /// Translation config
    #[serde(default)]
    pub translation: TranslationConfig,

    /// Reflow parameters
    #[serde(default)]
    pub layout: LayoutConfig,

    /// OCR settings for scanned pages
    #[serde(default)]
    pub ocr: OcrConfig,

    /// Pages processed in parallel; defaults to the available execution units
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workers: Option<usize>,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Translation provider type
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TranslationProvider {
    // @provider: LibreTranslate server
    #[default]
    LibreTranslate,
    // @provider: Ollama
    Ollama,
}

impl TranslationProvider {
    // @returns: Capitalized provider name
    pub fn display_name(&self) -> &str {
        match self {
            Self::LibreTranslate => "LibreTranslate",
            Self::Ollama => "Ollama",
        }
    }

    // @returns: Lowercase provider identifier
    pub fn to_lowercase_string(&self) -> String {
        match self {
            Self::LibreTranslate => "libretranslate".to_string(),
            Self::Ollama => "ollama".to_string(),
        }
    }
}

// Implement Display trait for TranslationProvider
impl std::fmt::Display for TranslationProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_lowercase_string())
    }
}

// Implement FromStr trait for TranslationProvider
impl std::str::FromStr for TranslationProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "libretranslate" | "libre" => Ok(Self::LibreTranslate),
            "ollama" => Ok(Self::Ollama),
            _ => Err(anyhow!("Invalid provider type: {}", s)),
        }
    }
}

/// Provider configuration wrapper
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ProviderConfig {
    // @field: Provider type identifier
    #[serde(rename = "type")]
    pub provider_type: String,

    // @field: Model name (Ollama only)
    #[serde(default = "String::new")]
    pub model: String,

    // @field: API key
    #[serde(default = "String::new")]
    pub api_key: String,

    // @field: Service URL
    #[serde(default = "String::new")]
    pub endpoint: String,

    // @field: Timeout seconds for one call
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl ProviderConfig {
    // @param provider_type: Provider enum
    // @returns: Provider config with defaults
    pub fn new(provider_type: TranslationProvider) -> Self {
        match provider_type {
            TranslationProvider::LibreTranslate => Self {
                provider_type: "libretranslate".to_string(),
                model: String::new(),
                api_key: String::new(),
                endpoint: default_libretranslate_endpoint(),
                timeout_secs: None,
            },
            TranslationProvider::Ollama => Self {
                provider_type: "ollama".to_string(),
                model: default_ollama_model(),
                api_key: String::new(),
                endpoint: default_ollama_endpoint(),
                timeout_secs: None,
            },
        }
    }
}

/// Translation service configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationConfig {
    /// Translation provider to use
    #[serde(default)]
    pub provider: TranslationProvider,

    /// Available translation providers
    #[serde(default)]
    pub available_providers: Vec<ProviderConfig>,

    /// Common translation settings
    #[serde(default)]
    pub common: TranslationCommonConfig,
}

/// Common translation settings applicable to all providers
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TranslationCommonConfig {
    /// Global cap on concurrent backend calls; the provider profile applies when absent
    #[serde(default)]
    pub backend_concurrency_limit: Option<usize>,

    /// Retry count for failed requests
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    /// Backoff base for retries (in milliseconds), doubled on each retry
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Temperature parameter for LLM backends (0.0 to 1.0)
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl Default for TranslationCommonConfig {
    fn default() -> Self {
        Self {
            backend_concurrency_limit: None,
            retry_count: default_retry_count(),
            retry_backoff_ms: default_retry_backoff_ms(),
            temperature: default_temperature(),
        }
    }
}

/// OCR settings for raster pages
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct OcrConfig {
    /// Run OCR on scanned regions; when off those blocks are flagged `ocr-failed`
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Path or name of the tesseract binary
    #[serde(default = "default_tesseract_binary")]
    pub tesseract_binary: String,

    /// Optional `--tessdata-dir`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tessdata_dir: Option<String>,

    /// Language packs used when the source language is unknown
    #[serde(default = "default_ocr_languages")]
    pub languages: String,

    /// Upper bound for one OCR run in seconds
    #[serde(default = "default_ocr_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            tesseract_binary: default_tesseract_binary(),
            tessdata_dir: None,
            languages: default_ocr_languages(),
            timeout_secs: default_ocr_timeout_secs(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_retry_count() -> u32 {
    2
}

fn default_retry_backoff_ms() -> u64 {
    500 // doubled on each retry, plus jitter
}

fn default_temperature() -> f32 {
    0.3
}

fn default_true() -> bool {
    true
}

fn default_libretranslate_endpoint() -> String {
    "http://localhost:5000".to_string()
}

fn default_ollama_endpoint() -> String {
    "http://localhost:11434".to_string()
}

fn default_ollama_model() -> String {
    "llama3.2:3b".to_string()
}

fn default_tesseract_binary() -> String {
    "tesseract".to_string()
}

fn default_ocr_languages() -> String {
    "script/Devanagari".to_string()
}

fn default_ocr_timeout_secs() -> u64 {
    120
}

impl Config {
    /// Load a configuration file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).with_context(|| format!("Failed to open config file: {}", path.display()))?;
        serde_json::from_str(&content).with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Save the configuration as pretty JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self).context("Failed to serialize config to JSON")?;
        std::fs::write(path, json).with_context(|| format!("Failed to write config to file: {}", path.display()))
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        // Validate languages
        language_utils::get_language_name(&self.target_language)
            .with_context(|| format!("Invalid target language '{}'", self.target_language))?;
        if let Some(source) = &self.source_language {
            language_utils::get_language_name(source)
                .with_context(|| format!("Invalid source language '{}'", source))?;
        }

        let endpoint = self.translation.get_endpoint();
        url::Url::parse(&endpoint).with_context(|| format!("Invalid provider endpoint '{}'", endpoint))?;

        if self.translation.provider == TranslationProvider::Ollama && self.translation.get_model().is_empty() {
            return Err(anyhow!("A model is required for the Ollama provider"));
        }
        if self.translation.common.backend_concurrency_limit == Some(0) {
            return Err(anyhow!("backend_concurrency_limit must be at least 1"));
        }
        if self.translation.call_timeout().is_zero() {
            return Err(anyhow!("Provider timeout must be greater than zero"));
        }
        if self.workers == Some(0) {
            return Err(anyhow!("workers must be at least 1"));
        }

        // Validate layout
        if !(self.layout.max_expansion_ratio >= 1.0) {
            return Err(anyhow!(
                "max_expansion_ratio must be at least 1.0 (got {})",
                self.layout.max_expansion_ratio
            ));
        }
        if !(self.layout.line_height > 0.0) {
            return Err(anyhow!("line_height must be positive"));
        }
        if self.layout.scale_ladder.is_empty() {
            return Err(anyhow!("scale_ladder must not be empty"));
        }
        if self.layout.scale_ladder.iter().any(|s| !(s.is_finite() && *s > 0.0)) {
            return Err(anyhow!("scale_ladder entries must be positive"));
        }
        if self.layout.scale_ladder.windows(2).any(|w| w[1] > w[0]) {
            return Err(anyhow!("scale_ladder must be in descending order"));
        }

        if self.ocr.enabled && self.ocr.timeout_secs == 0 {
            return Err(anyhow!("OCR timeout must be greater than zero"));
        }

        Ok(())
    }

    /// Adapter call policy derived from the translation settings
    pub fn adapter_options(&self) -> AdapterOptions {
        AdapterOptions {
            call_timeout: self.translation.call_timeout(),
            retry_count: self.translation.common.retry_count,
            retry_backoff: Duration::from_millis(self.translation.common.retry_backoff_ms),
            concurrency_limit: self.translation.concurrency_limit(),
        }
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            source_language: None,
            target_language: "hi".to_string(),
            translation: TranslationConfig::default(),
            layout: LayoutConfig::default(),
            ocr: OcrConfig::default(),
            workers: None,
            log_level: LogLevel::default(),
        }
    }
}

impl TranslationConfig {
    /// Get the active provider configuration from the available_providers array
    pub fn get_active_provider_config(&self) -> Option<&ProviderConfig> {
        self.get_provider_config(&self.provider)
    }

    /// Get a specific provider configuration by type
    pub fn get_provider_config(&self, provider_type: &TranslationProvider) -> Option<&ProviderConfig> {
        let provider_str = provider_type.to_lowercase_string();
        self.available_providers.iter().find(|p| p.provider_type == provider_str)
    }

    /// Mutable access to the active provider configuration, created if missing
    pub fn active_provider_config_mut(&mut self) -> &mut ProviderConfig {
        let provider_str = self.provider.to_lowercase_string();
        match self.available_providers.iter().position(|p| p.provider_type == provider_str) {
            Some(index) => &mut self.available_providers[index],
            None => {
                self.available_providers.push(ProviderConfig::new(self.provider));
                let last = self.available_providers.len() - 1;
                &mut self.available_providers[last]
            }
        }
    }

    /// Get the model for the active provider
    pub fn get_model(&self) -> String {
        if let Some(provider_config) = self.get_active_provider_config() {
            if !provider_config.model.is_empty() {
                return provider_config.model.clone();
            }
        }

        match self.provider {
            TranslationProvider::LibreTranslate => String::new(),
            TranslationProvider::Ollama => default_ollama_model(),
        }
    }

    /// Get the API key for the active provider
    pub fn get_api_key(&self) -> Option<String> {
        self.get_active_provider_config()
            .map(|p| p.api_key.clone())
            .filter(|k| !k.is_empty())
    }

    /// Get the endpoint for the active provider
    pub fn get_endpoint(&self) -> String {
        if let Some(provider_config) = self.get_active_provider_config() {
            if !provider_config.endpoint.is_empty() {
                return provider_config.endpoint.clone();
            }
        }

        match self.provider {
            TranslationProvider::LibreTranslate => default_libretranslate_endpoint(),
            TranslationProvider::Ollama => default_ollama_endpoint(),
        }
    }

    /// Per-call timeout: the provider's own setting, else its profile default
    pub fn call_timeout(&self) -> Duration {
        self.get_active_provider_config()
            .and_then(|p| p.timeout_secs)
            .map(Duration::from_secs)
            .unwrap_or_else(|| BackendProfile::for_provider(self.provider).call_timeout)
    }

    /// Global backend concurrency budget
    pub fn concurrency_limit(&self) -> usize {
        BackendProfile::for_provider(self.provider).effective_concurrent_requests(self.common.backend_concurrency_limit)
    }
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            provider: TranslationProvider::default(),
            available_providers: vec![
                ProviderConfig::new(TranslationProvider::LibreTranslate),
                ProviderConfig::new(TranslationProvider::Ollama),
            ],
            common: TranslationCommonConfig::default(),
        }
    }
}

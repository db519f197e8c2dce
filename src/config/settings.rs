//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across tasks.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::paths;

/// Environment variable consulted when `llm.api_key` is not set.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

const OPENAI_HOST: &str = "api.openai.com";

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Reasons a loaded configuration is rejected by [`AppConfig::validate`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("llm.base_url must not be empty")]
    EmptyBaseUrl,

    #[error("llm.temperature must be between 0.0 and 2.0 (got {0})")]
    TemperatureOutOfRange(f32),

    #[error("llm.max_tokens must be greater than zero")]
    ZeroMaxTokens,

    /// Hosted OpenAI keys always carry the `sk-` prefix.
    #[error("invalid OpenAI API key format (expected an `sk-` prefix)")]
    InvalidApiKey,
}

// ---------------------------------------------------------------------------
// LlmConfig
// ---------------------------------------------------------------------------

/// Settings for the text-completion backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Base URL of the OpenAI-compatible API endpoint.
    ///
    /// - OpenAI: `https://api.openai.com`
    /// - Ollama: `http://localhost:11434`
    pub base_url: String,
    /// API key; `None` falls back to `$OPENAI_API_KEY`, and local providers
    /// need neither.
    pub api_key: Option<String>,
    /// Model identifier sent to the API (e.g. `"gpt-3.5-turbo"`).
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Output cap for each assistant reply.
    pub max_tokens: u32,
    /// Maximum seconds to wait for a single completion before timing out.
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".into(),
            api_key: None,
            model: "gpt-3.5-turbo".into(),
            temperature: 0.7,
            max_tokens: 250,
            timeout_secs: 30,
        }
    }
}

impl LlmConfig {
    /// The configured key, or the value of `$OPENAI_API_KEY` when unset.
    pub fn resolved_api_key(&self) -> Option<String> {
        match self.api_key.as_deref() {
            Some(key) if !key.is_empty() => Some(key.to_string()),
            _ => std::env::var(API_KEY_ENV).ok().filter(|k| !k.is_empty()),
        }
    }

    fn targets_openai(&self) -> bool {
        self.base_url.contains(OPENAI_HOST)
    }
}

// ---------------------------------------------------------------------------
// RetryConfig
// ---------------------------------------------------------------------------

/// Backoff policy for rate-limited completion calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries allowed after the initial attempt.
    pub max_retries: u32,
    /// Delay before the first retry; doubles for each retry after that.
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1_000,
        }
    }
}

impl RetryConfig {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }
}

// ---------------------------------------------------------------------------
// StoreConfig
// ---------------------------------------------------------------------------

/// Where finished medication records are written.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Explicit records file; `None` means `<data dir>/medications.jsonl`.
    pub records_file: Option<PathBuf>,
    /// Owner identifier attached to every stored record.
    pub owner_id: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            records_file: None,
            owner_id: "local".into(),
        }
    }
}

impl StoreConfig {
    /// The records file to use, resolving the platform default when unset.
    pub fn resolved_records_file(&self) -> PathBuf {
        self.records_file
            .clone()
            .unwrap_or_else(paths::records_file)
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use medication_assistant::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
/// config.validate().unwrap();
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Completion backend settings.
    pub llm: LlmConfig,
    /// Rate-limit retry policy.
    pub retry: RetryConfig,
    /// Record store settings.
    pub store: StoreConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::settings_file())
    }

    /// Load from an explicit path.
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save to `path`, creating parent directories as needed.
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check value ranges that TOML deserialisation cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let llm = &self.llm;
        if llm.base_url.trim().is_empty() {
            return Err(ConfigError::EmptyBaseUrl);
        }
        if !(0.0..=2.0).contains(&llm.temperature) {
            return Err(ConfigError::TemperatureOutOfRange(llm.temperature));
        }
        if llm.max_tokens == 0 {
            return Err(ConfigError::ZeroMaxTokens);
        }
        if llm.targets_openai() {
            if let Some(key) = llm.api_key.as_deref().filter(|k| !k.is_empty()) {
                if !key.starts_with("sk-") {
                    return Err(ConfigError::InvalidApiKey);
                }
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn round_trip_toml() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("settings.toml");

        let original = AppConfig::default();
        original.save_to(&path).expect("save");

        let loaded = AppConfig::load_from(&path).expect("load");

        assert_eq!(original.llm.base_url, loaded.llm.base_url);
        assert_eq!(original.llm.api_key, loaded.llm.api_key);
        assert_eq!(original.llm.model, loaded.llm.model);
        assert_eq!(original.llm.temperature, loaded.llm.temperature);
        assert_eq!(original.llm.max_tokens, loaded.llm.max_tokens);
        assert_eq!(original.retry, loaded.retry);
        assert_eq!(original.store.owner_id, loaded.store.owner_id);
        assert_eq!(original.store.records_file, loaded.store.records_file);
    }

    #[test]
    fn load_missing_returns_default() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("nonexistent.toml");

        let config = AppConfig::load_from(&path).expect("should not error");
        assert_eq!(config.llm.model, LlmConfig::default().model);
        assert_eq!(config.retry, RetryConfig::default());
    }

    #[test]
    fn default_values() {
        let cfg = AppConfig::default();

        assert_eq!(cfg.llm.base_url, "https://api.openai.com");
        assert_eq!(cfg.llm.model, "gpt-3.5-turbo");
        assert!((cfg.llm.temperature - 0.7).abs() < f32::EPSILON);
        assert_eq!(cfg.llm.max_tokens, 250);
        assert!(cfg.llm.api_key.is_none());
        assert_eq!(cfg.retry.max_retries, 3);
        assert_eq!(cfg.retry.base_delay(), Duration::from_secs(1));
        assert_eq!(cfg.store.owner_id, "local");
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("partial.toml");
        std::fs::write(&path, "[retry]\nbase_delay_ms = 250\n").unwrap();

        let cfg = AppConfig::load_from(&path).expect("load");
        assert_eq!(cfg.retry.base_delay_ms, 250);
        assert_eq!(cfg.retry.max_retries, 3);
        assert_eq!(cfg.llm.model, "gpt-3.5-turbo");
    }

    #[test]
    fn round_trip_modified_values() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("modified.toml");

        let mut cfg = AppConfig::default();
        cfg.llm.base_url = "http://localhost:11434".into();
        cfg.llm.api_key = Some("sk-test".into());
        cfg.llm.model = "qwen2.5:3b".into();
        cfg.retry.max_retries = 5;
        cfg.store.records_file = Some(dir.path().join("meds.jsonl"));
        cfg.store.owner_id = "user-42".into();

        cfg.save_to(&path).expect("save");
        let loaded = AppConfig::load_from(&path).expect("load");

        assert_eq!(loaded.llm.base_url, "http://localhost:11434");
        assert_eq!(loaded.llm.api_key, Some("sk-test".into()));
        assert_eq!(loaded.llm.model, "qwen2.5:3b");
        assert_eq!(loaded.retry.max_retries, 5);
        assert_eq!(loaded.store.records_file, Some(dir.path().join("meds.jsonl")));
        assert_eq!(loaded.store.owner_id, "user-42");
    }

    #[test]
    fn explicit_key_wins_over_environment() {
        let mut llm = LlmConfig::default();
        llm.api_key = Some("sk-explicit".into());
        assert_eq!(llm.resolved_api_key().as_deref(), Some("sk-explicit"));
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut cfg = AppConfig::default();
        cfg.llm.temperature = 3.5;
        assert_eq!(cfg.validate(), Err(ConfigError::TemperatureOutOfRange(3.5)));

        let mut cfg = AppConfig::default();
        cfg.llm.max_tokens = 0;
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroMaxTokens));

        let mut cfg = AppConfig::default();
        cfg.llm.base_url = "  ".into();
        assert_eq!(cfg.validate(), Err(ConfigError::EmptyBaseUrl));
    }

    #[test]
    fn validate_checks_openai_key_prefix() {
        let mut cfg = AppConfig::default();
        cfg.llm.api_key = Some("not-a-key".into());
        assert_eq!(cfg.validate(), Err(ConfigError::InvalidApiKey));

        // Local providers accept any key format.
        cfg.llm.base_url = "http://localhost:11434".into();
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn explicit_records_file_is_used() {
        let mut store = StoreConfig::default();
        store.records_file = Some(PathBuf::from("/tmp/meds.jsonl"));
        assert_eq!(store.resolved_records_file(), PathBuf::from("/tmp/meds.jsonl"));
    }
}

//! Configuration module for the medication assistant.
//!
//! Provides `AppConfig` (top-level settings), sub-configs for each subsystem,
//! the default platform file locations in [`paths`], and TOML persistence via
//! `AppConfig::load_from` / `AppConfig::save_to`.

pub mod paths;
pub mod settings;

pub use settings::{AppConfig, ConfigError, LlmConfig, RetryConfig, StoreConfig};

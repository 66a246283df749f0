//! Configuration management for Chatgate
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from an optional YAML file plus environment overrides.
//! Per-call parameters (model, max tokens, API keys) are resolved inside
//! the provider gateway at call time; this file covers the process-level
//! surface: default provider, system prompt, history bound, data directory.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ChatgateError, Result};

/// Default cap on conversational turns kept per session
pub const DEFAULT_MAX_HISTORY_LENGTH: usize = 10;

fn default_system_prompt() -> String {
    "You are a helpful AI assistant with web search capability; use it to \
     answer questions that need up-to-date information."
        .to_string()
}

fn default_provider_id() -> String {
    "zhipu".to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data/chat_history")
}

fn default_max_history() -> usize {
    DEFAULT_MAX_HISTORY_LENGTH
}

/// Main configuration structure for Chatgate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// System prompt seeded into every session's first turn
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Maximum conversational turns kept per session (system turn excluded)
    #[serde(default = "default_max_history")]
    pub max_history_length: usize,

    /// Directory holding the session database
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Provider configuration
    #[serde(default)]
    pub provider: ProviderConfig,
}

/// Provider configuration
///
/// Specifies the default provider and per-backend endpoint overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Default provider id when a request does not name one
    #[serde(default = "default_provider_id")]
    pub default_provider: String,

    /// OpenAI-style backend settings
    #[serde(default)]
    pub openai: BackendConfig,

    /// Claude-style backend settings
    #[serde(default)]
    pub claude: BackendConfig,

    /// Zhipu-style backend settings
    #[serde(default)]
    pub zhipu: BackendConfig,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            default_provider: default_provider_id(),
            openai: BackendConfig::default(),
            claude: BackendConfig::default(),
            zhipu: BackendConfig::default(),
        }
    }
}

/// Per-backend endpoint settings
///
/// `api_base` exists primarily so tests can point a backend at a mock
/// server; `api_key` takes precedence over the backend's environment
/// variable when set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Optional API base URL override
    #[serde(default)]
    pub api_base: Option<String>,

    /// Optional API key override
    #[serde(default)]
    pub api_key: Option<String>,
}

impl Config {
    /// Load configuration from a file with environment overrides
    ///
    /// A missing file is not an error; defaults are used and the
    /// environment surface is applied on top.
    ///
    /// # Errors
    ///
    /// Returns error if an existing file cannot be read or parsed.
    pub fn load(path: &str) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::debug!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ChatgateError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| ChatgateError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Ok(prompt) = std::env::var("QQBOT_SYSTEM_PROMPT") {
            if !prompt.is_empty() {
                self.system_prompt = prompt;
            }
        }

        if let Ok(raw) = std::env::var("QQBOT_MAX_HISTORY_LENGTH") {
            match raw.parse::<usize>() {
                Ok(value) => self.max_history_length = value,
                Err(_) => {
                    tracing::warn!(
                        "QQBOT_MAX_HISTORY_LENGTH value '{}' is not a valid integer, \
                         falling back to {}",
                        raw,
                        DEFAULT_MAX_HISTORY_LENGTH
                    );
                    self.max_history_length = DEFAULT_MAX_HISTORY_LENGTH;
                }
            }
        }

        if let Ok(provider) = std::env::var("LLM_PROVIDER") {
            if !provider.is_empty() {
                self.provider.default_provider = provider.to_lowercase();
            }
        }

        if let Ok(dir) = std::env::var("CHATGATE_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns error if any validation check fails
    pub fn validate(&self) -> Result<()> {
        if self.system_prompt.trim().is_empty() {
            return Err(
                ChatgateError::Config("system_prompt cannot be empty".to_string()).into(),
            );
        }

        if self.max_history_length == 0 {
            return Err(ChatgateError::Config(
                "max_history_length must be greater than 0".to_string(),
            )
            .into());
        }

        if self.provider.default_provider.is_empty() {
            return Err(
                ChatgateError::Config("default_provider cannot be empty".to_string()).into(),
            );
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            system_prompt: default_system_prompt(),
            max_history_length: default_max_history(),
            data_dir: default_data_dir(),
            provider: ProviderConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.max_history_length, 10);
        assert_eq!(config.provider.default_provider, "zhipu");
        assert!(!config.system_prompt.is_empty());
    }

    #[test]
    fn test_config_validation_success() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_config_validation_empty_prompt() {
        let mut config = Config::default();
        config.system_prompt = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_zero_history() {
        let mut config = Config::default();
        config.max_history_length = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_from_yaml() {
        let yaml = r#"
system_prompt: "You are a test bot."
max_history_length: 4
data_dir: /tmp/chatgate-test
provider:
  default_provider: openai
  openai:
    api_base: http://localhost:9999
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.system_prompt, "You are a test bot.");
        assert_eq!(config.max_history_length, 4);
        assert_eq!(config.provider.default_provider, "openai");
        assert_eq!(
            config.provider.openai.api_base.as_deref(),
            Some("http://localhost:9999")
        );
        assert!(config.provider.zhipu.api_base.is_none());
    }

    #[test]
    #[serial]
    fn test_env_override_history_length() {
        std::env::set_var("QQBOT_MAX_HISTORY_LENGTH", "3");
        let mut config = Config::default();
        config.apply_env_vars();
        assert_eq!(config.max_history_length, 3);
        std::env::remove_var("QQBOT_MAX_HISTORY_LENGTH");
    }

    #[test]
    #[serial]
    fn test_env_override_history_length_invalid_falls_back() {
        std::env::set_var("QQBOT_MAX_HISTORY_LENGTH", "not-a-number");
        let mut config = Config::default();
        config.max_history_length = 42;
        config.apply_env_vars();
        assert_eq!(config.max_history_length, DEFAULT_MAX_HISTORY_LENGTH);
        std::env::remove_var("QQBOT_MAX_HISTORY_LENGTH");
    }

    #[test]
    #[serial]
    fn test_env_override_provider_lowercased() {
        std::env::set_var("LLM_PROVIDER", "OpenAI");
        let mut config = Config::default();
        config.apply_env_vars();
        assert_eq!(config.provider.default_provider, "openai");
        std::env::remove_var("LLM_PROVIDER");
    }

    #[test]
    #[serial]
    fn test_env_override_system_prompt() {
        std::env::set_var("QQBOT_SYSTEM_PROMPT", "Be terse.");
        let mut config = Config::default();
        config.apply_env_vars();
        assert_eq!(config.system_prompt, "Be terse.");
        std::env::remove_var("QQBOT_SYSTEM_PROMPT");
    }
}

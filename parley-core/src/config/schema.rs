//! Configuration schema definitions

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::utils::expand_tilde;

/// Instruction message used when none is configured
pub const DEFAULT_INSTRUCTION: &str = include_str!("default_instruction.md");

/// Root configuration for parley
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Assistant behaviour and completion parameters
    #[serde(default)]
    pub assistant: AssistantConfig,
    /// Completion provider connection
    #[serde(default)]
    pub provider: ProviderConfig,
    /// Transcript persistence
    #[serde(default)]
    pub transcripts: TranscriptConfig,
    /// HTTP server
    #[serde(default)]
    pub server: ServerConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (text, json)
    #[serde(default = "default_log_format")]
    pub format: String,
    /// Directory for log files
    #[serde(default = "default_log_dir")]
    pub dir: String,
    /// Module-specific overrides
    #[serde(default)]
    pub overrides: HashMap<String, String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_log_dir() -> String {
    "~/.parley/logs".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            dir: default_log_dir(),
            overrides: HashMap::new(),
        }
    }
}

/// Assistant settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantConfig {
    /// Model name sent to the provider
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// Maximum reply length in tokens
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Instruction message every session starts with
    #[serde(default = "default_instruction")]
    pub instruction: String,
    /// File whose content replaces `instruction`
    #[serde(default)]
    pub instruction_file: Option<String>,
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_temperature() -> f64 {
    0.7
}

fn default_max_tokens() -> u32 {
    200
}

fn default_instruction() -> String {
    DEFAULT_INSTRUCTION.trim().to_string()
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            instruction: default_instruction(),
            instruction_file: None,
        }
    }
}

impl AssistantConfig {
    /// Resolve the instruction text, reading `instruction_file` when set
    pub fn resolve_instruction(&self) -> crate::Result<String> {
        match self.instruction_file.as_deref().map(str::trim) {
            Some(path) if !path.is_empty() => {
                let path = expand_tilde(path);
                let content = std::fs::read_to_string(&path).map_err(|e| {
                    crate::Error::Config(format!(
                        "failed to read instruction file {}: {}",
                        path.display(),
                        e
                    ))
                })?;
                Ok(content.trim().to_string())
            }
            _ => Ok(self.instruction.clone()),
        }
    }
}

/// Completion provider configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProviderConfig {
    #[serde(default)]
    pub api_key: String,
    /// Base URL of an OpenAI-compatible API; the OpenAI endpoint when unset
    #[serde(default)]
    pub api_base: Option<String>,
    #[serde(default)]
    pub extra_headers: Option<HashMap<String, String>>,
}

impl ProviderConfig {
    /// Whether an API key is configured
    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}

/// Transcript persistence configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptConfig {
    /// Whether transcripts are written at all
    #[serde(default = "default_transcripts_enabled")]
    pub enabled: bool,
    /// Directory transcripts are written to
    #[serde(default = "default_transcripts_dir")]
    pub dir: String,
}

fn default_transcripts_enabled() -> bool {
    true
}

fn default_transcripts_dir() -> String {
    "~/.parley/conversations".to_string()
}

impl Default for TranscriptConfig {
    fn default() -> Self {
        Self {
            enabled: default_transcripts_enabled(),
            dir: default_transcripts_dir(),
        }
    }
}

impl TranscriptConfig {
    /// Transcript directory with `~` expanded
    pub fn dir_path(&self) -> PathBuf {
        expand_tilde(&self.dir)
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    5000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

//! Configuration settings for f1ai.

use crate::agent::DriverConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub model: ModelSettings,
    pub ergast: ErgastSettings,
    pub server: ServerSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for storing application data.
    pub data_dir: String,
    /// Directory chart artifacts are written under.
    pub charts_dir: String,
    /// Log level (trace, debug, info, warn, error) used when `-v` is not given.
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.f1ai".to_string(),
            charts_dir: "~/.f1ai/charts".to_string(),
            log_level: "warn".to_string(),
        }
    }
}

/// Chat model and conversation loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    /// Chat completion model.
    pub model: String,
    /// Output cap for every completion.
    pub max_output_tokens: u32,
    /// Estimated tokens above which a tool result is replaced by an overflow notice.
    pub token_budget: usize,
    /// Tool calls allowed per question.
    pub max_tool_rounds: usize,
    /// Deadline for a single completion request or tool call.
    pub request_timeout_secs: u64,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            model: "gpt-3.5-turbo".to_string(),
            max_output_tokens: 150,
            token_budget: 1000,
            max_tool_rounds: 10,
            request_timeout_secs: 60,
        }
    }
}

/// Ergast results API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ErgastSettings {
    /// Base URL of an Ergast-compatible API.
    pub base_url: String,
    /// HTTP timeout in seconds.
    pub timeout_secs: u64,
    /// Rows requested per call (`limit` query parameter).
    pub page_limit: u32,
}

impl Default for ErgastSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.jolpi.ca/ergast/f1/".to_string(),
            timeout_secs: 30,
            page_limit: 1000,
        }
    }
}

/// Web server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Request chart directories kept on disk; older ones are pruned.
    pub chart_history: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8501,
            chart_history: 50,
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct PromptSettings {
    /// Replacement for the built-in system prompt template.
    pub system: Option<String>,
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: std::collections::HashMap<String, String>,
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::F1Error::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("f1ai")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    /// Get the expanded charts directory path.
    pub fn charts_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.charts_dir)
    }

    /// Chart root owned by the `ask` and `chat` commands.
    pub fn cli_charts_dir(&self) -> PathBuf {
        self.charts_dir().join("cli")
    }

    /// Chart root owned by the web server, one session per request.
    pub fn web_charts_dir(&self) -> PathBuf {
        self.charts_dir().join("web")
    }

    /// Conversation loop tunables derived from the model section.
    pub fn driver_config(&self) -> DriverConfig {
        let timeout = Duration::from_secs(self.model.request_timeout_secs);
        DriverConfig {
            max_output_tokens: self.model.max_output_tokens,
            token_budget: self.model.token_budget,
            max_tool_rounds: self.model.max_tool_rounds,
            completion_timeout: timeout,
            tool_timeout: timeout,
        }
    }
}

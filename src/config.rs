use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::llm::ChatSettings;
use crate::prompts;

/// Environment variables checked for the API key, in order.
const API_KEY_ENV: [&str; 2] = ["GEMINI_API_KEY", "API_KEY"];

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Gemini API key; falls back to the environment when unset
    pub api_key: Option<String>,

    /// Model identifier used for every chat session
    pub model: String,

    /// Sampling temperature
    pub temperature: f32,

    /// Base URL of the generative language API
    pub base_url: String,

    /// Timeout for a whole streamed request, in seconds
    pub request_timeout_secs: u64,

    /// Replaces the built-in admissions system instruction
    pub system_instruction: Option<String>,

    /// UI preferences
    pub ui: UiConfig,

    /// Directory holding config.toml and logs
    #[serde(skip)]
    pub home: PathBuf,
}

/// UI configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub show_sidebar: bool,
    pub confirm_reset: bool,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            show_sidebar: false,
            confirm_reset: true,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            api_key: None,
            model: "gemini-2.5-flash".to_string(),
            temperature: 0.7,
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            request_timeout_secs: 120,
            system_instruction: None,
            ui: UiConfig::default(),
            home: default_home(),
        }
    }
}

fn default_home() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".dut-advisor")
}

impl Config {
    /// Load configuration from `path`, or from `~/.dut-advisor/config.toml`.
    /// A missing file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (config_path, home) = match path {
            Some(path) => {
                let home = path
                    .parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(default_home);
                (path.to_path_buf(), home)
            }
            None => {
                let home = default_home();
                (home.join("config.toml"), home)
            }
        };

        let mut config = if config_path.exists() {
            let content = fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read {}", config_path.display()))?;
            toml::from_str::<Config>(&content)
                .with_context(|| format!("Failed to parse {}", config_path.display()))?
        } else {
            Config::default()
        };
        config.home = home;

        Ok(config)
    }

    /// Directory for log files
    pub fn log_dir(&self) -> PathBuf {
        self.home.join("logs")
    }

    /// Get API key from config or environment
    pub fn api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .or_else(|| {
                API_KEY_ENV
                    .iter()
                    .find_map(|name| std::env::var(name).ok().filter(|key| !key.trim().is_empty()))
            })
    }

    /// Settings every new chat session is created with
    pub fn chat_settings(&self) -> ChatSettings {
        ChatSettings {
            model: self.model.clone(),
            system_instruction: self
                .system_instruction
                .clone()
                .unwrap_or_else(|| prompts::SYSTEM_INSTRUCTION.trim().to_string()),
            temperature: self.temperature,
        }
    }
}

//! Layered configuration: defaults < TOML file < `CHATWIRE_*` environment.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::client::ReasoningEffort;
use crate::error::{ChatwireError, Result};

/// Full configuration for the streaming pipeline.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub bot: BotConfig,
    pub model: ModelConfig,
    pub session: SessionConfig,
    pub api: ApiConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BotConfig {
    /// System prompt seeded into every fresh session.
    pub prompt: String,
    /// Post "thinking…" actions while the model reasons.
    pub show_thinking_action: bool,
    /// Post "calling <tool>" actions before tool execution.
    pub show_tool_actions: bool,
    /// Log full tool output instead of a truncated preview.
    pub verbose: bool,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            prompt: "you are a helpful assistant in a chat channel. keep responses concise."
                .to_string(),
            show_thinking_action: true,
            show_tool_actions: true,
            verbose: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModelConfig {
    pub model: String,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f64>,
    pub top_p: Option<f64>,
    pub reasoning_effort: ReasoningEffort,
    /// `false` asks the client for a non-streaming completion.
    pub stream: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model: "ollama/llama3.2".to_string(),
            max_tokens: Some(4096),
            temperature: Some(0.7),
            top_p: None,
            reasoning_effort: ReasoningEffort::Off,
            stream: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// Protocol message size bound, in bytes.
    pub chunk_max: usize,
    /// Conversational messages retained per session (0 = unlimited).
    pub max_history: usize,
    /// Idle seconds before a session is recycled.
    pub ttl_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            chunk_max: 350,
            max_history: 50,
            ttl_secs: 1800,
        }
    }
}

impl SessionConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ApiConfig {
    /// Overall budget for one request: lock wait, streaming, and tools.
    pub timeout_secs: u64,
    /// Hard cap on model turns per request (first turn + continuations).
    pub max_turns: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 300,
            max_turns: 8,
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    /// Load configuration.
    ///
    /// Resolution: explicit `path` > `CHATWIRE_CONFIG` > the platform config
    /// directory; a missing file is not an error. `CHATWIRE_*` variables
    /// override scalar fields last. A `.env` file is honored if present.
    pub fn load(path: Option<&Path>) -> Result<Config> {
        let _ = dotenvy::dotenv();

        let path = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var("CHATWIRE_CONFIG").ok().map(PathBuf::from))
            .or_else(default_config_path);

        let mut config = match path {
            Some(ref path) if path.exists() => {
                tracing::debug!(path = %path.display(), "config_file_loaded");
                let raw = std::fs::read_to_string(path)?;
                toml::from_str(&raw)?
            }
            _ => Config::default(),
        };
        config.apply_env()?;
        Ok(config)
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(v) = std::env::var("CHATWIRE_PROMPT") {
            self.bot.prompt = v;
        }
        if let Ok(v) = std::env::var("CHATWIRE_MODEL") {
            self.model.model = v;
        }
        if let Ok(v) = std::env::var("CHATWIRE_REASONING_EFFORT") {
            self.model.reasoning_effort = ReasoningEffort::from_str(&v).map_err(|_| {
                ChatwireError::Configuration(format!("invalid reasoning effort: {v}"))
            })?;
        }
        if let Ok(v) = std::env::var("CHATWIRE_CHUNK_MAX") {
            self.session.chunk_max = parse_env("CHATWIRE_CHUNK_MAX", &v)?;
        }
        if let Ok(v) = std::env::var("CHATWIRE_MAX_HISTORY") {
            self.session.max_history = parse_env("CHATWIRE_MAX_HISTORY", &v)?;
        }
        if let Ok(v) = std::env::var("CHATWIRE_SESSION_TTL_SECS") {
            self.session.ttl_secs = parse_env("CHATWIRE_SESSION_TTL_SECS", &v)?;
        }
        if let Ok(v) = std::env::var("CHATWIRE_TIMEOUT_SECS") {
            self.api.timeout_secs = parse_env("CHATWIRE_TIMEOUT_SECS", &v)?;
        }
        if let Ok(v) = std::env::var("CHATWIRE_MAX_TURNS") {
            self.api.max_turns = parse_env("CHATWIRE_MAX_TURNS", &v)?;
        }
        Ok(())
    }
}

fn parse_env<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| ChatwireError::Configuration(format!("invalid value for {key}: {value}")))
}

fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "chatwire")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

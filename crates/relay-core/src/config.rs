//! Configuration for the relay host
//!
//! Loads configuration with priority:
//! 1. config.toml (or specified config file)
//! 2. Environment variables (for `${VAR}` references and key fallbacks)
//! 3. Defaults

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Top-level host configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostConfig {
    #[serde(default)]
    pub model: ModelConfig,

    #[serde(default)]
    pub host: OrchestratorConfig,

    #[serde(default)]
    pub server: ServerConfig,

    /// MCP servers to connect to at startup
    #[serde(default)]
    pub mcp_servers: Vec<McpServerConfig>,
}

/// Model/LLM configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_provider")]
    pub provider: String,

    /// API key (can reference an env var with ${VAR_NAME})
    pub api_key: Option<String>,

    #[serde(default = "default_model_name")]
    pub model_name: String,

    /// Override for OpenAI-compatible endpoints
    pub base_url: Option<String>,
}

/// Orchestrator behavior configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Output token cap per model request
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Lifetime of the result relay queue
    #[serde(default)]
    pub queue_policy: QueuePolicy,
}

/// Lifetime policy for the result relay queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QueuePolicy {
    /// Queue is cleared at the start of every query
    #[default]
    PerTurn,
    /// Queue contents survive across queries until explicitly cleared
    Persistent,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

/// A configured MCP server endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "transport", rename_all = "kebab-case")]
pub enum McpServerConfig {
    /// Subprocess server spoken to over stdio
    Stdio {
        name: String,
        command: String,
        #[serde(default)]
        args: Vec<String>,
        #[serde(default)]
        env: HashMap<String, String>,
    },
    /// Remote server spoken to over streamable HTTP
    StreamableHttp { name: String, url: String },
}

impl McpServerConfig {
    pub fn name(&self) -> &str {
        match self {
            McpServerConfig::Stdio { name, .. } => name,
            McpServerConfig::StreamableHttp { name, .. } => name,
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            api_key: None,
            model_name: default_model_name(),
            base_url: None,
        }
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_tokens: default_max_tokens(),
            queue_policy: QueuePolicy::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            model: ModelConfig::default(),
            host: OrchestratorConfig::default(),
            server: ServerConfig::default(),
            mcp_servers: Vec::new(),
        }
    }
}

impl HostConfig {
    /// Load configuration from config.toml found in the current directory
    /// or a parent, falling back to env-var-only defaults if absent.
    pub fn load() -> Result<Self> {
        match Self::find_config_file() {
            Some(path) => Self::load_from(&path),
            None => {
                tracing::debug!("No config.toml found, using defaults");
                let mut config = Self::default();
                config.resolve_env_vars();
                Ok(config)
            }
        }
    }

    /// Load configuration from a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        tracing::debug!(path = %path.display(), "Loading configuration");

        let contents = fs::read_to_string(path).map_err(|e| {
            Error::config_error(format!("Failed to read config file {}: {e}", path.display()))
        })?;

        let mut config: HostConfig = toml::from_str(&contents).map_err(|e| {
            Error::config_error(format!("Failed to parse config file {}: {e}", path.display()))
        })?;

        config.resolve_env_vars();
        Ok(config)
    }

    /// Find config.toml by searching the current directory and parents
    fn find_config_file() -> Option<PathBuf> {
        let mut current = env::current_dir().ok()?;

        loop {
            let candidate = current.join("config.toml");
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Resolve `${VAR_NAME}` references against the environment
    fn resolve_env_vars(&mut self) {
        match &self.model.api_key {
            Some(key) => {
                if let Some(resolved) = resolve_env_var(key) {
                    self.model.api_key = Some(resolved);
                }
            }
            None => {
                // Fall back to the conventional env var for the provider
                self.model.api_key = env::var("GROQ_API_KEY").ok();
            }
        }

        if let Some(url) = &self.model.base_url {
            if let Some(resolved) = resolve_env_var(url) {
                self.model.base_url = Some(resolved);
            }
        }
    }
}

/// Resolve a `${VAR_NAME}` reference, returning None if the value is not a
/// reference or the variable is unset.
fn resolve_env_var(value: &str) -> Option<String> {
    let name = value.strip_prefix("${")?.strip_suffix('}')?;
    env::var(name).ok()
}

fn default_provider() -> String {
    "groq".to_string()
}

fn default_model_name() -> String {
    "llama-3.3-70b-versatile".to_string()
}

fn default_max_tokens() -> u32 {
    1000
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

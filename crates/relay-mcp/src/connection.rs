//! Connection parameters for MCP servers

use relay_core::McpServerConfig;
use std::collections::HashMap;

/// Parameters for connecting to an MCP server via stdio subprocess
#[derive(Debug, Clone)]
pub struct StdioConnectionParams {
    pub command: String,
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
}

impl StdioConnectionParams {
    /// Create new connection parameters with the given command
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            env: HashMap::new(),
        }
    }

    /// Add a command-line argument
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add an environment variable
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }
}

/// Parameters for connecting to an MCP server via streamable HTTP
#[derive(Debug, Clone)]
pub struct HttpConnectionParams {
    pub url: String,
}

impl HttpConnectionParams {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

/// Transport-polymorphic connection parameters
#[derive(Debug, Clone)]
pub enum ConnectionParams {
    Stdio(StdioConnectionParams),
    StreamableHttp(HttpConnectionParams),
}

impl From<StdioConnectionParams> for ConnectionParams {
    fn from(params: StdioConnectionParams) -> Self {
        ConnectionParams::Stdio(params)
    }
}

impl From<HttpConnectionParams> for ConnectionParams {
    fn from(params: HttpConnectionParams) -> Self {
        ConnectionParams::StreamableHttp(params)
    }
}

impl From<&McpServerConfig> for ConnectionParams {
    fn from(config: &McpServerConfig) -> Self {
        match config {
            McpServerConfig::Stdio {
                command, args, env, ..
            } => ConnectionParams::Stdio(StdioConnectionParams {
                command: command.clone(),
                args: args.clone(),
                env: env.clone(),
            }),
            McpServerConfig::StreamableHttp { url, .. } => {
                ConnectionParams::StreamableHttp(HttpConnectionParams::new(url.clone()))
            }
        }
    }
}

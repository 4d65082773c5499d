use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Connection to server '{server}' failed: {source}")]
    Connection {
        server: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Tool '{tool}' invocation failed: {source}")]
    ToolFailed {
        tool: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Model request failed: {0}")]
    Model(String),

    #[error("Malformed arguments for tool '{tool}': {detail}")]
    MalformedArguments { tool: String, detail: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Helper for creating connection errors
    pub fn connection(server: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        Error::Connection {
            server: server.into(),
            source: source.into(),
        }
    }

    /// Helper for creating tool invocation errors
    pub fn tool_failed(tool: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        Error::ToolFailed {
            tool: tool.into(),
            source: source.into(),
        }
    }

    /// Helper for creating configuration errors
    pub fn config_error(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }
}

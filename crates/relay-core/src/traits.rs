use crate::content::{Message, ModelReply, ToolDescriptor};
use crate::error::Result;
use async_trait::async_trait;
use tokio::sync::broadcast;

/// Request to a chat model
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub messages: Vec<Message>,
    /// Tool catalog offered to the model; empty on follow-up requests
    pub tools: Vec<ToolDescriptor>,
    pub max_tokens: Option<u32>,
}

impl ChatRequest {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            tools: Vec::new(),
            max_tokens: None,
        }
    }

    pub fn with_tools(mut self, tools: Vec<ToolDescriptor>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// ChatModel trait - abstraction for LLM chat-completion backends
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Returns the model identifier
    fn name(&self) -> &str;

    /// Runs one completion round-trip
    async fn complete(&self, request: ChatRequest) -> Result<ModelReply>;
}

/// Asynchronous event delivered by a tool transport
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// The server's advertised tool list changed; re-list and re-register
    ToolListChanged,
    /// A server-initiated log message
    Log {
        level: String,
        data: serde_json::Value,
    },
}

/// ToolTransport trait - abstraction for a connected tool server
#[async_trait]
pub trait ToolTransport: Send + Sync {
    /// Identifier of the server this transport is connected to
    fn server_id(&self) -> &str;

    /// Lists the tools the server currently advertises
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>>;

    /// Invokes a tool, returning its structured content items
    async fn call_tool(&self, name: &str, args: serde_json::Value)
        -> Result<Vec<serde_json::Value>>;

    /// Subscribes to server-initiated notifications.
    ///
    /// The default implementation returns a receiver that never yields,
    /// for transports without a notification channel.
    fn subscribe(&self) -> broadcast::Receiver<TransportEvent> {
        let (_tx, rx) = broadcast::channel(1);
        rx
    }

    /// Tears down the connection. Subsequent calls on the transport fail.
    ///
    /// The default implementation is a no-op for transports with nothing
    /// to release.
    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }
}

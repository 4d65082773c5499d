//! Core traits and types for the relay host
//!
//! This crate provides the shared abstractions the host is built on: the
//! chat transcript model, the `ChatModel` and `ToolTransport` seams, the
//! workspace error enum, and configuration loading.

pub mod config;
pub mod content;
pub mod error;
pub mod traits;

// Re-exports
pub use config::{
    HostConfig, McpServerConfig, ModelConfig, OrchestratorConfig, QueuePolicy, ServerConfig,
};
pub use content::{Message, ModelReply, PendingCall, Role, ToolDescriptor};
pub use error::{Error, Result};
pub use traits::{ChatModel, ChatRequest, ToolTransport, TransportEvent};

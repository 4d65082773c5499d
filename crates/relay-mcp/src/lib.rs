//! MCP (Model Context Protocol) transports for the relay host
//!
//! Built on the official rmcp Rust SDK. Supports stdio subprocess servers
//! and remote streamable-HTTP servers behind the same `ToolTransport` seam,
//! and forwards server-initiated notifications (tool-list-changed, logging)
//! into the host's event channel.

pub mod client;
pub mod connection;

// Re-exports
pub use client::McpClient;
pub use connection::{ConnectionParams, HttpConnectionParams, StdioConnectionParams};

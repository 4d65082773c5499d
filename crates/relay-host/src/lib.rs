//! The tool-orchestration core of the relay host
//!
//! This crate holds the four pieces the host is really about:
//! - `ToolRegistry`: name → owning transport, rebuilt on tool-list changes
//! - `RelayQueue`: FIFO buffer piping one tool's output into the next call
//! - the dispatcher: resolves, substitutes, invokes, and records tool calls
//! - `ChatOrchestrator`: drives one user query through the model round-trips

pub mod dispatcher;
pub mod orchestrator;
pub mod queue;
pub mod registry;

// Re-exports
pub use dispatcher::dispatch_calls;
pub use orchestrator::{ChatOrchestrator, ChatOrchestratorBuilder};
pub use queue::RelayQueue;
pub use registry::{RegistryEntry, ToolRegistry};

//! Chat-model backends for the relay host
//!
//! Currently one implementation: the Groq OpenAI-compatible
//! chat-completions API with function calling.

pub mod groq;
pub mod types;

// Re-exports
pub use groq::GroqModel;

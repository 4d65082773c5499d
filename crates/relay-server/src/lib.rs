//! HTTP surface for the relay host

pub mod rest;
pub mod types;

// Re-exports
pub use rest::create_router;
pub use types::{ChatRequestBody, ChatResponseBody};

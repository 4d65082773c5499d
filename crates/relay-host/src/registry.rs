//! Tool registry
//!
//! Maps each advertised tool name to the transport that serves it. Rebuilt
//! on connect and on tool-list-changed notifications; last writer wins when
//! two servers advertise the same name.

use relay_core::{ToolDescriptor, ToolTransport};
use std::collections::HashMap;
use std::sync::Arc;

/// A registered tool and the transport that owns it
#[derive(Clone)]
pub struct RegistryEntry {
    pub descriptor: ToolDescriptor,
    pub transport: Arc<dyn ToolTransport>,
}

#[derive(Default)]
pub struct ToolRegistry {
    entries: HashMap<String, RegistryEntry>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Merge a server's tool list into the registry, overwriting any
    /// existing entry with the same name.
    pub fn register(&mut self, transport: Arc<dyn ToolTransport>, tools: Vec<ToolDescriptor>) {
        for descriptor in tools {
            if let Some(previous) = self.entries.get(&descriptor.name) {
                if previous.transport.server_id() != transport.server_id() {
                    tracing::warn!(
                        tool = %descriptor.name,
                        previous = %previous.transport.server_id(),
                        new = %transport.server_id(),
                        "Tool name collision, last registration wins"
                    );
                }
            }
            tracing::debug!(
                tool = %descriptor.name,
                server = %transport.server_id(),
                "Registering tool"
            );
            self.entries.insert(
                descriptor.name.clone(),
                RegistryEntry {
                    descriptor,
                    transport: transport.clone(),
                },
            );
        }
    }

    /// Resolve a tool name to its registry entry
    pub fn lookup(&self, name: &str) -> Option<&RegistryEntry> {
        self.entries.get(name)
    }

    /// The full descriptor list, in tool-catalog form for a model request
    pub fn snapshot(&self) -> Vec<ToolDescriptor> {
        self.entries
            .values()
            .map(|entry| entry.descriptor.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use relay_core::Result;
    use serde_json::{json, Value};

    struct NullTransport {
        id: String,
    }

    impl NullTransport {
        fn new(id: &str) -> Arc<dyn ToolTransport> {
            Arc::new(Self { id: id.to_string() })
        }
    }

    #[async_trait]
    impl ToolTransport for NullTransport {
        fn server_id(&self) -> &str {
            &self.id
        }

        async fn list_tools(&self) -> Result<Vec<ToolDescriptor>> {
            Ok(Vec::new())
        }

        async fn call_tool(&self, _name: &str, _args: Value) -> Result<Vec<Value>> {
            Ok(Vec::new())
        }
    }

    fn descriptor(name: &str) -> ToolDescriptor {
        ToolDescriptor {
            name: name.to_string(),
            description: format!("{name} tool"),
            input_schema: json!({"type": "object"}),
        }
    }

    #[test]
    fn test_last_writer_wins_on_collision() {
        let server1 = NullTransport::new("server1");
        let server2 = NullTransport::new("server2");

        let mut registry = ToolRegistry::new();
        registry.register(server1, vec![descriptor("a"), descriptor("b")]);
        registry.register(server2, vec![descriptor("b"), descriptor("c")]);

        assert_eq!(registry.len(), 3);
        assert_eq!(registry.lookup("a").unwrap().transport.server_id(), "server1");
        assert_eq!(registry.lookup("b").unwrap().transport.server_id(), "server2");
        assert_eq!(registry.lookup("c").unwrap().transport.server_id(), "server2");
    }

    #[test]
    fn test_lookup_unknown_tool_is_a_miss() {
        let registry = ToolRegistry::new();
        assert!(registry.lookup("nonexistent").is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_snapshot_returns_all_descriptors() {
        let server = NullTransport::new("server1");
        let mut registry = ToolRegistry::new();
        registry.register(server, vec![descriptor("a"), descriptor("b")]);

        let mut names: Vec<String> = registry
            .snapshot()
            .into_iter()
            .map(|d| d.name)
            .collect();
        names.sort();
        assert_eq!(names, vec!["a", "b"]);
    }
}

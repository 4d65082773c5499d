//! Chat orchestrator
//!
//! Drives a single user query through one or more model round-trips. A turn
//! is: send transcript plus tool catalog to the model; if it answers with
//! plain text, that text is the result; if it requests function calls, the
//! batch is dispatched and exactly one follow-up request (without the
//! catalog) produces the final text. One queue and one registry per
//! instance; callers serialize concurrent turns externally.

use crate::dispatcher::dispatch_calls;
use crate::queue::RelayQueue;
use crate::registry::ToolRegistry;
use relay_core::{
    ChatModel, ChatRequest, Error, Message, OrchestratorConfig, QueuePolicy, Result,
    ToolTransport, TransportEvent,
};
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

pub struct ChatOrchestrator {
    model: Arc<dyn ChatModel>,
    registry: Arc<RwLock<ToolRegistry>>,
    queue: RelayQueue<String>,
    transports: Vec<Arc<dyn ToolTransport>>,
    max_tokens: u32,
    queue_policy: QueuePolicy,
}

impl ChatOrchestrator {
    pub fn builder() -> ChatOrchestratorBuilder {
        ChatOrchestratorBuilder::new()
    }

    /// Connect a transport: list its tools, register them, and start
    /// watching its notification channel.
    pub async fn add_transport(&mut self, transport: Arc<dyn ToolTransport>) -> Result<()> {
        let tools = transport.list_tools().await?;
        tracing::info!(
            server = %transport.server_id(),
            count = tools.len(),
            tools = ?tools.iter().map(|t| t.name.as_str()).collect::<Vec<_>>(),
            "Connected to server"
        );

        self.registry.write().await.register(transport.clone(), tools);
        self.spawn_notification_watcher(transport.clone());
        self.transports.push(transport);
        Ok(())
    }

    /// Re-list one server's tools and merge them into the registry
    async fn refresh_transport(
        registry: &RwLock<ToolRegistry>,
        transport: &Arc<dyn ToolTransport>,
    ) {
        match transport.list_tools().await {
            Ok(tools) => {
                tracing::info!(
                    server = %transport.server_id(),
                    count = tools.len(),
                    "Refreshed tool list"
                );
                registry.write().await.register(transport.clone(), tools);
            }
            Err(e) => {
                tracing::error!(
                    server = %transport.server_id(),
                    error = %e,
                    "Failed to refresh tool list"
                );
            }
        }
    }

    fn spawn_notification_watcher(&self, transport: Arc<dyn ToolTransport>) {
        let registry = self.registry.clone();
        let mut events = transport.subscribe();

        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(TransportEvent::ToolListChanged) => {
                        Self::refresh_transport(&registry, &transport).await;
                    }
                    Ok(TransportEvent::Log { level, data }) => {
                        tracing::info!(
                            server = %transport.server_id(),
                            %level,
                            %data,
                            "Server log"
                        );
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(
                            server = %transport.server_id(),
                            skipped,
                            "Notification receiver lagged"
                        );
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
    }

    /// Drive one user query to a final text answer.
    ///
    /// Model-call failures end the turn and surface to the caller; a tool
    /// invocation failure does not (the dispatcher converts it into a
    /// tool-role transcript entry and the follow-up request still runs).
    pub async fn process_query(&mut self, query: &str) -> Result<String> {
        if self.queue_policy == QueuePolicy::PerTurn {
            self.queue.clear();
        }

        let mut transcript = vec![Message::user(query)];
        let catalog = self.registry.read().await.snapshot();

        tracing::debug!(tool_count = catalog.len(), "Sending query to model");

        let mut reply = self
            .model
            .complete(
                ChatRequest::new(transcript.clone())
                    .with_tools(catalog)
                    .with_max_tokens(self.max_tokens),
            )
            .await?;

        if !reply.has_tool_calls() {
            tracing::debug!("Model answered without tool calls");
            return Ok(reply.text.unwrap_or_default());
        }

        // Some backends omit correlation ids; every call needs one so the
        // tool-role answers can reference it.
        for call in &mut reply.tool_calls {
            if call.id.is_empty() {
                call.id = Uuid::new_v4().to_string();
            }
        }

        tracing::debug!(call_count = reply.tool_calls.len(), "Dispatching tool calls");

        let calls = reply.tool_calls.clone();
        transcript.push(Message::assistant_with_calls(reply.text, reply.tool_calls));

        {
            let registry = Arc::clone(&self.registry);
            let registry = registry.read().await;
            dispatch_calls(&registry, &mut self.queue, &mut transcript, &calls).await?;
        }

        // Exactly one follow-up request with the tool outputs appended;
        // no tool catalog on the second pass.
        let followup = self
            .model
            .complete(ChatRequest::new(transcript).with_max_tokens(self.max_tokens))
            .await?;

        Ok(followup.text.unwrap_or_default())
    }

    /// Close every connected transport and empty the registry.
    ///
    /// A transport that fails to close is logged and skipped so the rest
    /// still get torn down.
    pub async fn shutdown(&mut self) {
        for transport in self.transports.drain(..) {
            if let Err(e) = transport.shutdown().await {
                tracing::warn!(
                    server = %transport.server_id(),
                    error = %e,
                    "Failed to close transport"
                );
            }
        }
        self.registry.write().await.clear();
        tracing::info!("Orchestrator shut down");
    }

    /// Explicitly discard any queued intermediate results
    pub fn clear_queue(&mut self) {
        self.queue.clear();
    }

    /// Number of queued intermediate results
    pub fn queued_results(&self) -> usize {
        self.queue.len()
    }

    pub fn registry(&self) -> Arc<RwLock<ToolRegistry>> {
        self.registry.clone()
    }
}

/// Builder for ChatOrchestrator
pub struct ChatOrchestratorBuilder {
    model: Option<Arc<dyn ChatModel>>,
    max_tokens: u32,
    queue_policy: QueuePolicy,
}

impl ChatOrchestratorBuilder {
    fn new() -> Self {
        Self {
            model: None,
            max_tokens: 1000,
            queue_policy: QueuePolicy::default(),
        }
    }

    pub fn model(mut self, model: Arc<dyn ChatModel>) -> Self {
        self.model = Some(model);
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn queue_policy(mut self, policy: QueuePolicy) -> Self {
        self.queue_policy = policy;
        self
    }

    /// Apply the `[host]` section of the configuration
    pub fn options(mut self, config: &OrchestratorConfig) -> Self {
        self.max_tokens = config.max_tokens;
        self.queue_policy = config.queue_policy;
        self
    }

    pub fn build(self) -> Result<ChatOrchestrator> {
        let model = self
            .model
            .ok_or_else(|| Error::config_error("Orchestrator requires a model"))?;

        Ok(ChatOrchestrator {
            model,
            registry: Arc::new(RwLock::new(ToolRegistry::new())),
            queue: RelayQueue::new(),
            transports: Vec::new(),
            max_tokens: self.max_tokens,
            queue_policy: self.queue_policy,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use relay_core::{ModelReply, PendingCall, Role, ToolDescriptor};
    use serde_json::{json, Value};
    use std::sync::Mutex;

    /// Replays scripted replies and records every request it receives.
    struct ScriptedModel {
        replies: Mutex<Vec<ModelReply>>,
        requests: Mutex<Vec<ChatRequest>>,
    }

    impl ScriptedModel {
        fn new(replies: Vec<ModelReply>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn requests(&self) -> Vec<ChatRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ChatModel for ScriptedModel {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn complete(&self, request: ChatRequest) -> Result<ModelReply> {
            self.requests.lock().unwrap().push(request);
            let mut replies = self.replies.lock().unwrap();
            if replies.is_empty() {
                Err(Error::Model("script exhausted".to_string()))
            } else {
                Ok(replies.remove(0))
            }
        }
    }

    struct SingleToolTransport {
        output: Value,
        fail: bool,
    }

    #[async_trait]
    impl ToolTransport for SingleToolTransport {
        fn server_id(&self) -> &str {
            "test-server"
        }

        async fn list_tools(&self) -> Result<Vec<ToolDescriptor>> {
            Ok(vec![ToolDescriptor {
                name: "lookup".to_string(),
                description: "Test lookup tool".to_string(),
                input_schema: json!({"type": "object"}),
            }])
        }

        async fn call_tool(&self, name: &str, _args: Value) -> Result<Vec<Value>> {
            if self.fail {
                Err(Error::tool_failed(name, anyhow::anyhow!("backend down")))
            } else {
                Ok(vec![
                    json!({"type": "text", "text": self.output.to_string()}),
                ])
            }
        }
    }

    /// Records whether shutdown has been requested.
    struct ClosableTransport {
        closed: std::sync::atomic::AtomicBool,
    }

    #[async_trait]
    impl ToolTransport for ClosableTransport {
        fn server_id(&self) -> &str {
            "closable-server"
        }

        async fn list_tools(&self) -> Result<Vec<ToolDescriptor>> {
            Ok(vec![ToolDescriptor {
                name: "noop".to_string(),
                description: String::new(),
                input_schema: json!({"type": "object"}),
            }])
        }

        async fn call_tool(&self, _name: &str, _args: Value) -> Result<Vec<Value>> {
            Ok(Vec::new())
        }

        async fn shutdown(&self) -> Result<()> {
            self.closed
                .store(true, std::sync::atomic::Ordering::SeqCst);
            Ok(())
        }
    }

    fn text_reply(text: &str) -> ModelReply {
        ModelReply {
            text: Some(text.to_string()),
            tool_calls: Vec::new(),
        }
    }

    fn call_reply(name: &str) -> ModelReply {
        ModelReply {
            text: None,
            tool_calls: vec![PendingCall {
                id: "call_0".to_string(),
                name: name.to_string(),
                arguments: "{}".to_string(),
            }],
        }
    }

    #[tokio::test]
    async fn test_plain_text_turn_is_one_request() {
        let model = ScriptedModel::new(vec![text_reply("hello there")]);
        let mut orchestrator = ChatOrchestrator::builder()
            .model(model.clone())
            .build()
            .unwrap();

        let answer = orchestrator.process_query("hi").await.unwrap();
        assert_eq!(answer, "hello there");
        assert_eq!(model.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_tool_call_turn_issues_one_follow_up() {
        let model = ScriptedModel::new(vec![call_reply("lookup"), text_reply("done")]);
        let mut orchestrator = ChatOrchestrator::builder()
            .model(model.clone())
            .build()
            .unwrap();
        orchestrator
            .add_transport(Arc::new(SingleToolTransport {
                output: json!({"x": 1}),
                fail: false,
            }))
            .await
            .unwrap();

        let answer = orchestrator.process_query("look it up").await.unwrap();
        assert_eq!(answer, "done");

        let requests = model.requests();
        assert_eq!(requests.len(), 2);

        // First request offered the catalog, follow-up did not
        assert_eq!(requests[0].tools.len(), 1);
        assert!(requests[1].tools.is_empty());

        // Follow-up transcript carries the tool-role result
        let tool_messages: Vec<&Message> = requests[1]
            .messages
            .iter()
            .filter(|m| m.role == Role::Tool)
            .collect();
        assert_eq!(tool_messages.len(), 1);
        assert_eq!(tool_messages[0].content, "{\"x\":1}");
        assert_eq!(tool_messages[0].tool_call_id.as_deref(), Some("call_0"));
    }

    #[tokio::test]
    async fn test_failed_tool_still_issues_follow_up() {
        let model = ScriptedModel::new(vec![call_reply("lookup"), text_reply("sorry")]);
        let mut orchestrator = ChatOrchestrator::builder()
            .model(model.clone())
            .build()
            .unwrap();
        orchestrator
            .add_transport(Arc::new(SingleToolTransport {
                output: Value::Null,
                fail: true,
            }))
            .await
            .unwrap();

        let answer = orchestrator.process_query("look it up").await.unwrap();
        assert_eq!(answer, "sorry");

        let requests = model.requests();
        assert_eq!(requests.len(), 2);

        let tool_message = requests[1]
            .messages
            .iter()
            .find(|m| m.role == Role::Tool)
            .expect("failed call must still produce a tool-role entry");
        assert!(tool_message.content.contains("backend down"));
    }

    #[tokio::test]
    async fn test_model_failure_surfaces_to_caller() {
        let model = ScriptedModel::new(Vec::new());
        let mut orchestrator = ChatOrchestrator::builder().model(model).build().unwrap();

        let result = orchestrator.process_query("hi").await;
        assert!(matches!(result, Err(Error::Model(_))));
    }

    #[tokio::test]
    async fn test_per_turn_policy_clears_queue_between_queries() {
        let model = ScriptedModel::new(vec![
            call_reply("lookup"),
            text_reply("first"),
            text_reply("second"),
        ]);
        let mut orchestrator = ChatOrchestrator::builder()
            .model(model.clone())
            .queue_policy(QueuePolicy::PerTurn)
            .build()
            .unwrap();
        orchestrator
            .add_transport(Arc::new(SingleToolTransport {
                output: json!({"x": 1}),
                fail: false,
            }))
            .await
            .unwrap();

        orchestrator.process_query("look it up").await.unwrap();
        assert_eq!(orchestrator.queued_results(), 1);

        orchestrator.process_query("now just chat").await.unwrap();
        assert_eq!(orchestrator.queued_results(), 0);
    }

    #[tokio::test]
    async fn test_shutdown_closes_transports_and_empties_registry() {
        let model = ScriptedModel::new(Vec::new());
        let mut orchestrator = ChatOrchestrator::builder().model(model).build().unwrap();

        let transport = Arc::new(ClosableTransport {
            closed: std::sync::atomic::AtomicBool::new(false),
        });
        orchestrator.add_transport(transport.clone()).await.unwrap();
        assert_eq!(orchestrator.registry().read().await.len(), 1);

        orchestrator.shutdown().await;

        assert!(transport.closed.load(std::sync::atomic::Ordering::SeqCst));
        assert!(orchestrator.registry().read().await.is_empty());
    }

    #[tokio::test]
    async fn test_persistent_policy_keeps_queue_across_queries() {
        let model = ScriptedModel::new(vec![
            call_reply("lookup"),
            text_reply("first"),
            text_reply("second"),
        ]);
        let mut orchestrator = ChatOrchestrator::builder()
            .model(model.clone())
            .queue_policy(QueuePolicy::Persistent)
            .build()
            .unwrap();
        orchestrator
            .add_transport(Arc::new(SingleToolTransport {
                output: json!({"x": 1}),
                fail: false,
            }))
            .await
            .unwrap();

        orchestrator.process_query("look it up").await.unwrap();
        orchestrator.process_query("now just chat").await.unwrap();
        assert_eq!(orchestrator.queued_results(), 1);

        orchestrator.clear_queue();
        assert_eq!(orchestrator.queued_results(), 0);
    }
}

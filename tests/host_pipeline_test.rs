// Pipeline tests for the orchestrator core: result piping between tool
// calls in one batch, and registry rebuilds on tool-list-changed events.

use async_trait::async_trait;
use relay_core::{
    ChatModel, ChatRequest, Error, ModelReply, PendingCall, Result, ToolDescriptor, ToolTransport,
    TransportEvent,
};
use relay_host::ChatOrchestrator;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tokio::sync::broadcast;

struct ScriptedModel {
    replies: StdMutex<Vec<ModelReply>>,
}

impl ScriptedModel {
    fn new(replies: Vec<ModelReply>) -> Arc<Self> {
        Arc::new(Self {
            replies: StdMutex::new(replies),
        })
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, _request: ChatRequest) -> Result<ModelReply> {
        let mut replies = self.replies.lock().unwrap();
        if replies.is_empty() {
            Err(Error::Model("script exhausted".to_string()))
        } else {
            Ok(replies.remove(0))
        }
    }
}

fn descriptor(name: &str) -> ToolDescriptor {
    ToolDescriptor {
        name: name.to_string(),
        description: format!("{name} tool"),
        input_schema: json!({"type": "object"}),
    }
}

/// Serves a report tool and an email tool, recording email invocations.
struct ReportAndMailTransport {
    email_args: StdMutex<Vec<Value>>,
}

#[async_trait]
impl ToolTransport for ReportAndMailTransport {
    fn server_id(&self) -> &str {
        "report-server"
    }

    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>> {
        Ok(vec![descriptor("get_gdo_status"), descriptor("send_email")])
    }

    async fn call_tool(&self, name: &str, args: Value) -> Result<Vec<Value>> {
        match name {
            "get_gdo_status" => Ok(vec![json!({
                "type": "text",
                "text": "{\"country\":\"DE\",\"status\":\"green\"}"
            })]),
            "send_email" => {
                self.email_args.lock().unwrap().push(args);
                Ok(vec![json!({"type": "text", "text": "{\"delivered\":true}"})])
            }
            other => Err(Error::UnknownTool(other.to_string())),
        }
    }
}

#[tokio::test]
async fn test_batch_pipes_first_result_into_second_call() {
    let model = ScriptedModel::new(vec![
        ModelReply {
            text: None,
            tool_calls: vec![
                PendingCall {
                    id: "call_0".to_string(),
                    name: "get_gdo_status".to_string(),
                    arguments: "{\"country\":\"DE\"}".to_string(),
                },
                PendingCall {
                    id: "call_1".to_string(),
                    name: "send_email".to_string(),
                    arguments: "{\"to\":\"ops@example.com\",\"content\":\"placeholder\"}"
                        .to_string(),
                },
            ],
        },
        ModelReply {
            text: Some("Status emailed".to_string()),
            tool_calls: Vec::new(),
        },
    ]);

    let transport = Arc::new(ReportAndMailTransport {
        email_args: StdMutex::new(Vec::new()),
    });

    let mut orchestrator = ChatOrchestrator::builder()
        .model(model)
        .build()
        .unwrap();
    orchestrator.add_transport(transport.clone()).await.unwrap();

    let answer = orchestrator
        .process_query("email the GDO status for Germany")
        .await
        .unwrap();
    assert_eq!(answer, "Status emailed");

    // The email tool received the first call's serialized output, not its
    // literal placeholder argument.
    let email_args = transport.email_args.lock().unwrap();
    assert_eq!(email_args.len(), 1);
    assert_eq!(
        email_args[0]["content"],
        json!("{\"country\":\"DE\",\"status\":\"green\"}")
    );
    assert_eq!(email_args[0]["to"], "ops@example.com");
}

/// Advertises a growing tool list and a live notification channel.
struct NotifyingTransport {
    tools: StdMutex<Vec<ToolDescriptor>>,
    events: broadcast::Sender<TransportEvent>,
}

#[async_trait]
impl ToolTransport for NotifyingTransport {
    fn server_id(&self) -> &str {
        "notifying-server"
    }

    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>> {
        Ok(self.tools.lock().unwrap().clone())
    }

    async fn call_tool(&self, _name: &str, _args: Value) -> Result<Vec<Value>> {
        Ok(Vec::new())
    }

    fn subscribe(&self) -> broadcast::Receiver<TransportEvent> {
        self.events.subscribe()
    }
}

#[tokio::test]
async fn test_tool_list_changed_rebuilds_registry() {
    let (events, _keepalive) = broadcast::channel(4);
    let transport = Arc::new(NotifyingTransport {
        tools: StdMutex::new(vec![descriptor("alpha")]),
        events: events.clone(),
    });

    let model = ScriptedModel::new(Vec::new());
    let mut orchestrator = ChatOrchestrator::builder().model(model).build().unwrap();
    orchestrator.add_transport(transport.clone()).await.unwrap();

    let registry = orchestrator.registry();
    assert_eq!(registry.read().await.len(), 1);

    // The server grows a tool and announces the change
    transport
        .tools
        .lock()
        .unwrap()
        .push(descriptor("beta"));
    events.send(TransportEvent::ToolListChanged).unwrap();

    // Give the watcher task a moment to re-list and re-register
    let mut refreshed = false;
    for _ in 0..50 {
        tokio::time::sleep(Duration::from_millis(10)).await;
        if registry.read().await.len() == 2 {
            refreshed = true;
            break;
        }
    }
    assert!(refreshed, "registry should pick up the new tool");
    assert!(registry.read().await.lookup("beta").is_some());
}

//! MCP client wrapper using the rmcp SDK

use crate::connection::ConnectionParams;
use async_trait::async_trait;
use relay_core::{Error, Result, ToolDescriptor, ToolTransport, TransportEvent};
use rmcp::model::{CallToolRequestParam, ClientInfo, Implementation, LoggingMessageNotificationParam};
use rmcp::service::{NotificationContext, RoleClient, RunningService};
use rmcp::transport::{StreamableHttpClientTransport, TokioChildProcess};
use rmcp::{ClientHandler, ServiceExt};
use serde_json::Value;
use tokio::process::Command;
use tokio::sync::{broadcast, Mutex};

/// Forwards server-initiated MCP notifications into the host event channel.
#[derive(Clone)]
struct McpNotificationHandler {
    server_id: String,
    events: broadcast::Sender<TransportEvent>,
}

impl ClientHandler for McpNotificationHandler {
    async fn on_tool_list_changed(&self, _context: NotificationContext<RoleClient>) {
        tracing::info!(server = %self.server_id, "Tool list changed notification received");
        let _ = self.events.send(TransportEvent::ToolListChanged);
    }

    async fn on_logging_message(
        &self,
        params: LoggingMessageNotificationParam,
        _context: NotificationContext<RoleClient>,
    ) {
        let level = format!("{:?}", params.level).to_lowercase();
        tracing::info!(
            server = %self.server_id,
            level = %level,
            data = %params.data,
            "Server log notification"
        );
        let _ = self.events.send(TransportEvent::Log {
            level,
            data: params.data,
        });
    }

    fn get_info(&self) -> ClientInfo {
        ClientInfo {
            client_info: Implementation {
                name: format!("relay-client-for-{}", self.server_id),
                version: env!("CARGO_PKG_VERSION").to_string(),
                ..Default::default()
            },
            ..Default::default()
        }
    }
}

/// MCP client connected to a single server over stdio or streamable HTTP.
///
/// Wraps a RunningService from rmcp to provide the host's `ToolTransport`
/// seam; session handling and JSON-RPC framing stay inside the SDK.
pub struct McpClient {
    server_id: String,
    /// None once the client has been shut down
    service: Mutex<Option<RunningService<RoleClient, McpNotificationHandler>>>,
    events: broadcast::Sender<TransportEvent>,
}

impl McpClient {
    /// Connect to an MCP server with the given parameters
    pub async fn connect(
        server_id: impl Into<String>,
        params: impl Into<ConnectionParams>,
    ) -> Result<Self> {
        let server_id = server_id.into();
        let (events, _keepalive) = broadcast::channel(16);
        let handler = McpNotificationHandler {
            server_id: server_id.clone(),
            events: events.clone(),
        };

        let service = match params.into() {
            ConnectionParams::Stdio(p) => {
                tracing::debug!(
                    server = %server_id,
                    command = %p.command,
                    args = ?p.args,
                    "Spawning stdio MCP server"
                );

                let mut command = Command::new(&p.command);
                for arg in &p.args {
                    command.arg(arg);
                }
                for (key, value) in &p.env {
                    command.env(key, value);
                }

                let transport = TokioChildProcess::new(command)
                    .map_err(|e| Error::connection(&server_id, e))?;
                handler
                    .serve(transport)
                    .await
                    .map_err(|e| Error::connection(&server_id, e))?
            }
            ConnectionParams::StreamableHttp(p) => {
                tracing::debug!(server = %server_id, url = %p.url, "Connecting over streamable HTTP");

                let transport = StreamableHttpClientTransport::from_uri(p.url.clone());
                handler
                    .serve(transport)
                    .await
                    .map_err(|e| Error::connection(&server_id, e))?
            }
        };

        tracing::info!(
            server = %server_id,
            server_info = ?service.peer_info(),
            "Connected to MCP server"
        );

        Ok(Self {
            server_id,
            service: Mutex::new(Some(service)),
            events,
        })
    }
}

#[async_trait]
impl ToolTransport for McpClient {
    fn server_id(&self) -> &str {
        &self.server_id
    }

    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>> {
        tracing::debug!(server = %self.server_id, "Listing tools from MCP server");

        let guard = self.service.lock().await;
        let service = guard.as_ref().ok_or_else(|| {
            Error::connection(&self.server_id, anyhow::anyhow!("client is shut down"))
        })?;

        let response = service
            .list_tools(Default::default())
            .await
            .map_err(|e| Error::connection(&self.server_id, e))?;

        let tools: Vec<ToolDescriptor> = response
            .tools
            .into_iter()
            .map(|tool| ToolDescriptor {
                name: tool.name.into_owned(),
                description: tool.description.map(|d| d.into_owned()).unwrap_or_default(),
                input_schema: Value::Object((*tool.input_schema).clone()),
            })
            .collect();

        tracing::debug!(
            server = %self.server_id,
            count = tools.len(),
            "Retrieved tools from MCP server"
        );

        Ok(tools)
    }

    async fn call_tool(&self, name: &str, args: Value) -> Result<Vec<Value>> {
        tracing::debug!(server = %self.server_id, tool = %name, "Calling MCP tool");

        let params = CallToolRequestParam {
            name: name.to_string().into(),
            arguments: args.as_object().cloned(),
        };

        let guard = self.service.lock().await;
        let service = guard.as_ref().ok_or_else(|| {
            Error::connection(&self.server_id, anyhow::anyhow!("client is shut down"))
        })?;

        let response = service
            .call_tool(params)
            .await
            .map_err(|e| Error::tool_failed(name, e))?;

        // Tool-level failure comes back as is_error with the message in content
        if response.is_error == Some(true) {
            let detail = serde_json::to_string(&response.content).unwrap_or_default();
            return Err(Error::tool_failed(name, anyhow::anyhow!(detail)));
        }

        let content = response
            .content
            .into_iter()
            .map(|c| serde_json::to_value(c).unwrap_or(Value::Null))
            .collect();

        Ok(content)
    }

    fn subscribe(&self) -> broadcast::Receiver<TransportEvent> {
        self.events.subscribe()
    }

    async fn shutdown(&self) -> Result<()> {
        if let Some(service) = self.service.lock().await.take() {
            tracing::info!(server = %self.server_id, "Closing MCP connection");
            service
                .cancel()
                .await
                .map_err(|e| Error::connection(&self.server_id, anyhow::anyhow!("{e}")))?;
        }
        Ok(())
    }
}

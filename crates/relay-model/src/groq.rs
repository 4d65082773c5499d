use super::types::*;
use async_trait::async_trait;
use relay_core::{ChatModel, ChatRequest, Error, Message, ModelReply, PendingCall, Result, Role};
use reqwest::Client;

/// Chat model backed by the Groq OpenAI-compatible chat-completions API
pub struct GroqModel {
    client: Client,
    api_key: String,
    model_name: String,
    base_url: String,
}

impl GroqModel {
    pub fn new(api_key: String, model_name: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            model_name,
            base_url: "https://api.groq.com/openai/v1".to_string(),
        }
    }

    /// Point at a different OpenAI-compatible endpoint
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    fn build_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

/// Convert a transcript message to the OpenAI wire format
fn to_wire_message(message: &Message) -> WireMessage {
    let tool_calls = if message.tool_calls.is_empty() {
        None
    } else {
        Some(
            message
                .tool_calls
                .iter()
                .map(|call| WireToolCall {
                    id: call.id.clone(),
                    kind: "function".to_string(),
                    function: WireFunctionCall {
                        name: call.name.clone(),
                        arguments: call.arguments.clone(),
                    },
                })
                .collect(),
        )
    };

    // An assistant message that only requests calls carries no content
    let content = if message.content.is_empty() && tool_calls.is_some() {
        None
    } else {
        Some(message.content.clone())
    };

    WireMessage {
        role: match message.role {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        }
        .to_string(),
        content,
        tool_call_id: message.tool_call_id.clone(),
        tool_calls,
    }
}

/// Extract text and pending calls from the model's answer
fn reply_from_message(message: WireMessage) -> ModelReply {
    let tool_calls = message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(|call| PendingCall {
            id: call.id,
            name: call.function.name,
            arguments: call.function.arguments,
        })
        .collect();

    ModelReply {
        text: message.content.filter(|text| !text.is_empty()),
        tool_calls,
    }
}

#[async_trait]
impl ChatModel for GroqModel {
    fn name(&self) -> &str {
        &self.model_name
    }

    async fn complete(&self, request: ChatRequest) -> Result<ModelReply> {
        let messages = request.messages.iter().map(to_wire_message).collect();

        let tools: Vec<WireTool> = request
            .tools
            .iter()
            .map(|descriptor| WireTool {
                kind: "function".to_string(),
                function: WireFunctionDef {
                    name: descriptor.name.clone(),
                    description: descriptor.description.clone(),
                    parameters: descriptor.input_schema.clone(),
                },
            })
            .collect();

        // Tool choice stays at the model's discretion when a catalog is offered
        let tool_choice = if tools.is_empty() {
            None
        } else {
            Some("auto".to_string())
        };

        let body = ChatCompletionRequest {
            model: self.model_name.clone(),
            messages,
            tools,
            tool_choice,
            max_tokens: request.max_tokens,
        };

        tracing::debug!(
            model = %self.model_name,
            message_count = body.messages.len(),
            tool_count = body.tools.len(),
            "Sending chat completion request"
        );

        let response = self
            .client
            .post(self.build_url())
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Model(format!("Request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(Error::Model(format!("Groq API error {status}: {error_text}")));
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| Error::Model(format!("Failed to parse response: {e}")))?;

        if let Some(usage) = &parsed.usage {
            tracing::debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "Chat completion finished"
            );
        }

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| Error::Model("Response contained no choices".to_string()))?;

        Ok(reply_from_message(choice.message))
    }
}

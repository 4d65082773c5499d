//! Tool-call dispatcher
//!
//! Executes one batch of model-requested function calls in order. Each call
//! is resolved through the registry, invoked on its owning transport, and
//! its parsed output is both enqueued on the relay queue and appended to
//! the transcript as a tool-role message. For every call after the first,
//! a `content` argument is replaced with the dequeued head of the queue,
//! piping the previous call's output into the next call's input.

use crate::queue::RelayQueue;
use crate::registry::ToolRegistry;
use relay_core::{Error, Message, PendingCall, Result};
use serde_json::Value;

/// Process a full batch of pending calls, mutating the transcript and queue
/// in place.
///
/// `UnknownTool` and `MalformedArguments` abort the batch; a tool that
/// fails during invocation instead becomes a tool-role transcript entry
/// carrying the error text, so the model sees the failure as feedback.
pub async fn dispatch_calls(
    registry: &ToolRegistry,
    queue: &mut RelayQueue<String>,
    transcript: &mut Vec<Message>,
    calls: &[PendingCall],
) -> Result<()> {
    for (index, call) in calls.iter().enumerate() {
        let entry = registry
            .lookup(&call.name)
            .ok_or_else(|| Error::UnknownTool(call.name.clone()))?;

        let mut args: Value =
            serde_json::from_str(&call.arguments).map_err(|e| Error::MalformedArguments {
                tool: call.name.clone(),
                detail: e.to_string(),
            })?;

        // Pipe convention: calls after the first take the queued head as
        // their content argument. The first call passes through unmodified.
        if index > 0 {
            if let Some(object) = args.as_object_mut() {
                if object.contains_key("content") {
                    match queue.dequeue() {
                        Some(head) => {
                            tracing::debug!(
                                tool = %call.name,
                                index,
                                "Substituting queued result into content argument"
                            );
                            object.insert("content".to_string(), Value::String(head));
                        }
                        // Empty queue means the earlier calls produced no
                        // output items; the literal argument stands.
                        None => {
                            tracing::debug!(
                                tool = %call.name,
                                index,
                                "Queue empty, keeping literal content argument"
                            );
                        }
                    }
                }
            }
        }

        tracing::info!(tool = %call.name, call_id = %call.id, index, "Invoking tool");

        match entry.transport.call_tool(&call.name, args).await {
            Ok(items) => {
                let mut parsed_items = Vec::new();
                for item in &items {
                    let parsed = parse_content_item(item);
                    queue.enqueue(serde_json::to_string(&parsed)?);
                    parsed_items.push(parsed);
                }

                // One tool-role message per call; multiple content items
                // collapse into a JSON array.
                let content = match parsed_items.len() {
                    0 => Value::Null,
                    1 => parsed_items.into_iter().next().unwrap_or(Value::Null),
                    _ => Value::Array(parsed_items),
                };

                tracing::debug!(
                    tool = %call.name,
                    call_id = %call.id,
                    item_count = items.len(),
                    "Tool call succeeded"
                );
                transcript.push(Message::tool(serde_json::to_string(&content)?, &call.id));
            }
            Err(e) => {
                tracing::warn!(
                    tool = %call.name,
                    call_id = %call.id,
                    error = %e,
                    "Tool call failed, feeding error text back to the model"
                );
                transcript.push(Message::tool(format!("Tool call failed: {e}"), &call.id));
            }
        }
    }

    Ok(())
}

/// Parse one structured content item. Text items carry JSON in their `text`
/// field; text that is not valid JSON is kept as a plain string value.
fn parse_content_item(item: &Value) -> Value {
    match item.get("text").and_then(Value::as_str) {
        Some(text) => {
            serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
        }
        None => item.clone(),
    }
}

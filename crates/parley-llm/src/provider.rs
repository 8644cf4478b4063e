use anyhow::Result;
use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::pin::Pin;

use crate::types::{LlmUsage, Message, Role};

/// Low-level event produced by a provider adapter while streaming one
/// completion call. `EngineSession` turns these into [`crate::Chunk`]s.
#[derive(Debug, Clone)]
pub enum ProviderEvent {
    Text {
        content: String,
    },
    ToolCall {
        index: u32,
        id: Option<String>,
        name: Option<String>,
        arguments: Option<String>,
    },
    Usage {
        usage: LlmUsage,
    },
    Done {
        finish_reason: Option<String>,
    },
}

pub type EventStream = Pin<Box<dyn Stream<Item = Result<ProviderEvent>> + Send>>;

/// Outcome of a non-streaming completion call.
#[derive(Debug, Clone)]
pub struct Completion {
    pub content: Option<String>,
    pub usage: Option<LlmUsage>,
}

#[derive(Debug, Clone, Default)]
pub struct CompletionOptions {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    /// OpenAI-style function declarations, built from the attached plugins.
    pub tools: Vec<Value>,
    /// Ask the provider to report token usage on the stream.
    pub usage: bool,
}

#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<WireMessage>,
    pub options: CompletionOptions,
}

impl CompletionRequest {
    pub fn new(model: impl Into<String>, messages: Vec<WireMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            options: CompletionOptions::default(),
        }
    }

    pub fn with_options(mut self, options: CompletionOptions) -> Self {
        self.options = options;
        self
    }
}

/// Provider-facing message. Chat history plus the transient entries the
/// agentic loop appends between provider calls; never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum WireMessage {
    Chat(Message),
    /// Assistant turn that requested tool invocations.
    ToolRequest {
        calls: Vec<RequestedCall>,
    },
    /// Result of one tool invocation, keyed to its call id.
    ToolResult {
        id: String,
        content: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestedCall {
    pub id: String,
    pub name: String,
    pub arguments: String,
}

pub fn to_wire(messages: Vec<Message>) -> Vec<WireMessage> {
    messages.into_iter().map(WireMessage::Chat).collect()
}

impl WireMessage {
    /// Render into the OpenAI chat-completions message format. Attachments
    /// with an image mime type become image-url content parts, other
    /// attachments are inlined after the text.
    pub fn to_openai(&self) -> Value {
        match self {
            WireMessage::Chat(message) => {
                let role = match message.role {
                    Role::System => "system",
                    Role::User => "user",
                    Role::Assistant => "assistant",
                };
                let content = match &message.attachment {
                    Some(attachment) if !attachment.content.is_empty() => {
                        if attachment.is_image() {
                            serde_json::json!([
                                { "type": "text", "text": message.content },
                                {
                                    "type": "image_url",
                                    "image_url": {
                                        "url": format!(
                                            "data:{};base64,{}",
                                            attachment.mime_type, attachment.content
                                        ),
                                    },
                                },
                            ])
                        } else {
                            Value::String(format!(
                                "{}\n\n{}",
                                message.content, attachment.content
                            ))
                        }
                    }
                    _ => Value::String(message.content.clone()),
                };
                serde_json::json!({ "role": role, "content": content })
            }
            WireMessage::ToolRequest { calls } => {
                let tool_calls: Vec<Value> = calls
                    .iter()
                    .map(|call| {
                        serde_json::json!({
                            "id": call.id,
                            "type": "function",
                            "function": {
                                "name": call.name,
                                "arguments": call.arguments,
                            },
                        })
                    })
                    .collect();
                serde_json::json!({ "role": "assistant", "tool_calls": tool_calls })
            }
            WireMessage::ToolResult { id, content } => serde_json::json!({
                "role": "tool",
                "tool_call_id": id,
                "content": content,
            }),
        }
    }
}

/// Uniform interface over heterogeneous provider backends, keyed by engine
/// id. One adapter per wire protocol; the same adapter serves every engine
/// that speaks it.
#[async_trait]
pub trait Provider: Send + Sync {
    fn id(&self) -> &str;

    /// Chat model ids available on this engine.
    async fn models(&self) -> Result<Vec<String>>;

    /// Streaming completion. The returned stream is finite and single-pass;
    /// callers must drain it or drop it to release the connection.
    async fn stream(&self, request: CompletionRequest) -> Result<EventStream>;

    /// Non-streaming completion.
    async fn complete(&self, request: CompletionRequest) -> Result<Completion>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Attachment;

    #[test]
    fn chat_message_renders_role_and_content() {
        let wire = WireMessage::Chat(Message::user("hello"));
        let value = wire.to_openai();
        assert_eq!(value["role"], "user");
        assert_eq!(value["content"], "hello");
    }

    #[test]
    fn image_attachment_becomes_content_parts() {
        let message =
            Message::user("look").with_attachment(Attachment::new("aGk=", "image/png"));
        let value = WireMessage::Chat(message).to_openai();
        assert_eq!(value["content"][1]["type"], "image_url");
        assert_eq!(
            value["content"][1]["image_url"]["url"],
            "data:image/png;base64,aGk="
        );
    }

    #[test]
    fn tool_result_carries_call_id() {
        let value = WireMessage::ToolResult {
            id: "call_9".to_string(),
            content: "42".to_string(),
        }
        .to_openai();
        assert_eq!(value["role"], "tool");
        assert_eq!(value["tool_call_id"], "call_9");
    }
}

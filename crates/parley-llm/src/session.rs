use futures::{Stream, StreamExt};
use serde_json::Value;
use std::collections::BTreeMap;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use crate::chunk::Chunk;
use crate::engines;
use crate::error::SessionError;
use crate::plugins::ToolPlugin;
use crate::provider::{
    to_wire, CompletionOptions, CompletionRequest, Provider, ProviderEvent, RequestedCall,
    WireMessage,
};
use crate::types::{LlmUsage, Message, ToolCallRecord};

pub type ChunkStream = Pin<Box<dyn Stream<Item = Chunk> + Send>>;

const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    /// Request token usage reporting from the provider.
    pub usage: bool,
    /// Bounded wait for the next provider event; expiry becomes an in-band
    /// error chunk.
    pub idle_timeout: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            temperature: None,
            max_tokens: None,
            usage: true,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
        }
    }
}

/// A provider connection plus the tool capabilities attached for one request.
///
/// The stream it produces is finite and single-pass: text is relayed as
/// content chunks, requested tool calls are executed in-line and fed back to
/// the provider, token usage is summed across provider calls and reported as
/// one `usage` chunk, and an explicit done marker terminates the sequence.
pub struct EngineSession {
    provider: Arc<dyn Provider>,
    plugins: Vec<ToolPlugin>,
}

impl EngineSession {
    pub fn open(engine_id: &str, api_key: &str) -> Result<Self, SessionError> {
        let provider = engines::ignite(engine_id, api_key)?;
        Ok(Self::with_provider(provider))
    }

    pub fn with_provider(provider: Arc<dyn Provider>) -> Self {
        Self {
            provider,
            plugins: Vec::new(),
        }
    }

    pub fn add_plugin(&mut self, plugin: ToolPlugin) {
        self.plugins.push(plugin);
    }

    pub fn plugins(&self) -> &[ToolPlugin] {
        &self.plugins
    }

    /// Streaming chat turn. Errors surface in-band as terminal error chunks
    /// so the caller can relay them on an already-committed channel.
    pub fn stream(&self, model: &str, messages: Vec<Message>, options: SessionOptions) -> ChunkStream {
        let provider = Arc::clone(&self.provider);
        let plugins = self.plugins.clone();
        let model = model.to_string();

        Box::pin(async_stream::stream! {
            let tools: Vec<Value> = plugins
                .iter()
                .filter(|p| p.enabled())
                .map(|p| p.schema())
                .collect();

            let mut wire = to_wire(messages);
            let mut total_usage: Option<LlmUsage> = None;

            loop {
                let request = CompletionRequest::new(model.clone(), wire.clone())
                    .with_options(CompletionOptions {
                        temperature: options.temperature,
                        max_tokens: options.max_tokens,
                        tools: tools.clone(),
                        usage: options.usage,
                    });

                let mut events = match provider.stream(request).await {
                    Ok(events) => events,
                    Err(e) => {
                        yield Chunk::error(e.to_string());
                        return;
                    }
                };

                // Tool-call deltas accumulate per index until the provider
                // turn ends.
                let mut calls: BTreeMap<u32, CallBuffer> = BTreeMap::new();

                loop {
                    let event = match tokio::time::timeout(options.idle_timeout, events.next()).await {
                        Err(_) => {
                            yield Chunk::error("provider stream timed out");
                            return;
                        }
                        Ok(None) => break,
                        Ok(Some(Err(e))) => {
                            yield Chunk::error(e.to_string());
                            return;
                        }
                        Ok(Some(Ok(event))) => event,
                    };

                    match event {
                        ProviderEvent::Text { content } => {
                            yield Chunk::text(content);
                        }
                        ProviderEvent::ToolCall { index, id, name, arguments } => {
                            let buffer = calls.entry(index).or_default();
                            if let Some(id) = id {
                                buffer.id = Some(id);
                            }
                            if let Some(name) = name {
                                buffer.name = Some(name);
                            }
                            if let Some(arguments) = arguments {
                                buffer.arguments.push_str(&arguments);
                            }
                        }
                        ProviderEvent::Usage { usage } => {
                            match &mut total_usage {
                                Some(total) => total.add(&usage),
                                None => total_usage = Some(usage),
                            }
                        }
                        ProviderEvent::Done { .. } => {}
                    }
                }

                if calls.is_empty() {
                    break;
                }

                let requested: Vec<RequestedCall> = calls
                    .iter()
                    .map(|(index, buffer)| RequestedCall {
                        id: buffer.id.clone().unwrap_or_else(|| format!("call_{index}")),
                        name: buffer.name.clone().unwrap_or_default(),
                        arguments: buffer.arguments.clone(),
                    })
                    .collect();
                wire.push(WireMessage::ToolRequest { calls: requested.clone() });

                for call in requested {
                    let params: Value =
                        serde_json::from_str(&call.arguments).unwrap_or(Value::Null);
                    let plugin = plugins
                        .iter()
                        .find(|p| p.enabled() && p.name() == call.name);

                    let status = plugin
                        .map(|p| p.preparation_description())
                        .unwrap_or_else(|| format!("Running {}…", call.name));
                    yield Chunk::Tool {
                        name: call.name.clone(),
                        id: call.id.clone(),
                        status: Some(status),
                        done: false,
                        call: None,
                    };

                    let result = match plugin {
                        Some(plugin) => plugin.execute(params.clone()).await,
                        None => serde_json::json!({
                            "error": format!("unknown tool: {}", call.name),
                        }),
                    };

                    yield Chunk::Tool {
                        name: call.name.clone(),
                        id: call.id.clone(),
                        status: None,
                        done: true,
                        call: Some(ToolCallRecord {
                            name: call.name.clone(),
                            params,
                            result: result.clone(),
                        }),
                    };

                    wire.push(WireMessage::ToolResult {
                        id: call.id,
                        content: result.to_string(),
                    });
                }
            }

            if let Some(usage) = total_usage {
                yield Chunk::Usage { usage };
            }
            yield Chunk::done();
        })
    }

    /// Non-streaming completion, used by titling. Tools are never attached.
    pub async fn complete(
        &self,
        model: &str,
        messages: Vec<Message>,
        options: SessionOptions,
    ) -> Result<String, SessionError> {
        let request = CompletionRequest::new(model, to_wire(messages)).with_options(
            CompletionOptions {
                temperature: options.temperature,
                max_tokens: options.max_tokens,
                tools: Vec::new(),
                usage: options.usage,
            },
        );

        let completion = self.provider.complete(request).await?;
        Ok(completion.content.unwrap_or_default())
    }
}

#[derive(Default)]
struct CallBuffer {
    id: Option<String>,
    name: Option<String>,
    arguments: String,
}

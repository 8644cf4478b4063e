// OpenAI-compatible chat completions adapter. Serves every engine in the
// catalog that speaks the chat/completions wire format.

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::VecDeque;

use crate::provider::{
    Completion, CompletionRequest, EventStream, Provider, ProviderEvent,
};
use crate::types::LlmUsage;

pub struct OpenAiCompatClient {
    engine_id: String,
    http_client: reqwest::Client,
    base_url: String,
}

impl OpenAiCompatClient {
    pub fn new(
        engine_id: impl Into<String>,
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self> {
        let api_key = api_key.into();

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", api_key))
                .context("Invalid API key format")?,
        );

        let http_client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            engine_id: engine_id.into(),
            http_client,
            base_url: base_url.into(),
        })
    }

    fn build_payload(&self, request: &CompletionRequest, stream: bool) -> Value {
        let messages: Vec<Value> = request.messages.iter().map(|m| m.to_openai()).collect();

        let mut payload = serde_json::json!({
            "model": request.model,
            "messages": messages,
            "stream": stream,
        });

        let obj = payload.as_object_mut().expect("payload is an object");

        if let Some(temp) = request.options.temperature {
            obj.insert("temperature".to_string(), serde_json::json!(temp));
        }
        if let Some(max_tokens) = request.options.max_tokens {
            obj.insert("max_tokens".to_string(), serde_json::json!(max_tokens));
        }
        if !request.options.tools.is_empty() {
            obj.insert(
                "tools".to_string(),
                Value::Array(request.options.tools.clone()),
            );
        }
        if stream && request.options.usage {
            obj.insert(
                "stream_options".to_string(),
                serde_json::json!({ "include_usage": true }),
            );
        }

        payload
    }

    async fn post(&self, payload: &Value) -> Result<reqwest::Response> {
        let response = self
            .http_client
            .post(format!("{}/chat/completions", self.base_url))
            .json(payload)
            .send()
            .await
            .context("Failed to send request")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("{} API error ({}): {}", self.engine_id, status, error_text);
        }

        Ok(response)
    }
}

#[async_trait]
impl Provider for OpenAiCompatClient {
    fn id(&self) -> &str {
        &self.engine_id
    }

    async fn models(&self) -> Result<Vec<String>> {
        let response = self
            .http_client
            .get(format!("{}/models", self.base_url))
            .send()
            .await
            .context("Failed to list models")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("{} API error ({}): {}", self.engine_id, status, error_text);
        }

        let list: ModelList = response.json().await.context("Failed to parse model list")?;
        Ok(list.data.into_iter().map(|m| m.id).collect())
    }

    async fn stream(&self, request: CompletionRequest) -> Result<EventStream> {
        let payload = self.build_payload(&request, true);
        let response = self.post(&payload).await?;
        Ok(parse_sse_stream(response))
    }

    async fn complete(&self, request: CompletionRequest) -> Result<Completion> {
        let payload = self.build_payload(&request, false);
        let response = self.post(&payload).await?;

        let raw: ChatResponse = response.json().await.context("Failed to parse response")?;
        let choice = raw.choices.into_iter().next();

        Ok(Completion {
            content: choice.and_then(|c| c.message.content),
            usage: raw.usage,
        })
    }
}

/// Parse a chat-completions SSE body into provider events.
fn parse_sse_stream(response: reqwest::Response) -> EventStream {
    let stream = response.bytes_stream();

    Box::pin(async_stream::stream! {
        let mut byte_chunks = Box::pin(stream);
        let mut buffer = VecDeque::with_capacity(8192);

        while let Some(chunk_result) = byte_chunks.next().await {
            match chunk_result {
                Ok(bytes) => {
                    buffer.extend(bytes);

                    while let Some(newline_pos) = buffer.iter().position(|&b| b == b'\n') {
                        let line_bytes: Vec<u8> = buffer.drain(..=newline_pos).collect();

                        if let Ok(line_str) = std::str::from_utf8(&line_bytes) {
                            let line = line_str.trim();

                            if line.is_empty() {
                                continue;
                            }

                            if let Some(data) = line.strip_prefix("data: ") {
                                if data == "[DONE]" {
                                    yield Ok(ProviderEvent::Done { finish_reason: None });
                                    break;
                                }

                                match serde_json::from_str::<StreamChunk>(data) {
                                    Ok(chunk) => {
                                        for event in chunk.into_events() {
                                            yield Ok(event);
                                        }
                                    }
                                    Err(e) => yield Err(anyhow::anyhow!("Failed to parse stream chunk: {}", e)),
                                }
                            }
                        }
                    }
                }
                Err(e) => yield Err(anyhow::anyhow!("Stream error: {}", e)),
            }
        }
    })
}

#[derive(Debug, Deserialize)]
struct ModelList {
    data: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    usage: Option<LlmUsage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Choice {
    message: ResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    #[serde(default)]
    usage: Option<LlmUsage>,
}

#[derive(Debug, Clone, Deserialize)]
struct StreamChoice {
    delta: Delta,
    finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct Delta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ToolCallDelta>>,
}

#[derive(Debug, Clone, Deserialize)]
struct ToolCallDelta {
    index: u32,
    id: Option<String>,
    function: Option<FunctionDelta>,
}

#[derive(Debug, Clone, Deserialize)]
struct FunctionDelta {
    name: Option<String>,
    arguments: Option<String>,
}

impl StreamChunk {
    fn into_events(self) -> Vec<ProviderEvent> {
        let mut events = Vec::new();

        // The usage-bearing chunk has an empty choices array.
        if let Some(usage) = self.usage {
            events.push(ProviderEvent::Usage { usage });
        }

        if let Some(choice) = self.choices.into_iter().next() {
            if let Some(content) = choice.delta.content {
                if !content.is_empty() {
                    events.push(ProviderEvent::Text { content });
                }
            }

            if let Some(tool_calls) = choice.delta.tool_calls {
                for tc in tool_calls {
                    events.push(ProviderEvent::ToolCall {
                        index: tc.index,
                        id: tc.id,
                        name: tc.function.as_ref().and_then(|f| f.name.clone()),
                        arguments: tc.function.as_ref().and_then(|f| f.arguments.clone()),
                    });
                }
            }

            if let Some(finish_reason) = choice.finish_reason {
                events.push(ProviderEvent::Done {
                    finish_reason: Some(finish_reason),
                });
            }
        }

        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_chunk_with_content_delta() {
        let data = r#"{"choices":[{"delta":{"content":"Hi"},"finish_reason":null}]}"#;
        let chunk: StreamChunk = serde_json::from_str(data).unwrap();
        let events = chunk.into_events();
        assert!(matches!(&events[0], ProviderEvent::Text { content } if content == "Hi"));
    }

    #[test]
    fn stream_chunk_with_usage_only() {
        let data = r#"{"choices":[],"usage":{"prompt_tokens":10,"completion_tokens":5}}"#;
        let chunk: StreamChunk = serde_json::from_str(data).unwrap();
        let events = chunk.into_events();
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], ProviderEvent::Usage { usage } if usage.prompt_tokens == 10));
    }

    #[test]
    fn stream_chunk_with_tool_call_delta() {
        let data = r#"{"choices":[{"delta":{"tool_calls":[{"index":0,"id":"call_1","function":{"name":"search_web","arguments":"{\"qu"}}]},"finish_reason":null}]}"#;
        let chunk: StreamChunk = serde_json::from_str(data).unwrap();
        let events = chunk.into_events();
        assert!(matches!(
            &events[0],
            ProviderEvent::ToolCall { id: Some(id), name: Some(name), .. }
                if id == "call_1" && name == "search_web"
        ));
    }
}

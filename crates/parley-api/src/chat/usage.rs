use chrono::Utc;
use std::sync::Arc;

use parley_llm::{LlmUsage, Message};
use parley_persist::{UsageRecord, UsageStore};

const SEARCH_TOOL: &str = "search_web";
const IMAGE_TOOL: &str = "generate_image";

/// Records one usage fact per completed chat turn. Fire-and-forget: the
/// write runs on its own task and a failure never fails the turn.
pub struct UsageRecorder {
    usage: Arc<dyn UsageStore>,
}

impl UsageRecorder {
    pub fn new(usage: Arc<dyn UsageStore>) -> Self {
        Self { usage }
    }

    pub fn record(
        &self,
        user_id: i64,
        thread_id: &str,
        engine: &str,
        model: &str,
        messages: &[Message],
        usage: &LlmUsage,
    ) {
        let record = build_record(user_id, thread_id, engine, model, messages, usage);
        let store = Arc::clone(&self.usage);

        tokio::spawn(async move {
            match store.record(record).await {
                Ok(true) => {}
                Ok(false) => tracing::debug!(user_id, "duplicate usage fact, skipped"),
                Err(e) => tracing::error!(user_id, "failed to record usage: {}", e),
            }
        });
    }
}

/// Attachments are counted across the whole turn; tool subcounts only
/// inspect the newest message's tool calls.
pub fn build_record(
    user_id: i64,
    thread_id: &str,
    engine: &str,
    model: &str,
    messages: &[Message],
    usage: &LlmUsage,
) -> UsageRecord {
    let attachment_count = messages.iter().filter(|m| m.has_attachment()).count() as u64;

    let (internet_search_count, image_generation_count) = messages
        .last()
        .map(|last| {
            let searches = last.tool_calls.iter().filter(|tc| tc.name == SEARCH_TOOL).count();
            let images = last.tool_calls.iter().filter(|tc| tc.name == IMAGE_TOOL).count();
            (searches as u64, images as u64)
        })
        .unwrap_or((0, 0));

    UsageRecord {
        id: uuid::Uuid::new_v4().to_string(),
        user_id,
        thread_id: thread_id.to_string(),
        engine: engine.to_string(),
        model: model.to_string(),
        created_at: Utc::now(),
        message_count: messages.len() as u64,
        attachment_count,
        internet_search_count,
        image_generation_count,
        input_tokens: usage.prompt_tokens,
        input_cached_tokens: usage.cached_input_tokens(),
        input_audio_tokens: usage.audio_input_tokens(),
        output_tokens: usage.completion_tokens,
        output_audio_tokens: usage.audio_output_tokens(),
        cost_credits: 0,
        cost_cents: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_llm::{Attachment, ToolCallRecord};
    use serde_json::json;

    fn call(name: &str) -> ToolCallRecord {
        ToolCallRecord {
            name: name.to_string(),
            params: json!({}),
            result: json!({}),
        }
    }

    #[test]
    fn tool_counts_only_inspect_the_last_message() {
        let mut earlier = Message::assistant("before");
        earlier.tool_calls.push(call(SEARCH_TOOL));

        let mut last = Message::assistant("after");
        last.tool_calls.push(call(SEARCH_TOOL));
        last.tool_calls.push(call(SEARCH_TOOL));
        last.tool_calls.push(call(IMAGE_TOOL));
        last.tool_calls.push(call("run_python_code"));

        let messages = vec![Message::user("hi"), earlier, last];
        let record = build_record(1, "t1", "openai", "gpt-4o", &messages, &LlmUsage::default());

        assert_eq!(record.internet_search_count, 2);
        assert_eq!(record.image_generation_count, 1);
        assert_eq!(record.message_count, 3);
    }

    #[test]
    fn attachments_are_counted_across_all_messages() {
        let messages = vec![
            Message::user("a").with_attachment(Attachment::new("data", "image/png")),
            Message::assistant("b"),
            Message::user("c").with_attachment(Attachment::new("more", "text/plain")),
        ];
        let record = build_record(1, "t1", "openai", "gpt-4o", &messages, &LlmUsage::default());
        assert_eq!(record.attachment_count, 2);
    }

    #[test]
    fn token_details_flow_into_the_record() {
        let usage = LlmUsage {
            prompt_tokens: 100,
            completion_tokens: 40,
            prompt_tokens_details: Some(parley_llm::types::PromptTokensDetails {
                cached_tokens: 25,
                audio_tokens: 5,
            }),
            completion_tokens_details: Some(parley_llm::types::CompletionTokensDetails {
                audio_tokens: 3,
            }),
        };
        let record = build_record(1, "t1", "openai", "gpt-4o", &[], &usage);

        assert_eq!(record.input_tokens, 100);
        assert_eq!(record.input_cached_tokens, 25);
        assert_eq!(record.input_audio_tokens, 5);
        assert_eq!(record.output_tokens, 40);
        assert_eq!(record.output_audio_tokens, 3);
        assert_eq!(record.cost_credits, 0);
    }
}

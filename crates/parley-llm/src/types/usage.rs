use serde::{Deserialize, Serialize};

/// Token usage reported by a provider for one completion call.
///
/// Field names follow the OpenAI wire format so the struct deserializes
/// straight off the final stream chunk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LlmUsage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_tokens_details: Option<PromptTokensDetails>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_tokens_details: Option<CompletionTokensDetails>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptTokensDetails {
    #[serde(default)]
    pub cached_tokens: u64,
    #[serde(default)]
    pub audio_tokens: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionTokensDetails {
    #[serde(default)]
    pub audio_tokens: u64,
}

impl LlmUsage {
    pub fn cached_input_tokens(&self) -> u64 {
        self.prompt_tokens_details
            .as_ref()
            .map(|d| d.cached_tokens)
            .unwrap_or(0)
    }

    pub fn audio_input_tokens(&self) -> u64 {
        self.prompt_tokens_details
            .as_ref()
            .map(|d| d.audio_tokens)
            .unwrap_or(0)
    }

    pub fn audio_output_tokens(&self) -> u64 {
        self.completion_tokens_details
            .as_ref()
            .map(|d| d.audio_tokens)
            .unwrap_or(0)
    }

    /// Sum another provider call's usage into this one. The agentic loop may
    /// make several provider calls per chat turn but reports usage once.
    pub fn add(&mut self, other: &LlmUsage) {
        self.prompt_tokens += other.prompt_tokens;
        self.completion_tokens += other.completion_tokens;

        if let Some(details) = &other.prompt_tokens_details {
            let mine = self.prompt_tokens_details.get_or_insert_with(Default::default);
            mine.cached_tokens += details.cached_tokens;
            mine.audio_tokens += details.audio_tokens;
        }
        if let Some(details) = &other.completion_tokens_details {
            let mine = self
                .completion_tokens_details
                .get_or_insert_with(Default::default);
            mine.audio_tokens += details.audio_tokens;
        }
    }
}

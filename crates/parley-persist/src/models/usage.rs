use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Immutable usage fact, one per completed chat turn that reported usage.
/// Never updated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageRecord {
    pub id: String,
    pub user_id: i64,
    pub thread_id: String,
    pub engine: String,
    pub model: String,
    pub created_at: DateTime<Utc>,

    pub message_count: u64,
    pub attachment_count: u64,
    pub internet_search_count: u64,
    pub image_generation_count: u64,

    pub input_tokens: u64,
    pub input_cached_tokens: u64,
    pub input_audio_tokens: u64,
    pub output_tokens: u64,
    pub output_audio_tokens: u64,

    // Billing is computed elsewhere; placeholders stay zero.
    pub cost_credits: u64,
    pub cost_cents: u64,
}

impl UsageRecord {
    /// Exact-payload match, ignoring only the generated id. Used to keep a
    /// resubmission of the same fact from double-recording; distinct turns
    /// with identical counts differ in `created_at` and both land.
    pub fn same_fact(&self, other: &UsageRecord) -> bool {
        self.user_id == other.user_id
            && self.created_at == other.created_at
            && self.thread_id == other.thread_id
            && self.engine == other.engine
            && self.model == other.model
            && self.message_count == other.message_count
            && self.attachment_count == other.attachment_count
            && self.internet_search_count == other.internet_search_count
            && self.image_generation_count == other.image_generation_count
            && self.input_tokens == other.input_tokens
            && self.input_cached_tokens == other.input_cached_tokens
            && self.input_audio_tokens == other.input_audio_tokens
            && self.output_tokens == other.output_tokens
            && self.output_audio_tokens == other.output_audio_tokens
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use parley_llm::Message;

/// A persisted conversation. Messages are append-only and never reordered;
/// the in-memory order is authoritative.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thread {
    pub id: String,
    pub user_id: i64,
    /// Empty until the first auto-title completes.
    #[serde(default)]
    pub title: String,
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Thread {
    pub fn new(user_id: i64) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id,
            title: String::new(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn add_message(&mut self, message: Message) {
        self.messages.push(message);
        self.updated_at = Utc::now();
    }

    pub fn has_title(&self) -> bool {
        !self.title.is_empty()
    }
}

use serde::{Deserialize, Serialize};

use super::attachment::Attachment;
use super::tool::ToolCallRecord;
use crate::chunk::Chunk;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single conversation message, both the persisted and the wire shape.
///
/// `transient` is true while the message is still being accumulated from a
/// stream; it is cleared by the terminal content chunk, never inferred from
/// the content itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    #[serde(default)]
    pub content: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment: Option<Attachment>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCallRecord>,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub transient: bool,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            attachment: None,
            tool_calls: Vec::new(),
            transient: false,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// An empty assistant message that is still accumulating stream output.
    pub fn pending_assistant() -> Self {
        let mut message = Self::new(Role::Assistant, "");
        message.transient = true;
        message
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachment = Some(attachment);
        self
    }

    /// Whether the message carries an attachment with actual content.
    pub fn has_attachment(&self) -> bool {
        self.attachment
            .as_ref()
            .map(|a| !a.content.is_empty())
            .unwrap_or(false)
    }

    /// Append streamed text. The chunk marked done freezes the message.
    pub fn append(&mut self, chunk: &Chunk) {
        if let Chunk::Content { text, done } = chunk {
            self.content.push_str(text);
            if *done {
                self.transient = false;
            }
        }
    }

    /// Record a completed tool invocation. Chunks that are not done, or done
    /// without a call record, are ignored.
    pub fn add_tool_call(&mut self, chunk: &Chunk) {
        if let Chunk::Tool {
            done: true,
            call: Some(call),
            ..
        } = chunk
        {
            self.tool_calls.push(call.clone());
        }
    }
}

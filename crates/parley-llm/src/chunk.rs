use serde::{Deserialize, Serialize};

use crate::types::{LlmUsage, ToolCallRecord};

/// One unit of streamed chat output, serialized as-is onto the response
/// channel.
///
/// The sequence is finite and single-pass. A `content` chunk with
/// `done: true` is the terminal marker; a `usage` chunk may arrive before it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Chunk {
    Content {
        text: String,
        done: bool,
    },

    Tool {
        name: String,
        id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        status: Option<String>,
        done: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        call: Option<ToolCallRecord>,
    },

    Usage {
        usage: LlmUsage,
    },

    Error {
        message: String,
        done: bool,
    },
}

impl Chunk {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Content {
            text: text.into(),
            done: false,
        }
    }

    pub fn done() -> Self {
        Self::Content {
            text: String::new(),
            done: true,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
            done: true,
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(
            self,
            Self::Content { done: true, .. } | Self::Error { done: true, .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_chunk_serializes_with_type_tag() {
        let json = serde_json::to_string(&Chunk::text("hi")).unwrap();
        assert_eq!(json, r#"{"type":"content","text":"hi","done":false}"#);
    }

    #[test]
    fn tool_chunk_omits_empty_fields() {
        let chunk = Chunk::Tool {
            name: "search_web".to_string(),
            id: "tc_1".to_string(),
            status: None,
            done: false,
            call: None,
        };
        let json = serde_json::to_string(&chunk).unwrap();
        assert!(!json.contains("status"));
        assert!(!json.contains("call"));
    }

    #[test]
    fn done_marker_round_trips() {
        let json = serde_json::to_string(&Chunk::done()).unwrap();
        let parsed: Chunk = serde_json::from_str(&json).unwrap();
        assert!(parsed.is_done());
    }
}

use serde::{Deserialize, Serialize};

/// File content attached to a message. Immutable once set on a message.
///
/// `content` is base64 for binary mime types, plain text otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    #[serde(rename = "mimeType")]
    pub mime_type: String,
    pub content: String,
}

impl Attachment {
    pub fn new(content: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            content: content.into(),
        }
    }

    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }
}

mod attachment;
mod message;
mod tool;
mod usage;

pub use attachment::Attachment;
pub use message::{Message, Role};
pub use tool::{function_schema, ParameterKind, PluginParameter, ToolCallRecord};
pub use usage::{CompletionTokensDetails, LlmUsage, PromptTokensDetails};

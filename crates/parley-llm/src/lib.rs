pub mod chunk;
pub mod engines;
pub mod error;
pub mod openai;
pub mod plugins;
pub mod provider;
pub mod session;
pub mod testing;
pub mod types;

pub use chunk::Chunk;
pub use engines::{available_engines, base_url, ignite, supports_tools, Engine};
pub use error::SessionError;
pub use openai::OpenAiCompatClient;
pub use plugins::{ImagePlugin, MediaStore, PythonPlugin, SearchPlugin, ToolPlugin};
pub use provider::{
    Completion, CompletionOptions, CompletionRequest, EventStream, Provider, ProviderEvent,
    WireMessage,
};
pub use session::{ChunkStream, EngineSession, SessionOptions};
pub use types::{
    Attachment, LlmUsage, Message, ParameterKind, PluginParameter, Role, ToolCallRecord,
};

pub mod auth;
pub mod chat;
pub mod config;
pub mod error;
pub mod media;
pub mod routes;
pub mod state;

pub use chat::{ChatOrchestrator, ChatRequest, RateLimiter, UsageRecorder};
pub use config::Config;
pub use error::{ApiError, ApiResult};
pub use media::LocalMediaStore;
pub use state::AppState;

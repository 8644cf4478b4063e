pub mod limits;
pub mod orchestrator;
pub mod usage;
pub mod window;

pub use limits::{RateLimiter, RateQuota};
pub use orchestrator::{ChatOrchestrator, ChatRequest};
pub use usage::UsageRecorder;

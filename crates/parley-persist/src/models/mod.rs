mod thread;
mod usage;
mod user;

pub use thread::Thread;
pub use usage::UsageRecord;
pub use user::{Tier, User};

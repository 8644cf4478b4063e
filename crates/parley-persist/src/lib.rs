pub mod error;
pub mod memory;
pub mod models;
pub mod store;

pub use error::{PersistError, Result};
pub use memory::MemoryStore;
pub use models::{Thread, Tier, UsageRecord, User};
pub use store::{ThreadStore, UsageStore, UserStore};

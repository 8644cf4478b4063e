use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Thread, UsageRecord, User};

/// Thread persistence. Saves are last-writer-wins upserts; concurrent edits
/// to one thread are not guarded by an optimistic token.
#[async_trait]
pub trait ThreadStore: Send + Sync {
    async fn load_thread(&self, id: &str) -> Result<Option<Thread>>;

    async fn save_thread(&self, thread: &Thread) -> Result<()>;

    async fn list_threads(&self, user_id: i64) -> Result<Vec<Thread>>;
}

/// Caller identity resolution. User provisioning is out of scope; this is
/// the narrow read contract the pipeline needs.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn user_by_token(&self, token: &str) -> Result<Option<User>>;

    async fn get_user(&self, id: i64) -> Result<Option<User>>;
}

/// Append-only usage facts plus the rolling aggregates the rate limiter
/// consults.
#[async_trait]
pub trait UsageStore: Send + Sync {
    /// Insert a usage row. Returns false (and writes nothing) when an
    /// identical fact is already recorded.
    async fn record(&self, record: UsageRecord) -> Result<bool>;

    async fn total_queries(&self, user_id: i64) -> Result<u64>;

    async fn queries_last_minutes(&self, user_id: i64, minutes: i64) -> Result<u64>;

    async fn tokens_last_24h(&self, user_id: i64) -> Result<u64>;

    async fn images_last_month(&self, user_id: i64) -> Result<u64>;
}

use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::error::Result;
use crate::models::{Thread, UsageRecord, User};
use crate::store::{ThreadStore, UsageStore, UserStore};

/// In-memory store backing the server and the test suite. The production
/// relational store is an external collaborator implementing the same
/// traits; this keeps the pipeline honest about its storage contract.
#[derive(Default)]
pub struct MemoryStore {
    threads: RwLock<HashMap<String, Thread>>,
    users: RwLock<HashMap<i64, User>>,
    tokens: RwLock<HashMap<String, i64>>,
    usage: RwLock<Vec<UsageRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_user(&self, token: &str, user: User) {
        self.tokens
            .write()
            .await
            .insert(token.to_string(), user.id);
        self.users.write().await.insert(user.id, user);
    }
}

#[async_trait]
impl ThreadStore for MemoryStore {
    async fn load_thread(&self, id: &str) -> Result<Option<Thread>> {
        Ok(self.threads.read().await.get(id).cloned())
    }

    async fn save_thread(&self, thread: &Thread) -> Result<()> {
        self.threads
            .write()
            .await
            .insert(thread.id.clone(), thread.clone());
        Ok(())
    }

    async fn list_threads(&self, user_id: i64) -> Result<Vec<Thread>> {
        let mut threads: Vec<Thread> = self
            .threads
            .read()
            .await
            .values()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect();
        threads.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(threads)
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn user_by_token(&self, token: &str) -> Result<Option<User>> {
        let user_id = match self.tokens.read().await.get(token) {
            Some(id) => *id,
            None => return Ok(None),
        };
        Ok(self.users.read().await.get(&user_id).cloned())
    }

    async fn get_user(&self, id: i64) -> Result<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }
}

#[async_trait]
impl UsageStore for MemoryStore {
    async fn record(&self, record: UsageRecord) -> Result<bool> {
        let mut usage = self.usage.write().await;
        if usage.iter().any(|existing| existing.same_fact(&record)) {
            tracing::debug!(
                user_id = record.user_id,
                thread_id = %record.thread_id,
                "duplicate usage fact ignored"
            );
            return Ok(false);
        }
        usage.push(record);
        Ok(true)
    }

    async fn total_queries(&self, user_id: i64) -> Result<u64> {
        Ok(self
            .usage
            .read()
            .await
            .iter()
            .filter(|r| r.user_id == user_id)
            .count() as u64)
    }

    async fn queries_last_minutes(&self, user_id: i64, minutes: i64) -> Result<u64> {
        let after = Utc::now() - Duration::minutes(minutes);
        Ok(self
            .usage
            .read()
            .await
            .iter()
            .filter(|r| r.user_id == user_id && r.created_at > after)
            .count() as u64)
    }

    async fn tokens_last_24h(&self, user_id: i64) -> Result<u64> {
        let after = Utc::now() - Duration::hours(24);
        Ok(self
            .usage
            .read()
            .await
            .iter()
            .filter(|r| r.user_id == user_id && r.created_at > after)
            .map(|r| r.input_tokens + r.output_tokens)
            .sum())
    }

    async fn images_last_month(&self, user_id: i64) -> Result<u64> {
        let after = Utc::now() - Duration::days(30);
        Ok(self
            .usage
            .read()
            .await
            .iter()
            .filter(|r| r.user_id == user_id && r.created_at > after)
            .map(|r| r.image_generation_count)
            .sum())
    }
}

use std::sync::Arc;

use parley_llm::MediaStore;
use parley_persist::{ThreadStore, UsageStore, UserStore};

use crate::config::Config;

/// Shared application state passed to all handlers
///
/// Storage and media are trait objects so the server runs against the
/// in-memory store in tests and against external backends in production.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub threads: Arc<dyn ThreadStore>,
    pub users: Arc<dyn UserStore>,
    pub usage: Arc<dyn UsageStore>,
    pub media: Arc<dyn MediaStore>,
}

impl AppState {
    pub fn new(
        config: Config,
        threads: Arc<dyn ThreadStore>,
        users: Arc<dyn UserStore>,
        usage: Arc<dyn UsageStore>,
        media: Arc<dyn MediaStore>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            threads,
            users,
            usage,
            media,
        }
    }
}

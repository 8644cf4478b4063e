use std::sync::Arc;

use parley_persist::{UsageStore, User};

use crate::config::TierLimits;
use crate::error::{ApiError, ApiResult};

/// Remaining-quota hints for caps that were actually checked, surfaced as
/// `X-RateLimit-*` response headers.
#[derive(Debug, Default, Clone, Copy)]
pub struct RateQuota {
    pub rpm: Option<CapStatus>,
    pub tokens_24h: Option<CapStatus>,
}

#[derive(Debug, Clone, Copy)]
pub struct CapStatus {
    pub limit: u64,
    pub remaining: u64,
}

pub struct RateLimiter {
    usage: Arc<dyn UsageStore>,
}

impl RateLimiter {
    pub fn new(usage: Arc<dyn UsageStore>) -> Self {
        Self { usage }
    }

    /// Check both caps against the recorded usage. A cap of zero is
    /// uncapped and skipped entirely. The rejection never says which cap
    /// tripped.
    pub async fn admit(&self, user: &User, limits: TierLimits) -> ApiResult<RateQuota> {
        let mut quota = RateQuota::default();

        if limits.rpm > 0 {
            let used = self.usage.queries_last_minutes(user.id, 1).await?;
            if used >= limits.rpm {
                tracing::warn!(user_id = user.id, used, "request rate cap reached");
                return Err(ApiError::RateLimited);
            }
            quota.rpm = Some(CapStatus {
                limit: limits.rpm,
                remaining: limits.rpm - used,
            });
        }

        if limits.tokens_24h > 0 {
            let used = self.usage.tokens_last_24h(user.id).await?;
            if used >= limits.tokens_24h {
                tracing::warn!(user_id = user.id, used, "token cap reached");
                return Err(ApiError::RateLimited);
            }
            quota.tokens_24h = Some(CapStatus {
                limit: limits.tokens_24h,
                remaining: limits.tokens_24h - used,
            });
        }

        Ok(quota)
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Subscription tier. Closed set: an unrecognized tier string is rejected at
/// deserialization rather than defaulting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Free,
    Basic,
    Pro,
    Unlimited,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub tier: Tier,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_expires_at: Option<DateTime<Utc>>,
}

impl User {
    /// Entitlement check gating image generation: a paying tier with an
    /// unexpired subscription.
    pub fn can_prompt(&self, now: DateTime<Utc>) -> bool {
        if self.tier == Tier::Free {
            return false;
        }
        match self.subscription_expires_at {
            Some(expires_at) => expires_at > now,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn user(tier: Tier, expires_in_days: Option<i64>) -> User {
        User {
            id: 1,
            username: "alice".to_string(),
            tier,
            subscription_expires_at: expires_in_days.map(|d| Utc::now() + Duration::days(d)),
        }
    }

    #[test]
    fn free_tier_cannot_prompt() {
        assert!(!user(Tier::Free, Some(30)).can_prompt(Utc::now()));
    }

    #[test]
    fn expired_subscription_cannot_prompt() {
        assert!(!user(Tier::Pro, Some(-1)).can_prompt(Utc::now()));
        assert!(!user(Tier::Pro, None).can_prompt(Utc::now()));
    }

    #[test]
    fn active_paying_tier_can_prompt() {
        assert!(user(Tier::Basic, Some(30)).can_prompt(Utc::now()));
    }

    #[test]
    fn unknown_tier_is_rejected() {
        let result: Result<Tier, _> = serde_json::from_str(r#""platinum""#);
        assert!(result.is_err());
    }
}

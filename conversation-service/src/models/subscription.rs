//! Paid subscription record, owned by the billing integration.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Grace period after `current_period_end` during which the subscription
/// still counts as active, covering late renewal webhooks.
pub const RENEWAL_GRACE_SECS: i64 = 86_400;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSubscription {
    pub user_id: String,
    pub customer_id: Option<String>,
    pub subscription_id: Option<String>,
    /// Price the user is subscribed to; `None` once the subscription is gone.
    pub price_id: Option<String>,
    pub current_period_end: Option<DateTime<Utc>>,
}

impl UserSubscription {
    /// Whether the subscription grants access at `now`.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        match (&self.price_id, self.current_period_end) {
            (Some(_), Some(period_end)) => period_end + Duration::seconds(RENEWAL_GRACE_SECS) > now,
            _ => false,
        }
    }
}

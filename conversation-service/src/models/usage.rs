//! Free-tier usage tracking.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Number of free calls a user has consumed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserApiLimit {
    pub user_id: String,
    pub count: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserApiLimit {
    pub fn new(user_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            user_id: user_id.into(),
            count: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Response body of `GET /api/usage`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageSummary {
    pub count: u32,
    pub max_free_calls: u32,
    pub is_pro: bool,
}

//! Free-tier quota collaborator.

use super::StoreError;
use async_trait::async_trait;

/// Tracks how many free calls each user has consumed.
///
/// Implementations own the counter; the quota policy itself is
/// `count < max_free_calls`.
#[async_trait]
pub trait UsageLimiter: Send + Sync {
    /// Free calls granted before a subscription is required.
    fn max_free_calls(&self) -> u32;

    /// Calls consumed so far. Users without a record have consumed none.
    async fn usage_count(&self, user_id: &str) -> Result<u32, StoreError>;

    /// Record one consumed call.
    async fn record_usage(&self, user_id: &str) -> Result<(), StoreError>;

    async fn has_remaining_quota(&self, user_id: &str) -> Result<bool, StoreError> {
        Ok(self.usage_count(user_id).await? < self.max_free_calls())
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

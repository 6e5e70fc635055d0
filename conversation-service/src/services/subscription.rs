//! Paid subscription collaborator.

use super::StoreError;
use async_trait::async_trait;

/// Read-only view of the billing integration's subscription state.
#[async_trait]
pub trait SubscriptionChecker: Send + Sync {
    async fn is_subscribed(&self, user_id: &str) -> Result<bool, StoreError>;
}

//! In-process stores for local development and tests.
//!
//! State lives only as long as the process. Each counter increment holds
//! the map entry lock, so concurrent increments for one user are not lost.

use super::{StoreError, SubscriptionChecker, UsageLimiter};
use crate::models::{UserApiLimit, UserSubscription};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use std::sync::Arc;

#[derive(Clone)]
pub struct InMemoryStore {
    limits: Arc<DashMap<String, UserApiLimit>>,
    subscriptions: Arc<DashMap<String, UserSubscription>>,
    max_free_calls: u32,
}

impl InMemoryStore {
    pub fn new(max_free_calls: u32) -> Self {
        Self {
            limits: Arc::new(DashMap::new()),
            subscriptions: Arc::new(DashMap::new()),
            max_free_calls,
        }
    }

    /// Insert or replace a user's subscription record.
    pub fn upsert_subscription(&self, subscription: UserSubscription) {
        self.subscriptions
            .insert(subscription.user_id.clone(), subscription);
    }
}

#[async_trait]
impl UsageLimiter for InMemoryStore {
    fn max_free_calls(&self) -> u32 {
        self.max_free_calls
    }

    async fn usage_count(&self, user_id: &str) -> Result<u32, StoreError> {
        Ok(self
            .limits
            .get(user_id)
            .map(|limit| limit.count)
            .unwrap_or(0))
    }

    async fn record_usage(&self, user_id: &str) -> Result<(), StoreError> {
        let mut limit = self
            .limits
            .entry(user_id.to_string())
            .or_insert_with(|| UserApiLimit::new(user_id));
        limit.count = limit.count.saturating_add(1);
        limit.updated_at = Utc::now();
        Ok(())
    }
}

#[async_trait]
impl SubscriptionChecker for InMemoryStore {
    async fn is_subscribed(&self, user_id: &str) -> Result<bool, StoreError> {
        let now = Utc::now();
        Ok(self
            .subscriptions
            .get(user_id)
            .map(|subscription| subscription.is_active_at(now))
            .unwrap_or(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn pro(user_id: &str, period_end: chrono::DateTime<Utc>) -> UserSubscription {
        UserSubscription {
            user_id: user_id.to_string(),
            customer_id: Some("cus_1".to_string()),
            subscription_id: Some("sub_1".to_string()),
            price_id: Some("price_pro".to_string()),
            current_period_end: Some(period_end),
        }
    }

    #[tokio::test]
    async fn new_user_has_full_quota() {
        let store = InMemoryStore::new(5);

        assert_eq!(store.usage_count("user_1").await.unwrap(), 0);
        assert!(store.has_remaining_quota("user_1").await.unwrap());
    }

    #[tokio::test]
    async fn quota_runs_out_at_the_limit() {
        let store = InMemoryStore::new(2);

        store.record_usage("user_1").await.unwrap();
        assert!(store.has_remaining_quota("user_1").await.unwrap());

        store.record_usage("user_1").await.unwrap();
        assert_eq!(store.usage_count("user_1").await.unwrap(), 2);
        assert!(!store.has_remaining_quota("user_1").await.unwrap());

        // Other users are unaffected.
        assert!(store.has_remaining_quota("user_2").await.unwrap());
    }

    #[tokio::test]
    async fn zero_limit_means_no_free_calls() {
        let store = InMemoryStore::new(0);
        assert!(!store.has_remaining_quota("user_1").await.unwrap());
    }

    #[tokio::test]
    async fn concurrent_increments_are_not_lost() {
        let store = InMemoryStore::new(1000);

        let tasks: Vec<_> = (0..50)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.record_usage("user_1").await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(store.usage_count("user_1").await.unwrap(), 50);
    }

    #[tokio::test]
    async fn subscription_status_follows_period_end() {
        let store = InMemoryStore::new(5);
        assert!(!store.is_subscribed("user_1").await.unwrap());

        store.upsert_subscription(pro("user_1", Utc::now() + Duration::days(30)));
        assert!(store.is_subscribed("user_1").await.unwrap());

        store.upsert_subscription(pro("user_1", Utc::now() - Duration::days(3)));
        assert!(!store.is_subscribed("user_1").await.unwrap());
    }
}

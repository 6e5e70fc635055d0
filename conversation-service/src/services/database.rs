//! MongoDB-backed usage and subscription stores.
//!
//! `user_api_limits` holds the free-tier counter per user and is written by
//! this service. `user_subscriptions` is written by the billing integration
//! and only read here.

use super::metrics::record_store_operation;
use super::{StoreError, SubscriptionChecker, UsageLimiter};
use crate::models::{UserApiLimit, UserSubscription};
use async_trait::async_trait;
use chrono::Utc;
use mongodb::{
    bson::{doc, DateTime as BsonDateTime},
    options::{IndexOptions, UpdateOptions},
    Client as MongoClient, Collection, Database, IndexModel,
};
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use std::time::Instant;

const API_LIMITS_COLLECTION: &str = "user_api_limits";
const SUBSCRIPTIONS_COLLECTION: &str = "user_subscriptions";

#[derive(Debug, Serialize, Deserialize)]
struct ApiLimitDocument {
    user_id: String,
    count: i64,
    created_at: BsonDateTime,
    updated_at: BsonDateTime,
}

impl From<ApiLimitDocument> for UserApiLimit {
    fn from(doc: ApiLimitDocument) -> Self {
        UserApiLimit {
            user_id: doc.user_id,
            count: doc.count.clamp(0, u32::MAX as i64) as u32,
            created_at: doc.created_at.to_chrono(),
            updated_at: doc.updated_at.to_chrono(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct SubscriptionDocument {
    user_id: String,
    #[serde(default)]
    stripe_customer_id: Option<String>,
    #[serde(default)]
    stripe_subscription_id: Option<String>,
    #[serde(default)]
    stripe_price_id: Option<String>,
    #[serde(default)]
    stripe_current_period_end: Option<BsonDateTime>,
}

impl From<SubscriptionDocument> for UserSubscription {
    fn from(doc: SubscriptionDocument) -> Self {
        UserSubscription {
            user_id: doc.user_id,
            customer_id: doc.stripe_customer_id,
            subscription_id: doc.stripe_subscription_id,
            price_id: doc.stripe_price_id,
            current_period_end: doc.stripe_current_period_end.map(|d| d.to_chrono()),
        }
    }
}

#[derive(Clone)]
pub struct MongoStore {
    db: Database,
    max_free_calls: u32,
}

impl MongoStore {
    pub async fn connect(uri: &str, database: &str, max_free_calls: u32) -> Result<Self, AppError> {
        tracing::info!("Connecting to MongoDB");
        let client = MongoClient::with_uri_str(uri).await.map_err(|e| {
            tracing::error!("Failed to connect to MongoDB: {}", e);
            AppError::DatabaseError(anyhow::anyhow!(e.to_string()))
        })?;
        let db = client.database(database);
        tracing::info!(database = %database, "Successfully connected to MongoDB database");
        Ok(Self { db, max_free_calls })
    }

    pub async fn initialize_indexes(&self) -> Result<(), AppError> {
        tracing::info!("Creating MongoDB indexes for conversation-service");

        let user_id_index = || {
            IndexModel::builder()
                .keys(doc! { "user_id": 1 })
                .options(
                    IndexOptions::builder()
                        .name("user_id_idx".to_string())
                        .unique(true)
                        .build(),
                )
                .build()
        };

        self.api_limits()
            .create_index(user_id_index(), None)
            .await
            .map_err(|e| {
                tracing::error!("Failed to create user_api_limits index: {}", e);
                AppError::DatabaseError(anyhow::anyhow!(e.to_string()))
            })?;

        self.subscriptions()
            .create_index(user_id_index(), None)
            .await
            .map_err(|e| {
                tracing::error!("Failed to create user_subscriptions index: {}", e);
                AppError::DatabaseError(anyhow::anyhow!(e.to_string()))
            })?;

        tracing::info!("Successfully created all MongoDB indexes");
        Ok(())
    }

    fn api_limits(&self) -> Collection<ApiLimitDocument> {
        self.db.collection(API_LIMITS_COLLECTION)
    }

    fn subscriptions(&self) -> Collection<SubscriptionDocument> {
        self.db.collection(SUBSCRIPTIONS_COLLECTION)
    }

    pub async fn find_api_limit(&self, user_id: &str) -> Result<Option<UserApiLimit>, StoreError> {
        let start = Instant::now();
        let result = self
            .api_limits()
            .find_one(doc! { "user_id": user_id }, None)
            .await;
        record_store_operation(
            "find",
            API_LIMITS_COLLECTION,
            start.elapsed().as_secs_f64(),
            result.is_ok(),
        );

        Ok(result?.map(UserApiLimit::from))
    }

    pub async fn find_subscription(
        &self,
        user_id: &str,
    ) -> Result<Option<UserSubscription>, StoreError> {
        let start = Instant::now();
        let result = self
            .subscriptions()
            .find_one(doc! { "user_id": user_id }, None)
            .await;
        record_store_operation(
            "find",
            SUBSCRIPTIONS_COLLECTION,
            start.elapsed().as_secs_f64(),
            result.is_ok(),
        );

        Ok(result?.map(UserSubscription::from))
    }
}

#[async_trait]
impl UsageLimiter for MongoStore {
    fn max_free_calls(&self) -> u32 {
        self.max_free_calls
    }

    async fn usage_count(&self, user_id: &str) -> Result<u32, StoreError> {
        Ok(self
            .find_api_limit(user_id)
            .await?
            .map(|limit| limit.count)
            .unwrap_or(0))
    }

    /// Atomic `$inc` with upsert; the first call creates the record.
    async fn record_usage(&self, user_id: &str) -> Result<(), StoreError> {
        let now = BsonDateTime::now();
        let options = UpdateOptions::builder().upsert(true).build();

        let start = Instant::now();
        let result = self
            .api_limits()
            .update_one(
                doc! { "user_id": user_id },
                doc! {
                    "$inc": { "count": 1_i64 },
                    "$set": { "updated_at": now },
                    "$setOnInsert": { "created_at": now },
                },
                options,
            )
            .await;
        record_store_operation(
            "increment",
            API_LIMITS_COLLECTION,
            start.elapsed().as_secs_f64(),
            result.is_ok(),
        );

        result?;
        tracing::debug!(user_id = %user_id, "Recorded free-tier usage");
        Ok(())
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        self.db.run_command(doc! { "ping": 1 }, None).await?;
        Ok(())
    }
}

#[async_trait]
impl SubscriptionChecker for MongoStore {
    async fn is_subscribed(&self, user_id: &str) -> Result<bool, StoreError> {
        let now = Utc::now();
        Ok(self
            .find_subscription(user_id)
            .await?
            .map(|subscription| subscription.is_active_at(now))
            .unwrap_or(false))
    }
}

pub mod database;
pub mod memory;
pub mod metrics;
pub mod providers;
pub mod subscription;
pub mod usage;

pub use database::MongoStore;
pub use memory::InMemoryStore;
pub use providers::{CompletionProvider, ProviderError};
pub use subscription::SubscriptionChecker;
pub use usage::UsageLimiter;

use service_core::error::AppError;
use thiserror::Error;

/// Error type for usage and subscription store operations.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] mongodb::error::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::DatabaseError(anyhow::Error::new(err))
    }
}

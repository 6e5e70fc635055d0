pub mod message;
pub mod subscription;
pub mod usage;

pub use message::{ChatMessage, ConversationRequest};
pub use subscription::UserSubscription;
pub use usage::{UsageSummary, UserApiLimit};

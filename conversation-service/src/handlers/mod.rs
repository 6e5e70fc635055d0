//! HTTP handlers for the conversation service.

pub mod conversation;
pub mod health;
pub mod usage;

pub use conversation::create_conversation;
pub use health::{health_check, metrics, readiness_check};
pub use usage::get_usage;

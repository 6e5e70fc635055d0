//! Outcomes of the conversation endpoint.
//!
//! Each rejection maps to a fixed status and plain-text body. Anything that
//! is not one of the early rejections collapses into [`ConversationError::Internal`],
//! whose cause is logged but never returned to the caller.

use crate::services::{ProviderError, StoreError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConversationError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("OpenAI API Key not configured.")]
    Misconfigured,

    #[error("Messages are required")]
    MissingMessages,

    #[error("Free trial has expired. Please upgrade to pro.")]
    TrialExpired,

    #[error("Internal Error")]
    Internal(#[source] anyhow::Error),
}

impl ConversationError {
    pub fn status(&self) -> StatusCode {
        match self {
            ConversationError::Unauthorized => StatusCode::UNAUTHORIZED,
            ConversationError::Misconfigured => StatusCode::INTERNAL_SERVER_ERROR,
            ConversationError::MissingMessages => StatusCode::BAD_REQUEST,
            ConversationError::TrialExpired => StatusCode::FORBIDDEN,
            ConversationError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Metrics label for the outcome.
    pub fn outcome(&self) -> &'static str {
        match self {
            ConversationError::Unauthorized => "unauthorized",
            ConversationError::Misconfigured => "misconfigured",
            ConversationError::MissingMessages => "bad_request",
            ConversationError::TrialExpired => "trial_expired",
            ConversationError::Internal(_) => "internal_error",
        }
    }
}

impl From<ProviderError> for ConversationError {
    fn from(err: ProviderError) -> Self {
        ConversationError::Internal(anyhow::Error::new(err))
    }
}

impl From<StoreError> for ConversationError {
    fn from(err: StoreError) -> Self {
        ConversationError::Internal(anyhow::Error::new(err))
    }
}

impl From<serde_json::Error> for ConversationError {
    fn from(err: serde_json::Error) -> Self {
        ConversationError::Internal(anyhow::Error::new(err).context("Invalid request body"))
    }
}

impl IntoResponse for ConversationError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}

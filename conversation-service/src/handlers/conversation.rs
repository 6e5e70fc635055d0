//! `POST /api/conversation`: usage-gated chat completion.

use crate::error::ConversationError;
use crate::models::ConversationRequest;
use crate::services::metrics;
use crate::startup::AppState;
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use service_core::observability::extract_request_id;

/// Run the conversation pipeline and render its outcome.
///
/// Internal failures are logged here with their cause; the caller only
/// sees the generic body.
#[tracing::instrument(name = "conversation", skip_all)]
pub async fn create_conversation(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    match process_conversation(&state, &headers, &body).await {
        Ok(message) => {
            metrics::record_conversation("success");
            (StatusCode::OK, Json(message)).into_response()
        }
        Err(err) => {
            if let ConversationError::Internal(cause) = &err {
                tracing::error!(error = ?cause, "Conversation request failed");
            } else {
                tracing::info!(outcome = err.outcome(), "Conversation request rejected");
            }
            metrics::record_conversation(err.outcome());
            err.into_response()
        }
    }
}

/// Authenticate, gate, call the provider, then record usage.
///
/// Each step runs at most once and the first failure ends the request.
/// Usage is only recorded after the provider call succeeded, and never
/// for subscribers.
pub async fn process_conversation(
    state: &AppState,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<serde_json::Value, ConversationError> {
    let identity = state
        .identity
        .resolve(headers)
        .ok_or(ConversationError::Unauthorized)?;

    if !state.provider.is_configured() {
        return Err(ConversationError::Misconfigured);
    }

    let request = ConversationRequest::from_slice(body)?;
    let messages = request
        .messages
        .ok_or(ConversationError::MissingMessages)?;

    let user_id = identity.user_id.as_str();
    let (has_free_quota, is_pro) = tokio::try_join!(
        state.usage.has_remaining_quota(user_id),
        state.subscriptions.is_subscribed(user_id),
    )?;

    if !has_free_quota && !is_pro {
        return Err(ConversationError::TrialExpired);
    }

    let completion_request = state
        .completion
        .build_request(messages, extract_request_id(headers))?;
    let response = state.provider.complete(&completion_request).await?;
    let message = response.into_first_message()?;

    if !is_pro {
        state.usage.record_usage(user_id).await?;
    }

    tracing::debug!(user_id = %user_id, is_pro, "Conversation completed");
    Ok(message)
}

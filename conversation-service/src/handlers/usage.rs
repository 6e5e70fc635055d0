//! `GET /api/usage`: free-tier consumption for the current user.

use crate::models::UsageSummary;
use crate::startup::AppState;
use axum::{extract::State, http::HeaderMap, Json};
use service_core::error::AppError;

pub async fn get_usage(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<UsageSummary>, AppError> {
    let identity = state
        .identity
        .resolve(&headers)
        .ok_or_else(|| AppError::Unauthorized(anyhow::anyhow!("Unauthorized")))?;

    let user_id = identity.user_id.as_str();
    let (count, is_pro) = tokio::try_join!(
        state.usage.usage_count(user_id),
        state.subscriptions.is_subscribed(user_id),
    )?;

    Ok(Json(UsageSummary {
        count,
        max_free_calls: state.usage.max_free_calls(),
        is_pro,
    }))
}

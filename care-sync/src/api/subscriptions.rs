//! Subscription actions

use axum::Json;
use axum::extract::{Path, State};
use serde::Deserialize;
use shared::error::ApiResponse;
use shared::models::{Subscription, SubscriptionStatus};
use shared::util::now_millis;

use crate::state::AppState;

use super::ApiResult;

#[derive(Debug, Deserialize)]
pub struct StatusChange {
    pub status: SubscriptionStatus,
}

/// POST /api/subscriptions/{id}/status
pub async fn change_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<StatusChange>,
) -> ApiResult<Subscription> {
    let ctx = state.reconciler().await;
    let subscription =
        crate::subscriptions::change_status(ctx.store(), ctx.payments(), &id, req.status, now_millis())
            .await?;
    Ok(ApiResponse::success(subscription))
}

/// POST /api/subscriptions/{id}/payment-link
pub async fn create_payment_link(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Subscription> {
    let ctx = state.reconciler().await;
    let subscription =
        crate::subscriptions::create_payment_link(ctx.store(), ctx.payments(), ctx.plans(), &id)
            .await?;
    Ok(ApiResponse::success(subscription))
}

//! Trade-in evaluation actions

use axum::Json;
use axum::extract::{Path, State};
use shared::error::ApiResponse;
use shared::models::Evaluation;
use shared::util::now_millis;

use crate::state::AppState;
use crate::tradein::{self, ApprovalOutcome, EvaluationCreate};

use super::ApiResult;

/// POST /api/evaluations
pub async fn create(
    State(state): State<AppState>,
    Json(req): Json<EvaluationCreate>,
) -> ApiResult<Evaluation> {
    let evaluation = tradein::create_evaluation(state.store.as_ref(), &req).await?;
    Ok(ApiResponse::success(evaluation))
}

/// POST /api/evaluations/{id}/approve
pub async fn approve(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<ApprovalOutcome> {
    let ctx = state.reconciler().await;
    let outcome = tradein::approve(ctx.store(), ctx.commerce(), &id, now_millis()).await?;
    Ok(ApiResponse::success(outcome))
}

/// POST /api/evaluations/{id}/reject
pub async fn reject(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Evaluation> {
    let evaluation = tradein::reject(state.store.as_ref(), &id).await?;
    Ok(ApiResponse::success(evaluation))
}

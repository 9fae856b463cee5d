//! Manual sync triggers, conflict reports and schedule

use axum::Json;
use axum::extract::{Query, State};
use serde::{Deserialize, Serialize};
use shared::error::{ApiResponse, AppError};
use shared::models::SyncHistory;

use crate::reconcile::{ConflictReport, CustomerSyncReport, FullSyncReport, ResolveReport};
use crate::state::AppState;
use crate::store::sync_history;

use super::ApiResult;

/// GET /api/sync/conflicts
pub async fn check_conflicts(State(state): State<AppState>) -> ApiResult<ConflictReport> {
    let report = state.reconciler().await.check_for_conflicts().await?;
    Ok(ApiResponse::success(report))
}

/// POST /api/sync/conflicts/resolve
pub async fn resolve_conflicts(State(state): State<AppState>) -> ApiResult<ResolveReport> {
    Ok(ApiResponse::success(state.resolve_conflicts().await?))
}

/// POST /api/sync/full
pub async fn full_sync(State(state): State<AppState>) -> ApiResult<FullSyncReport> {
    Ok(ApiResponse::success(state.run_full_sync().await?))
}

/// POST /api/sync/customers
pub async fn customer_sync(State(state): State<AppState>) -> ApiResult<CustomerSyncReport> {
    Ok(ApiResponse::success(state.run_customer_sync().await?))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Schedule {
    /// Minutes between runs; 0 when auto sync is off
    pub interval_minutes: u64,
}

/// GET /api/sync/schedule
pub async fn get_schedule(State(state): State<AppState>) -> ApiResult<Schedule> {
    let interval_minutes = state.auto_sync_interval().await.unwrap_or(0);
    Ok(ApiResponse::success(Schedule { interval_minutes }))
}

/// PUT /api/sync/schedule
pub async fn put_schedule(
    State(state): State<AppState>,
    Json(req): Json<Schedule>,
) -> ApiResult<Schedule> {
    if req.interval_minutes > 7 * 24 * 60 {
        return Err(AppError::validation("interval_minutes must be at most one week"));
    }
    state.schedule_auto_sync(req.interval_minutes).await;
    Ok(ApiResponse::success(req))
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

/// GET /api/sync/history
pub async fn history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<Vec<SyncHistory>> {
    let limit = query.limit.unwrap_or(50).clamp(1, 500);
    let rows = sync_history::list_recent(state.store.as_ref(), limit).await?;
    Ok(ApiResponse::success(rows))
}

//! HTTP routes for care-sync
//!
//! Webhook receivers, manual sync triggers, trade-in and subscription
//! actions, and provider settings. Authentication is handled in front of
//! this service.

pub mod evaluations;
pub mod health;
pub mod settings;
pub mod subscriptions;
pub mod sync;
pub mod webhooks;

use axum::Router;
use axum::routing::{get, post, put};
use shared::error::{ApiResponse, AppError};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Handler result: enveloped payload or a coded error
pub type ApiResult<T> = Result<ApiResponse<T>, AppError>;

/// Create the combined router
pub fn create_router(state: AppState) -> Router {
    // Provider webhooks (signature-verified, raw body)
    let webhooks = Router::new()
        .route("/webhooks/payments", post(webhooks::payments))
        .route("/webhooks/commerce", post(webhooks::commerce));

    let sync = Router::new()
        .route("/api/sync/conflicts", get(sync::check_conflicts))
        .route("/api/sync/conflicts/resolve", post(sync::resolve_conflicts))
        .route("/api/sync/full", post(sync::full_sync))
        .route("/api/sync/customers", post(sync::customer_sync))
        .route(
            "/api/sync/schedule",
            get(sync::get_schedule).put(sync::put_schedule),
        )
        .route("/api/sync/history", get(sync::history));

    let actions = Router::new()
        .route("/api/evaluations", post(evaluations::create))
        .route("/api/evaluations/{id}/approve", post(evaluations::approve))
        .route("/api/evaluations/{id}/reject", post(evaluations::reject))
        .route(
            "/api/subscriptions/{id}/status",
            post(subscriptions::change_status),
        )
        .route(
            "/api/subscriptions/{id}/payment-link",
            post(subscriptions::create_payment_link),
        )
        .route("/api/settings/providers", put(settings::update_providers));

    Router::new()
        .route("/health", get(health::health_check))
        .merge(webhooks)
        .merge(sync)
        .merge(actions)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

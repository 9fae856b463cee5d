//! Provider settings

use axum::Json;
use axum::extract::State;
use shared::error::{ApiResponse, AppError};

use crate::providers::ProviderSettings;
use crate::state::AppState;

use super::ApiResult;

/// PUT /api/settings/providers
///
/// Replaces the credentials used by every subsequent sync, webhook and
/// action. Secrets are not echoed back.
pub async fn update_providers(
    State(state): State<AppState>,
    Json(settings): Json<ProviderSettings>,
) -> ApiResult<()> {
    settings.validate().map_err(AppError::validation)?;
    state.update_settings(settings).await;
    Ok(ApiResponse::ok())
}

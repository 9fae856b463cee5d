//! Error types for care-sync
//!
//! `ProviderError` is what every remote client returns (record store,
//! payments, commerce). It is passed through unwrapped; callers classify it.
//!
//! `ServiceError` bridges provider errors and the API-layer `AppError` so
//! that `?` works in handlers and workflows without manual `map_err`.

use axum::response::IntoResponse;
use shared::error::{AppError, ErrorCode};
use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Remote call failure
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Transport-level failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status with the raw response body
    #[error("API error ({status}): {body}")]
    Api { status: u16, body: String },

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Response did not have the expected shape
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for remote operations
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Service-layer error
///
/// - `Provider`: remote/store failure (logged, mapped to UpstreamError)
/// - `App`: business-rule errors (transparent pass-through to client)
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    App(#[from] AppError),
}

impl ServiceError {
    /// Error code when this is a business-rule error
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            ServiceError::App(e) => Some(e.code),
            ServiceError::Provider(_) => None,
        }
    }
}

impl From<ProviderError> for AppError {
    fn from(e: ProviderError) -> Self {
        tracing::error!(error = %e, "Provider error");
        match e {
            ProviderError::NotFound(resource) => AppError::not_found(resource),
            other => AppError::upstream(other.to_string()),
        }
    }
}

impl From<ServiceError> for AppError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::App(app_err) => app_err,
            ServiceError::Provider(provider_err) => provider_err.into(),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> axum::response::Response {
        let app_error: AppError = self.into();
        app_error.into_response()
    }
}

/// Convenience type alias for service-layer results
pub type ServiceResult<T> = Result<T, ServiceError>;

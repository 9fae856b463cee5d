//! HTTP status code mapping for error codes

use super::codes::ErrorCode;
use http::StatusCode;

impl ErrorCode {
    /// Get the appropriate HTTP status code for this error code
    pub fn http_status(&self) -> StatusCode {
        match self {
            Self::Success => StatusCode::OK,

            // 404 Not Found
            Self::NotFound
            | Self::EvaluationNotFound
            | Self::CouponNotFound
            | Self::SubscriptionNotFound
            | Self::CustomerNotFound => StatusCode::NOT_FOUND,

            // 409 Conflict
            Self::AlreadyExists
            | Self::InvalidEvaluationTransition
            | Self::InvalidSubscriptionTransition
            | Self::SyncAlreadyRunning => StatusCode::CONFLICT,

            // 401 Unauthorized
            Self::WebhookSignatureInvalid => StatusCode::UNAUTHORIZED,

            // 502 Bad Gateway (remote provider said no)
            Self::PaymentsProviderError | Self::CommerceProviderError | Self::UpstreamError => {
                StatusCode::BAD_GATEWAY
            }

            // 500 Internal Server Error
            Self::Unknown
            | Self::InternalError
            | Self::RecordStoreError
            | Self::ConfigError
            | Self::SyncFailed => StatusCode::INTERNAL_SERVER_ERROR,

            // 400 Bad Request
            Self::ValidationFailed
            | Self::InvalidRequest
            | Self::InvalidFormat
            | Self::RequiredField
            | Self::WebhookPayloadInvalid
            | Self::UnknownPlan => StatusCode::BAD_REQUEST,
        }
    }
}

//! Unified error codes for the care-sync service
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 4xxx: Trade-in errors
//! - 5xxx: Provider errors (payments, commerce, subscriptions)
//! - 6xxx: Sync errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values for efficient serialization
/// and cross-language compatibility (Rust, TypeScript, etc.)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Resource already exists
    AlreadyExists = 4,
    /// Invalid request
    InvalidRequest = 5,
    /// Invalid format
    InvalidFormat = 6,
    /// Required field missing
    RequiredField = 7,

    // ==================== 4xxx: Trade-in ====================
    /// Evaluation not found
    EvaluationNotFound = 4001,
    /// Evaluation cannot move to the requested status
    InvalidEvaluationTransition = 4002,
    /// Coupon not found
    CouponNotFound = 4003,

    // ==================== 5xxx: Providers ====================
    /// Subscription not found
    SubscriptionNotFound = 5001,
    /// Subscription cannot move to the requested status
    InvalidSubscriptionTransition = 5002,
    /// Payments provider request failed
    PaymentsProviderError = 5003,
    /// Commerce provider request failed
    CommerceProviderError = 5004,
    /// Webhook signature missing or invalid
    WebhookSignatureInvalid = 5005,
    /// Webhook payload could not be parsed
    WebhookPayloadInvalid = 5006,
    /// Plan not present in the plan catalog
    UnknownPlan = 5007,

    // ==================== 6xxx: Sync ====================
    /// A sync of the same kind is already running
    SyncAlreadyRunning = 6001,
    /// Sync run failed
    SyncFailed = 6002,
    /// Customer not found
    CustomerNotFound = 6003,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
    /// Record store error
    RecordStoreError = 9002,
    /// Configuration error
    ConfigError = 9003,
    /// Upstream service error
    UpstreamError = 9004,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Check if this is a success code
    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, ErrorCode::Success)
    }

    /// Get the developer-facing English message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::Success => "Operation completed successfully",
            ErrorCode::Unknown => "An unknown error occurred",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::AlreadyExists => "Resource already exists",
            ErrorCode::InvalidRequest => "Invalid request",
            ErrorCode::InvalidFormat => "Invalid format",
            ErrorCode::RequiredField => "Required field is missing",

            // Trade-in
            ErrorCode::EvaluationNotFound => "Evaluation not found",
            ErrorCode::InvalidEvaluationTransition => "Evaluation status transition not allowed",
            ErrorCode::CouponNotFound => "Coupon not found",

            // Providers
            ErrorCode::SubscriptionNotFound => "Subscription not found",
            ErrorCode::InvalidSubscriptionTransition => {
                "Subscription status transition not allowed"
            }
            ErrorCode::PaymentsProviderError => "Payments provider request failed",
            ErrorCode::CommerceProviderError => "Commerce provider request failed",
            ErrorCode::WebhookSignatureInvalid => "Webhook signature is invalid",
            ErrorCode::WebhookPayloadInvalid => "Webhook payload is invalid",
            ErrorCode::UnknownPlan => "Unknown subscription plan",

            // Sync
            ErrorCode::SyncAlreadyRunning => "A sync of this kind is already running",
            ErrorCode::SyncFailed => "Sync failed",
            ErrorCode::CustomerNotFound => "Customer not found",

            // System
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::RecordStoreError => "Record store error",
            ErrorCode::ConfigError => "Configuration error",
            ErrorCode::UpstreamError => "Upstream service error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{:04}", self.code())
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error when converting from an invalid u16 to ErrorCode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            0 => Ok(ErrorCode::Success),
            1 => Ok(ErrorCode::Unknown),
            2 => Ok(ErrorCode::ValidationFailed),
            3 => Ok(ErrorCode::NotFound),
            4 => Ok(ErrorCode::AlreadyExists),
            5 => Ok(ErrorCode::InvalidRequest),
            6 => Ok(ErrorCode::InvalidFormat),
            7 => Ok(ErrorCode::RequiredField),

            // Trade-in
            4001 => Ok(ErrorCode::EvaluationNotFound),
            4002 => Ok(ErrorCode::InvalidEvaluationTransition),
            4003 => Ok(ErrorCode::CouponNotFound),

            // Providers
            5001 => Ok(ErrorCode::SubscriptionNotFound),
            5002 => Ok(ErrorCode::InvalidSubscriptionTransition),
            5003 => Ok(ErrorCode::PaymentsProviderError),
            5004 => Ok(ErrorCode::CommerceProviderError),
            5005 => Ok(ErrorCode::WebhookSignatureInvalid),
            5006 => Ok(ErrorCode::WebhookPayloadInvalid),
            5007 => Ok(ErrorCode::UnknownPlan),

            // Sync
            6001 => Ok(ErrorCode::SyncAlreadyRunning),
            6002 => Ok(ErrorCode::SyncFailed),
            6003 => Ok(ErrorCode::CustomerNotFound),

            // System
            9001 => Ok(ErrorCode::InternalError),
            9002 => Ok(ErrorCode::RecordStoreError),
            9003 => Ok(ErrorCode::ConfigError),
            9004 => Ok(ErrorCode::UpstreamError),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

//! Provider webhook receivers
//!
//! Both take the raw body so the signature can be checked before the payload
//! is parsed or logged. A processing failure is returned as an error status
//! so the provider redelivers; the redelivery reuses the unprocessed log row.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use serde::Serialize;
use serde_json::Value;
use shared::error::{ApiResponse, AppError, ErrorCode};

use crate::store::webhook_logs::WebhookSource;
use crate::webhook::{self, WebhookOutcome};
use crate::{commerce as commerce_api, payments as payments_api};
use crate::state::AppState;

use super::ApiResult;

#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub event_id: String,
    pub outcome: WebhookOutcome,
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn signature_error(reason: &str) -> AppError {
    tracing::warn!(reason, "Webhook signature verification failed");
    AppError::with_message(ErrorCode::WebhookSignatureInvalid, reason)
}

fn parse_json(body: &[u8]) -> Result<Value, AppError> {
    serde_json::from_slice(body).map_err(|e| {
        tracing::warn!(error = %e, "Failed to parse webhook JSON");
        AppError::with_message(ErrorCode::WebhookPayloadInvalid, e.to_string())
    })
}

/// POST /webhooks/payments
pub async fn payments(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<WebhookAck> {
    let secret = state.settings.read().await.payments.webhook_secret.clone();
    let sig_header = header(&headers, payments_api::SIGNATURE_HEADER)
        .ok_or_else(|| signature_error("Missing signature header"))?;
    payments_api::verify_webhook_signature(&body, sig_header, &secret).map_err(signature_error)?;

    let event = parse_json(&body)?;
    let event_type = event["type"].as_str().unwrap_or_default().to_string();
    let event_id = event["id"]
        .as_str()
        .map(String::from)
        .ok_or_else(|| AppError::with_message(ErrorCode::WebhookPayloadInvalid, "Event missing id"))?;
    tracing::info!(event_id = %event_id, event_type = %event_type, "Received payments webhook");

    let ctx = state.reconciler().await;
    let outcome =
        webhook::process(&ctx, WebhookSource::Payments, &event_id, &event_type, &event).await?;
    Ok(ApiResponse::success(WebhookAck { event_id, outcome }))
}

/// POST /webhooks/commerce
pub async fn commerce(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<WebhookAck> {
    let secret = state.settings.read().await.commerce.webhook_secret.clone();
    let hmac = header(&headers, commerce_api::HMAC_HEADER)
        .ok_or_else(|| signature_error("Missing HMAC header"))?;
    commerce_api::verify_webhook_hmac(&body, hmac, &secret).map_err(signature_error)?;

    let topic = header(&headers, commerce_api::TOPIC_HEADER)
        .ok_or_else(|| AppError::with_message(ErrorCode::WebhookPayloadInvalid, "Missing topic header"))?
        .to_string();
    let payload = parse_json(&body)?;
    let event_id = crate::webhook::commerce::event_id(
        header(&headers, commerce_api::WEBHOOK_ID_HEADER),
        &topic,
        &payload,
    );
    tracing::info!(event_id = %event_id, topic = %topic, "Received storefront webhook");

    let ctx = state.reconciler().await;
    let outcome =
        webhook::process(&ctx, WebhookSource::Commerce, &event_id, &topic, &payload).await?;
    Ok(ApiResponse::success(WebhookAck { event_id, outcome }))
}

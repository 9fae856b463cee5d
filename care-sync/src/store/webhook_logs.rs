//! Webhook delivery log
//!
//! One collection per provider, keyed by the provider's event id. The log is
//! what makes webhook processing idempotent: a delivery whose row is already
//! `processed` is acknowledged without running its handler again.

use serde_json::{Value, json};
use shared::models::WebhookLog;
use shared::util::now_millis;

use super::{Collection, Filter, RecordStore, create_as, list_as, update_as};
use crate::error::ProviderResult;

/// Webhook source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookSource {
    Payments,
    Commerce,
}

impl WebhookSource {
    pub fn collection(&self) -> Collection {
        match self {
            Self::Payments => Collection::PaymentsWebhookLogs,
            Self::Commerce => Collection::CommerceWebhookLogs,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Payments => "payments",
            Self::Commerce => "commerce",
        }
    }
}

/// Result of logging a delivery
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    /// First time this event id is seen
    New(WebhookLog),
    /// Seen before but never processed successfully
    Retry(WebhookLog),
    /// Already processed; skip
    AlreadyProcessed(WebhookLog),
}

impl Delivery {
    pub fn log(&self) -> &WebhookLog {
        match self {
            Self::New(log) | Self::Retry(log) | Self::AlreadyProcessed(log) => log,
        }
    }
}

pub async fn find(
    store: &dyn RecordStore,
    source: WebhookSource,
    external_event_id: &str,
) -> ProviderResult<Option<WebhookLog>> {
    let found: Vec<WebhookLog> = list_as(
        store,
        source.collection(),
        &Filter::eq("external_event_id", external_event_id),
    )
    .await?;
    Ok(found.into_iter().next())
}

/// Lookup-or-insert the log row for a delivery
pub async fn record(
    store: &dyn RecordStore,
    source: WebhookSource,
    external_event_id: &str,
    event_type: &str,
    payload: &Value,
) -> ProviderResult<Delivery> {
    if let Some(existing) = find(store, source, external_event_id).await? {
        return Ok(if existing.processed {
            Delivery::AlreadyProcessed(existing)
        } else {
            Delivery::Retry(existing)
        });
    }

    let log = create_as(
        store,
        source.collection(),
        &json!({
            "external_event_id": external_event_id,
            "type": event_type,
            "payload": payload,
            "processed": false,
            "received_at": now_millis(),
        }),
    )
    .await?;
    Ok(Delivery::New(log))
}

pub async fn mark_processed(
    store: &dyn RecordStore,
    source: WebhookSource,
    id: &str,
) -> ProviderResult<WebhookLog> {
    update_as(
        store,
        source.collection(),
        id,
        json!({
            "processed": true,
            "error": null,
            "processed_at": now_millis(),
        }),
    )
    .await
}

/// Record the failure; the row stays unprocessed so a redelivery retries it
pub async fn mark_failed(
    store: &dyn RecordStore,
    source: WebhookSource,
    id: &str,
    error: &str,
) -> ProviderResult<WebhookLog> {
    update_as(store, source.collection(), id, json!({ "error": error })).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryRecordStore;

    #[tokio::test]
    async fn test_record_is_lookup_or_insert() {
        let store = MemoryRecordStore::new();
        let payload = json!({"id": "evt_1"});

        let first = record(&store, WebhookSource::Payments, "evt_1", "invoice.paid", &payload)
            .await
            .unwrap();
        assert!(matches!(first, Delivery::New(_)));

        let again = record(&store, WebhookSource::Payments, "evt_1", "invoice.paid", &payload)
            .await
            .unwrap();
        assert!(matches!(again, Delivery::Retry(_)));

        mark_processed(&store, WebhookSource::Payments, &first.log().id)
            .await
            .unwrap();
        let done = record(&store, WebhookSource::Payments, "evt_1", "invoice.paid", &payload)
            .await
            .unwrap();
        assert!(matches!(done, Delivery::AlreadyProcessed(_)));

        assert_eq!(store.count(Collection::PaymentsWebhookLogs).await, 1);
        assert_eq!(store.count(Collection::CommerceWebhookLogs).await, 0);
    }

    #[tokio::test]
    async fn test_failed_delivery_keeps_error() {
        let store = MemoryRecordStore::new();
        let d = record(&store, WebhookSource::Commerce, "w1", "orders/create", &Value::Null)
            .await
            .unwrap();
        let failed = mark_failed(&store, WebhookSource::Commerce, &d.log().id, "store down")
            .await
            .unwrap();
        assert!(!failed.processed);
        assert_eq!(failed.error.as_deref(), Some("store down"));
    }
}

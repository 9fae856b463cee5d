//! Webhook ingestion
//!
//! Every delivery is logged by its provider event id before anything else
//! happens. A delivery whose log row is already processed is acknowledged
//! without effect; an unprocessed row (earlier failure or crash) is reused
//! and the handler runs again. Handlers are upserts, so rerunning one is
//! safe.

pub mod commerce;
pub mod payments;

use serde::Serialize;
use serde_json::{Value, json};
use shared::models::{SyncService, SyncType};

use crate::error::ServiceResult;
use crate::reconcile::Reconciler;
use crate::store::sync_history;
use crate::store::webhook_logs::{self, Delivery, WebhookSource};

/// What happened to a delivery
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WebhookOutcome {
    /// Handler ran and applied effects
    Processed,
    /// Event type/topic has no handler; logged and acknowledged
    Ignored,
    /// Already processed earlier; no effect
    Duplicate,
}

/// Log, dedupe, dispatch and finalize one delivery
pub async fn process(
    ctx: &Reconciler,
    source: WebhookSource,
    event_id: &str,
    event_type: &str,
    payload: &Value,
) -> ServiceResult<WebhookOutcome> {
    let store = ctx.store();
    let delivery = webhook_logs::record(store, source, event_id, event_type, payload).await?;
    if let Delivery::AlreadyProcessed(_) = delivery {
        tracing::info!(source = source.as_str(), event_id, event_type, "Duplicate webhook delivery, skipping");
        return Ok(WebhookOutcome::Duplicate);
    }
    if let Delivery::Retry(_) = delivery {
        tracing::info!(source = source.as_str(), event_id, event_type, "Retrying unprocessed webhook delivery");
    }
    let log_id = delivery.log().id.clone();

    let service = match source {
        WebhookSource::Payments => SyncService::Payments,
        WebhookSource::Commerce => SyncService::Commerce,
    };
    let history = match sync_history::start(
        store,
        service,
        SyncType::Webhook,
        json!({ "event_id": event_id, "type": event_type }),
    )
    .await
    {
        Ok(row) => Some(row),
        Err(e) => {
            tracing::warn!(event_id, error = %e, "Failed to open sync history for webhook");
            None
        }
    };

    let result = match source {
        WebhookSource::Payments => payments::handle(ctx, event_type, payload).await,
        WebhookSource::Commerce => commerce::handle(ctx, event_type, payload).await,
    };

    match result {
        Ok(handled) => {
            webhook_logs::mark_processed(store, source, &log_id).await?;
            let outcome = if handled {
                WebhookOutcome::Processed
            } else {
                WebhookOutcome::Ignored
            };
            if let Some(row) = history {
                let details = json!({ "event_id": event_id, "type": event_type, "outcome": outcome });
                if let Err(e) = sync_history::complete(store, &row.id, details).await {
                    tracing::error!(history_id = %row.id, error = %e, "Failed to finalize sync history");
                }
            }
            tracing::info!(source = source.as_str(), event_id, event_type, ?outcome, "Webhook processed");
            Ok(outcome)
        }
        Err(e) => {
            let message = e.to_string();
            tracing::error!(source = source.as_str(), event_id, event_type, error = %message, "Webhook processing failed");
            if let Err(log_err) = webhook_logs::mark_failed(store, source, &log_id, &message).await {
                tracing::error!(event_id, error = %log_err, "Failed to record webhook failure");
            }
            if let Some(row) = history {
                if let Err(finalize) = sync_history::fail(store, &row.id, &message).await {
                    tracing::error!(history_id = %row.id, error = %finalize, "Failed to finalize sync history");
                }
            }
            Err(e)
        }
    }
}

/// `data.object` of a payments event
pub(crate) fn event_object(payload: &Value) -> Option<&Value> {
    payload.get("data").and_then(|d| d.get("object"))
}

//! Sync history rows
//!
//! A row is inserted as `started` and finalized once with
//! `completed` or `failed`.

use serde_json::{Value, json};
use shared::models::{SyncHistory, SyncService, SyncType};
use shared::util::now_millis;

use super::{Collection, Filter, RecordStore, create_as, list_as, update_as};
use crate::error::ProviderResult;

pub async fn start(
    store: &dyn RecordStore,
    service: SyncService,
    sync_type: SyncType,
    details: Value,
) -> ProviderResult<SyncHistory> {
    create_as(
        store,
        Collection::SyncHistory,
        &json!({
            "service": service,
            "type": sync_type,
            "status": "started",
            "details": details,
            "started_at": now_millis(),
        }),
    )
    .await
}

pub async fn complete(store: &dyn RecordStore, id: &str, details: Value) -> ProviderResult<SyncHistory> {
    update_as(
        store,
        Collection::SyncHistory,
        id,
        json!({
            "status": "completed",
            "details": details,
            "completed_at": now_millis(),
        }),
    )
    .await
}

pub async fn fail(store: &dyn RecordStore, id: &str, error: &str) -> ProviderResult<SyncHistory> {
    update_as(
        store,
        Collection::SyncHistory,
        id,
        json!({
            "status": "failed",
            "error": error,
            "completed_at": now_millis(),
        }),
    )
    .await
}

/// Most recent rows first
pub async fn list_recent(store: &dyn RecordStore, limit: usize) -> ProviderResult<Vec<SyncHistory>> {
    let mut rows: Vec<SyncHistory> = list_as(store, Collection::SyncHistory, &Filter::all()).await?;
    rows.sort_by(|a, b| b.started_at.cmp(&a.started_at).then_with(|| b.id.cmp(&a.id)));
    rows.truncate(limit);
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryRecordStore;
    use shared::models::SyncStatus;

    #[tokio::test]
    async fn test_start_then_finalize() {
        let store = MemoryRecordStore::new();
        let row = start(&store, SyncService::All, SyncType::FullSync, Value::Null)
            .await
            .unwrap();
        assert_eq!(row.status, SyncStatus::Started);
        assert!(row.completed_at.is_none());

        let done = complete(&store, &row.id, json!({"customers": {"synced": 3}}))
            .await
            .unwrap();
        assert_eq!(done.status, SyncStatus::Completed);
        assert!(done.completed_at.is_some());

        let other = start(&store, SyncService::Payments, SyncType::Webhook, Value::Null)
            .await
            .unwrap();
        let failed = fail(&store, &other.id, "boom").await.unwrap();
        assert_eq!(failed.status, SyncStatus::Failed);
        assert_eq!(failed.error.as_deref(), Some("boom"));

        assert_eq!(list_recent(&store, 1).await.unwrap().len(), 1);
    }
}

//! Sync history and webhook log models

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Which provider a sync run or webhook concerns
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SyncService {
    Payments,
    Commerce,
    All,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SyncType {
    FullSync,
    PartialSync,
    Webhook,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Started,
    Completed,
    Failed,
}

/// Append-only audit row; inserted as `started`, finalized exactly once
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SyncHistory {
    pub id: String,
    pub service: SyncService,
    #[serde(rename = "type")]
    pub sync_type: SyncType,
    pub status: SyncStatus,
    #[serde(default)]
    pub details: Value,
    #[serde(default)]
    pub error: Option<String>,
    pub started_at: i64,
    #[serde(default)]
    pub completed_at: Option<i64>,
}

/// Inbound webhook delivery, keyed by the provider's event id
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WebhookLog {
    pub id: String,
    pub external_event_id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub payload: Value,
    pub processed: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub received_at: i64,
    #[serde(default)]
    pub processed_at: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_history_wire_names() {
        let row = SyncHistory {
            id: "h1".into(),
            service: SyncService::All,
            sync_type: SyncType::FullSync,
            status: SyncStatus::Started,
            details: Value::Null,
            error: None,
            started_at: 1,
            completed_at: None,
        };
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["type"], "full_sync");
        assert_eq!(json["service"], "all");
        assert_eq!(json["status"], "started");
    }
}

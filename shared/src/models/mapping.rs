//! Entity Mapping Model
//!
//! Correlates one local record with its counterpart ids in the payments and
//! commerce providers. One row per `(entity_type, local_id)`.

use serde::{Deserialize, Serialize};

use crate::util::DAY_MS;

/// Mappings older than this are reported as stale
pub const STALE_AFTER_MS: i64 = 7 * DAY_MS;

/// Kind of entity a mapping correlates
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Customer,
    Product,
    Subscription,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Product => "product",
            Self::Subscription => "subscription",
        }
    }
}

/// Entity mapping row
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EntityMapping {
    pub id: String,
    pub entity_type: EntityType,
    pub local_id: String,
    #[serde(default)]
    pub payments_id: Option<String>,
    #[serde(default)]
    pub commerce_id: Option<String>,
    /// Last time the mapping was confirmed (Unix millis)
    pub last_synced: i64,
}

impl EntityMapping {
    /// A mapping is stale once `last_synced` is more than 7 days behind `now`
    pub fn is_stale(&self, now: i64) -> bool {
        now - self.last_synced > STALE_AFTER_MS
    }
}

//! Reconciliation engine
//!
//! Detects and repairs divergence between the record store and the two
//! providers. Every batch operation is continue-on-error: one item's failure
//! lands in the report's `errors` and the batch carries on.

mod conflicts;
pub mod guard;
mod resolve;
pub mod scheduler;
mod sync;

use std::sync::Arc;

use serde::Serialize;
use shared::models::EntityType;

use crate::commerce::CommerceApi;
use crate::payments::PaymentsApi;
use crate::plans::PlanCatalog;
use crate::store::RecordStore;

pub use guard::SingleFlight;
pub use scheduler::AutoSync;

/// Store and provider clients for one run
#[derive(Clone)]
pub struct Reconciler {
    store: Arc<dyn RecordStore>,
    payments: Arc<dyn PaymentsApi>,
    commerce: Arc<dyn CommerceApi>,
    plans: Arc<PlanCatalog>,
}

impl Reconciler {
    pub fn new(
        store: Arc<dyn RecordStore>,
        payments: Arc<dyn PaymentsApi>,
        commerce: Arc<dyn CommerceApi>,
        plans: Arc<PlanCatalog>,
    ) -> Self {
        Self {
            store,
            payments,
            commerce,
            plans,
        }
    }

    pub fn store(&self) -> &dyn RecordStore {
        self.store.as_ref()
    }

    pub fn payments(&self) -> &dyn PaymentsApi {
        self.payments.as_ref()
    }

    pub fn commerce(&self) -> &dyn CommerceApi {
        self.commerce.as_ref()
    }

    pub fn plans(&self) -> &PlanCatalog {
        &self.plans
    }
}

// ========== Reports ==========

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DuplicateEmail {
    pub email: String,
    pub customer_ids: Vec<String>,
}

/// Customer carrying an external id without a customer mapping
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MissingMapping {
    pub customer_id: String,
    pub payments_customer_id: Option<String>,
    pub commerce_customer_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StaleMapping {
    pub mapping_id: String,
    pub entity_type: EntityType,
    pub local_id: String,
    pub last_synced: i64,
}

/// Mapping whose local entity no longer exists (merged away or deleted)
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct OrphanedMapping {
    pub mapping_id: String,
    pub entity_type: EntityType,
    pub local_id: String,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct ConflictReport {
    pub duplicate_emails: Vec<DuplicateEmail>,
    pub missing_mappings: Vec<MissingMapping>,
    pub stale_data: Vec<StaleMapping>,
    pub orphaned_mappings: Vec<OrphanedMapping>,
}

impl ConflictReport {
    /// Orphaned mappings are listed for operators only and never repaired,
    /// so they do not count here.
    pub fn is_empty(&self) -> bool {
        self.duplicate_emails.is_empty()
            && self.missing_mappings.is_empty()
            && self.stale_data.is_empty()
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct ResolveReport {
    pub merged_duplicates: usize,
    pub created_mappings: usize,
    pub refreshed_stale: usize,
    pub cleaned_orphans: usize,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct CustomerSyncReport {
    pub synced: usize,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct PaymentsSyncReport {
    pub synced: usize,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct CommerceSyncReport {
    pub products: usize,
    pub customers: usize,
    /// Trade-in codes redeemed from order history
    pub redeemed: usize,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct FullSyncReport {
    pub customers: CustomerSyncReport,
    pub payments: PaymentsSyncReport,
    pub commerce: CommerceSyncReport,
}

//! Conflict scan
//!
//! Read-only and local: only the record store is consulted, so a scan works
//! while either provider is down.

use std::collections::{BTreeMap, HashSet};

use shared::models::EntityType;
use shared::util::now_millis;

use super::{
    ConflictReport, DuplicateEmail, MissingMapping, OrphanedMapping, Reconciler, StaleMapping,
};
use crate::error::ProviderResult;
use crate::store::{customers, mappings, products, subscriptions};

impl Reconciler {
    pub async fn check_for_conflicts(&self) -> ProviderResult<ConflictReport> {
        self.check_for_conflicts_at(now_millis()).await
    }

    pub async fn check_for_conflicts_at(&self, now: i64) -> ProviderResult<ConflictReport> {
        let all_customers = customers::list(self.store()).await?;
        let all_mappings = mappings::list(self.store()).await?;
        let subscription_ids: HashSet<String> = subscriptions::list(self.store())
            .await?
            .into_iter()
            .map(|s| s.id)
            .collect();
        let product_ids: HashSet<String> = products::list(self.store())
            .await?
            .into_iter()
            .map(|p| p.id)
            .collect();
        let customer_ids: HashSet<&str> = all_customers.iter().map(|c| c.id.as_str()).collect();
        let exists = |entity_type: EntityType, local_id: &str| match entity_type {
            EntityType::Customer => customer_ids.contains(local_id),
            EntityType::Subscription => subscription_ids.contains(local_id),
            EntityType::Product => product_ids.contains(local_id),
        };

        let mut by_email: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for customer in &all_customers {
            let ids = by_email.entry(customer.email_key()).or_default();
            if !ids.contains(&customer.id) {
                ids.push(customer.id.clone());
            }
        }
        let duplicate_emails = by_email
            .into_iter()
            .filter(|(email, ids)| !email.is_empty() && ids.len() >= 2)
            .map(|(email, customer_ids)| DuplicateEmail {
                email,
                customer_ids,
            })
            .collect();

        let mapped: HashSet<&str> = all_mappings
            .iter()
            .filter(|m| m.entity_type == EntityType::Customer)
            .map(|m| m.local_id.as_str())
            .collect();
        let missing_mappings = all_customers
            .iter()
            .filter(|c| c.has_external_ids() && !mapped.contains(c.id.as_str()))
            .map(|c| MissingMapping {
                customer_id: c.id.clone(),
                payments_customer_id: c.payments_customer_id.clone(),
                commerce_customer_id: c.commerce_customer_id.clone(),
            })
            .collect();

        // No sync pass can refresh a mapping whose entity is gone
        let (live, orphaned): (Vec<_>, Vec<_>) = all_mappings
            .iter()
            .partition(|m| exists(m.entity_type, m.local_id.as_str()));
        let stale_data = live
            .into_iter()
            .filter(|m| m.is_stale(now))
            .map(|m| StaleMapping {
                mapping_id: m.id.clone(),
                entity_type: m.entity_type,
                local_id: m.local_id.clone(),
                last_synced: m.last_synced,
            })
            .collect();
        let orphaned_mappings = orphaned
            .into_iter()
            .map(|m| OrphanedMapping {
                mapping_id: m.id.clone(),
                entity_type: m.entity_type,
                local_id: m.local_id.clone(),
            })
            .collect();

        let report = ConflictReport {
            duplicate_emails,
            missing_mappings,
            stale_data,
            orphaned_mappings,
        };
        tracing::info!(
            duplicate_emails = report.duplicate_emails.len(),
            missing_mappings = report.missing_mappings.len(),
            stale = report.stale_data.len(),
            orphaned_mappings = report.orphaned_mappings.len(),
            "Conflict scan finished"
        );
        Ok(report)
    }
}

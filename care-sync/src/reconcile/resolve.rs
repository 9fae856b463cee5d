//! Conflict resolution and duplicate merge

use shared::models::{Customer, EntityType};
use shared::util::now_millis;

use super::{Reconciler, ResolveReport, StaleMapping};
use crate::error::{ProviderError, ProviderResult};
use crate::store::{coupons, customers, evaluations, mappings, subscriptions};

/// Newest first; ties broken by id so the survivor is deterministic
fn survivor_order(candidates: &mut [Customer]) {
    candidates.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.id.cmp(&a.id))
    });
}

impl Reconciler {
    /// Repair everything the conflict scan reports, plus orphaned storefront
    /// price rules. Running it twice is a no-op the second time.
    pub async fn resolve_conflicts(&self) -> ProviderResult<ResolveReport> {
        let conflicts = self.check_for_conflicts().await?;
        let mut report = ResolveReport::default();

        for duplicate in &conflicts.duplicate_emails {
            match self.merge_duplicates(&duplicate.email).await {
                Ok(true) => report.merged_duplicates += 1,
                Ok(false) => {}
                Err(e) => {
                    tracing::error!(email = %duplicate.email, error = %e, "Duplicate merge failed");
                    report
                        .errors
                        .push(format!("merge {}: {e}", duplicate.email));
                }
            }
        }

        for missing in &conflicts.missing_mappings {
            match self.create_customer_mapping(&missing.customer_id).await {
                Ok(true) => report.created_mappings += 1,
                Ok(false) => {}
                Err(e) => {
                    tracing::error!(customer_id = %missing.customer_id, error = %e, "Mapping creation failed");
                    report
                        .errors
                        .push(format!("mapping {}: {e}", missing.customer_id));
                }
            }
        }

        self.refresh_stale(&conflicts.stale_data, &mut report).await;
        self.clean_orphaned_rules(&mut report).await;

        tracing::info!(
            merged = report.merged_duplicates,
            created_mappings = report.created_mappings,
            refreshed_stale = report.refreshed_stale,
            cleaned_orphans = report.cleaned_orphans,
            errors = report.errors.len(),
            "Conflict resolution finished"
        );
        Ok(report)
    }

    /// Merge every customer sharing `email` into the most recently created one.
    ///
    /// The survivor gains any external id it lacks, children of the losers are
    /// moved onto it, its ids are persisted and only then are the losers
    /// deleted. Returns false when there was nothing to merge.
    pub async fn merge_duplicates(&self, email: &str) -> ProviderResult<bool> {
        let mut candidates = customers::find_by_email(self.store(), email).await?;
        if candidates.len() < 2 {
            return Ok(false);
        }
        survivor_order(&mut candidates);
        let mut rest = candidates.into_iter();
        let Some(mut survivor) = rest.next() else {
            return Ok(false);
        };
        let losers: Vec<Customer> = rest.collect();

        let mut gained_payments = None;
        let mut gained_commerce = None;
        for loser in &losers {
            if survivor.payments_customer_id.is_none() && loser.payments_customer_id.is_some() {
                survivor.payments_customer_id = loser.payments_customer_id.clone();
                gained_payments = loser.payments_customer_id.clone();
            }
            if survivor.commerce_customer_id.is_none() && loser.commerce_customer_id.is_some() {
                survivor.commerce_customer_id = loser.commerce_customer_id.clone();
                gained_commerce = loser.commerce_customer_id.clone();
            }
        }

        if gained_payments.is_some() || gained_commerce.is_some() {
            customers::set_external_ids(
                self.store(),
                &survivor.id,
                gained_payments.as_deref(),
                gained_commerce.as_deref(),
            )
            .await?;
        }

        for loser in &losers {
            let store = self.store();
            let moved = subscriptions::reassign_customer(store, &loser.id, &survivor.id).await?
                + evaluations::reassign_customer(store, &loser.id, &survivor.id).await?
                + coupons::reassign_customer(store, &loser.id, &survivor.id).await?;
            customers::delete(store, &loser.id).await?;
            tracing::info!(
                survivor_id = %survivor.id,
                loser_id = %loser.id,
                moved_records = moved,
                "Merged duplicate customer"
            );
        }

        mappings::upsert(
            self.store(),
            EntityType::Customer,
            &survivor.id,
            survivor.payments_customer_id.as_deref(),
            survivor.commerce_customer_id.as_deref(),
            now_millis(),
        )
        .await?;
        Ok(true)
    }

    /// Upsert the customer mapping from the ids on the customer record.
    /// Returns false when the customer no longer exists (merged away).
    async fn create_customer_mapping(&self, customer_id: &str) -> ProviderResult<bool> {
        let Some(customer) = customers::get(self.store(), customer_id).await? else {
            return Ok(false);
        };
        mappings::upsert(
            self.store(),
            EntityType::Customer,
            &customer.id,
            customer.payments_customer_id.as_deref(),
            customer.commerce_customer_id.as_deref(),
            now_millis(),
        )
        .await?;
        Ok(true)
    }

    /// Re-run the sync pass that owns each kind of stale mapping, once per
    /// kind. A mapping counts as refreshed only when its `last_synced` moved.
    async fn refresh_stale(&self, stale: &[StaleMapping], report: &mut ResolveReport) {
        for kind in [EntityType::Customer, EntityType::Subscription, EntityType::Product] {
            let pending: Vec<&StaleMapping> =
                stale.iter().filter(|s| s.entity_type == kind).collect();
            if pending.is_empty() {
                continue;
            }

            let pass = match kind {
                EntityType::Customer => self.sync_customers().await.map(|r| r.errors),
                EntityType::Subscription => self.sync_payments().await.map(|r| r.errors),
                EntityType::Product => self.sync_commerce().await.map(|r| r.errors),
            };
            match pass {
                Ok(errors) => report.errors.extend(errors),
                Err(e) => {
                    report
                        .errors
                        .push(format!("refresh {}s: {e}", kind.as_str()));
                    continue;
                }
            }

            for item in pending {
                match mappings::get(self.store(), kind, &item.local_id).await {
                    Ok(Some(current)) if current.last_synced > item.last_synced => {
                        report.refreshed_stale += 1;
                    }
                    Ok(_) => tracing::warn!(
                        entity_type = kind.as_str(),
                        local_id = %item.local_id,
                        "Stale mapping was not refreshed"
                    ),
                    Err(e) => report
                        .errors
                        .push(format!("mapping {} {}: {e}", kind.as_str(), item.local_id)),
                }
            }
        }
    }

    /// Retry deleting price rules left behind by failed coupon creation
    async fn clean_orphaned_rules(&self, report: &mut ResolveReport) {
        let orphaned = match coupons::list_orphaned(self.store()).await {
            Ok(list) => list,
            Err(e) => {
                report.errors.push(format!("list orphaned coupons: {e}"));
                return;
            }
        };

        for coupon in orphaned {
            let Some(rule_id) = coupon.orphaned_price_rule_id.as_deref() else {
                continue;
            };
            let Ok(numeric_id) = rule_id.parse::<u64>() else {
                report
                    .errors
                    .push(format!("coupon {}: invalid price rule id {rule_id}", coupon.id));
                continue;
            };

            let deleted = match self.commerce().delete_price_rule(numeric_id).await {
                // Already gone counts as cleaned
                Ok(()) | Err(ProviderError::NotFound(_)) => true,
                Err(e) => {
                    tracing::warn!(coupon_id = %coupon.id, price_rule_id = numeric_id, error = %e, "Orphaned price rule cleanup failed");
                    report
                        .errors
                        .push(format!("price rule {numeric_id}: {e}"));
                    false
                }
            };
            if !deleted {
                continue;
            }
            match coupons::update(
                self.store(),
                &coupon.id,
                serde_json::json!({ "orphaned_price_rule_id": null }),
            )
            .await
            {
                Ok(_) => {
                    tracing::info!(coupon_id = %coupon.id, price_rule_id = numeric_id, "Orphaned price rule removed");
                    report.cleaned_orphans += 1;
                }
                Err(e) => report.errors.push(format!("coupon {}: {e}", coupon.id)),
            }
        }
    }
}

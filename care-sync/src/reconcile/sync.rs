//! Sync passes and run bookkeeping

use std::collections::HashMap;

use serde_json::json;
use shared::models::{
    Customer, EntityType, EvaluationStatus, SubscriptionStatus, SyncService,
    SyncType,
};
use shared::util::now_millis;

use super::{
    CommerceSyncReport, CustomerSyncReport, FullSyncReport, PaymentsSyncReport, Reconciler,
};
use crate::error::{ProviderResult, ServiceResult};
use crate::store::{
    coupons, customers, evaluations, mappings, products, subscriptions, sync_history,
};
use crate::tradein;
use crate::webhook::commerce::link_storefront_customer;

impl Reconciler {
    /// Refresh subscription status for customers known to the payments
    /// provider and upsert every customer's mapping.
    pub async fn sync_customers(&self) -> ProviderResult<CustomerSyncReport> {
        let all = customers::list(self.store()).await?;
        let mut report = CustomerSyncReport::default();

        for customer in &all {
            match self.sync_customer(customer).await {
                Ok(()) => report.synced += 1,
                Err(e) => {
                    tracing::warn!(customer_id = %customer.id, error = %e, "Customer sync failed");
                    report.errors.push(format!("customer {}: {e}", customer.id));
                }
            }
        }
        tracing::info!(
            synced = report.synced,
            errors = report.errors.len(),
            "Customer sync finished"
        );
        Ok(report)
    }

    async fn sync_customer(&self, customer: &Customer) -> ProviderResult<()> {
        let now = now_millis();
        if let Some(payments_id) = customer.payments_customer_id.as_deref() {
            for remote in self.payments().list_subscriptions(payments_id).await? {
                let Some(local) = subscriptions::find_by_payments_id(self.store(), &remote.id).await?
                else {
                    continue;
                };
                let target = SubscriptionStatus::from_payments(&remote.status);
                crate::subscriptions::apply_remote_status(self.store(), &local, target, now).await?;
                mappings::upsert(
                    self.store(),
                    EntityType::Subscription,
                    &local.id,
                    Some(&remote.id),
                    None,
                    now,
                )
                .await?;
            }
        }

        mappings::upsert(
            self.store(),
            EntityType::Customer,
            &customer.id,
            customer.payments_customer_id.as_deref(),
            customer.commerce_customer_id.as_deref(),
            now,
        )
        .await?;
        Ok(())
    }

    /// Refresh subscription mappings. Subscriptions whose customer has no
    /// payments id are not covered by the customer pass, so their status is
    /// fetched here one by one.
    pub async fn sync_payments(&self) -> ProviderResult<PaymentsSyncReport> {
        let all_subscriptions = subscriptions::list(self.store()).await?;
        let owners: HashMap<String, Customer> = customers::list(self.store())
            .await?
            .into_iter()
            .map(|c| (c.id.clone(), c))
            .collect();
        let mut report = PaymentsSyncReport::default();

        for subscription in &all_subscriptions {
            let Some(remote_id) = subscription.payments_subscription_id.as_deref() else {
                continue;
            };
            let owner = owners.get(&subscription.customer_id);
            let result: ProviderResult<()> = async {
                let now = now_millis();
                let covered = owner.is_some_and(|c| c.payments_customer_id.is_some());
                if !covered {
                    let remote = self.payments().get_subscription(remote_id).await?;
                    let target = SubscriptionStatus::from_payments(&remote.status);
                    crate::subscriptions::apply_remote_status(self.store(), subscription, target, now)
                        .await?;
                    if let Some(owner) = owner {
                        customers::set_external_ids(self.store(), &owner.id, Some(remote.customer.as_str()), None)
                            .await?;
                    }
                }
                mappings::upsert(
                    self.store(),
                    EntityType::Subscription,
                    &subscription.id,
                    Some(remote_id),
                    None,
                    now,
                )
                .await?;
                Ok(())
            }
            .await;

            match result {
                Ok(()) => report.synced += 1,
                Err(e) => {
                    tracing::warn!(subscription_id = %subscription.id, error = %e, "Subscription sync failed");
                    report
                        .errors
                        .push(format!("subscription {}: {e}", subscription.id));
                }
            }
        }
        Ok(report)
    }

    /// Pull products and customers from the storefront.
    ///
    /// Only a failed product listing fails the pass (nothing has been
    /// applied yet); later listings fail into `errors` and keep the work
    /// already done.
    pub async fn sync_commerce(&self) -> ProviderResult<CommerceSyncReport> {
        let mut report = CommerceSyncReport::default();
        let remote_products = self.commerce().list_products().await?;

        for product in &remote_products {
            let commerce_id = product.id.to_string();
            let result: ProviderResult<()> = async {
                let local = products::upsert_from_commerce(
                    self.store(),
                    &commerce_id,
                    &product.title,
                    product.price(),
                    product.status.as_deref(),
                )
                .await?;
                mappings::upsert(
                    self.store(),
                    EntityType::Product,
                    &local.id,
                    None,
                    Some(&commerce_id),
                    now_millis(),
                )
                .await?;
                Ok(())
            }
            .await;
            match result {
                Ok(()) => report.products += 1,
                Err(e) => report.errors.push(format!("product {commerce_id}: {e}")),
            }
        }

        let remote_customers = match self.commerce().list_customers().await {
            Ok(list) => list,
            Err(e) => {
                tracing::warn!(error = %e, "Storefront customer listing failed");
                report.errors.push(format!("list customers: {e}"));
                Vec::new()
            }
        };
        for remote in &remote_customers {
            match link_storefront_customer(self.store(), remote).await {
                Ok(Some(_)) => report.customers += 1,
                Ok(None) => {}
                Err(e) => report
                    .errors
                    .push(format!("storefront customer {}: {e}", remote.id)),
            }
        }

        // Orders whose webhook never arrived still redeem their trade-in code
        match self.commerce().list_orders().await {
            Ok(orders) => {
                for order in &orders {
                    for discount in &order.discount_codes {
                        match self.catch_up_redemption(&discount.code).await {
                            Ok(true) => report.redeemed += 1,
                            Ok(false) => {}
                            Err(e) => report
                                .errors
                                .push(format!("order {} code {}: {e}", order.id, discount.code)),
                        }
                    }
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Storefront order listing failed");
                report.errors.push(format!("list orders: {e}"));
            }
        }

        tracing::info!(
            products = report.products,
            customers = report.customers,
            redeemed = report.redeemed,
            errors = report.errors.len(),
            "Storefront pull finished"
        );
        Ok(report)
    }

    /// Redeem `code` only when it belongs to an active coupon whose evaluation
    /// is still `approved`; anything else was already handled or never will be.
    async fn catch_up_redemption(&self, code: &str) -> ServiceResult<bool> {
        let Some(coupon) = coupons::find_by_code(self.store(), code).await? else {
            return Ok(false);
        };
        if !coupon.active {
            return Ok(false);
        }
        let linked = match coupon.evaluation_id.as_deref() {
            Some(id) => evaluations::get(self.store(), id).await?,
            None => evaluations::find_by_coupon_code(self.store(), code).await?,
        };
        if !linked.is_some_and(|e| e.status == EvaluationStatus::Approved) {
            return Ok(false);
        }
        let outcome = tradein::redeem_code(self.store(), code, now_millis()).await?;
        if outcome.redeemed {
            tracing::info!(code, "Redeemed trade-in code from storefront order history");
        }
        Ok(outcome.redeemed)
    }

    /// Customers, then payments, then storefront, wrapped in one history row.
    ///
    /// The payments and storefront branches fail independently into their
    /// own error lists; only a customer-pass failure fails the run.
    pub async fn run_full_sync(&self) -> ProviderResult<FullSyncReport> {
        let row = sync_history::start(self.store(), SyncService::All, SyncType::FullSync, json!({}))
            .await?;
        tracing::info!(history_id = %row.id, "Full sync started");

        let customers = match self.sync_customers().await {
            Ok(report) => report,
            Err(e) => {
                tracing::error!(history_id = %row.id, error = %e, "Full sync failed");
                if let Err(finalize) = sync_history::fail(self.store(), &row.id, &e.to_string()).await {
                    tracing::error!(history_id = %row.id, error = %finalize, "Failed to finalize sync history");
                }
                return Err(e);
            }
        };

        let payments = self.sync_payments().await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Payments branch failed");
            PaymentsSyncReport {
                synced: 0,
                errors: vec![e.to_string()],
            }
        });

        let commerce = self.sync_commerce().await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Storefront branch failed");
            CommerceSyncReport {
                errors: vec![e.to_string()],
                ..Default::default()
            }
        });

        let report = FullSyncReport {
            customers,
            payments,
            commerce,
        };
        let details = serde_json::to_value(&report).unwrap_or_default();
        if let Err(e) = sync_history::complete(self.store(), &row.id, details).await {
            tracing::error!(history_id = %row.id, error = %e, "Failed to finalize sync history");
        }
        tracing::info!(history_id = %row.id, "Full sync completed");
        Ok(report)
    }

    /// Customer pass wrapped in a `partial_sync` history row
    pub async fn run_customer_sync(&self) -> ProviderResult<CustomerSyncReport> {
        let row = sync_history::start(
            self.store(),
            SyncService::All,
            SyncType::PartialSync,
            json!({ "scope": "customers" }),
        )
        .await?;

        match self.sync_customers().await {
            Ok(report) => {
                let details = json!({ "scope": "customers", "customers": report });
                if let Err(e) = sync_history::complete(self.store(), &row.id, details).await {
                    tracing::error!(history_id = %row.id, error = %e, "Failed to finalize sync history");
                }
                Ok(report)
            }
            Err(e) => {
                if let Err(finalize) = sync_history::fail(self.store(), &row.id, &e.to_string()).await {
                    tracing::error!(history_id = %row.id, error = %finalize, "Failed to finalize sync history");
                }
                Err(e)
            }
        }
    }
}

//! Shared fakes for integration tests: in-memory payments and storefront
//! clients over `MemoryRecordStore`.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{Value, json};

use care_sync::AppState;
use care_sync::commerce::{
    CommerceApi, DiscountCode, PriceRule, PriceRuleRequest, RemoteCustomer, RemoteOrder,
    RemoteProduct,
};
use care_sync::error::{ProviderError, ProviderResult};
use care_sync::payments::{PaymentLink, PaymentsApi, RemoteSubscription, SubscriptionAction};
use care_sync::plans::PlanCatalog;
use care_sync::providers::{
    ClientFactory, CommerceSettings, PaymentsMode, PaymentsSettings, ProviderSettings,
};
use care_sync::reconcile::Reconciler;
use care_sync::store::{Collection, MemoryRecordStore, RecordStore};

pub const PAYMENTS_WEBHOOK_SECRET: &str = "whsec_test";
pub const COMMERCE_WEBHOOK_SECRET: &str = "shpss_test";

fn unavailable(what: &str) -> ProviderError {
    ProviderError::Api {
        status: 503,
        body: format!("{what} unavailable"),
    }
}

// ========== Payments ==========

#[derive(Default)]
pub struct FakePayments {
    pub subscriptions: Mutex<Vec<RemoteSubscription>>,
    pub fail: AtomicBool,
    pub calls: Mutex<Vec<String>>,
}

impl FakePayments {
    pub fn add_subscription(&self, id: &str, customer: &str, status: &str) {
        self.subscriptions.lock().unwrap().push(RemoteSubscription {
            id: id.into(),
            customer: customer.into(),
            status: status.into(),
            metadata: Default::default(),
            current_period_end: None,
        });
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn check(&self, call: String) -> ProviderResult<()> {
        self.calls.lock().unwrap().push(call);
        if self.fail.load(Ordering::SeqCst) {
            return Err(unavailable("payments"));
        }
        Ok(())
    }
}

#[async_trait]
impl PaymentsApi for FakePayments {
    async fn list_subscriptions(&self, customer_id: &str) -> ProviderResult<Vec<RemoteSubscription>> {
        self.check(format!("list_subscriptions:{customer_id}"))?;
        Ok(self
            .subscriptions
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.customer == customer_id)
            .cloned()
            .collect())
    }

    async fn get_subscription(&self, subscription_id: &str) -> ProviderResult<RemoteSubscription> {
        self.check(format!("get_subscription:{subscription_id}"))?;
        self.subscriptions
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.id == subscription_id)
            .cloned()
            .ok_or_else(|| ProviderError::NotFound(subscription_id.into()))
    }

    async fn update_subscription_status(
        &self,
        subscription_id: &str,
        action: SubscriptionAction,
    ) -> ProviderResult<RemoteSubscription> {
        self.check(format!("update_subscription_status:{subscription_id}:{action:?}"))?;
        let mut subs = self.subscriptions.lock().unwrap();
        let sub = subs
            .iter_mut()
            .find(|s| s.id == subscription_id)
            .ok_or_else(|| ProviderError::NotFound(subscription_id.into()))?;
        sub.status = match action {
            SubscriptionAction::Pause => "paused",
            SubscriptionAction::Resume => "active",
            SubscriptionAction::Cancel => "canceled",
        }
        .into();
        Ok(sub.clone())
    }

    async fn create_payment_link(
        &self,
        price_id: &str,
        _metadata: &[(&str, &str)],
    ) -> ProviderResult<PaymentLink> {
        self.check(format!("create_payment_link:{price_id}"))?;
        Ok(PaymentLink {
            id: "plink_1".into(),
            url: "https://pay.example.com/plink_1".into(),
            active: true,
        })
    }

    async fn update_payment_link(&self, link_id: &str, active: bool) -> ProviderResult<PaymentLink> {
        self.check(format!("update_payment_link:{link_id}:{active}"))?;
        Ok(PaymentLink {
            id: link_id.into(),
            url: format!("https://pay.example.com/{link_id}"),
            active,
        })
    }
}

// ========== Storefront ==========

pub struct FakeCommerce {
    pub products: Mutex<Vec<RemoteProduct>>,
    pub customers: Mutex<Vec<RemoteCustomer>>,
    pub orders: Mutex<Vec<RemoteOrder>>,
    /// Bulk listing fails
    pub fail_list: AtomicBool,
    /// Only the customer listing fails
    pub fail_customers: AtomicBool,
    /// Price rule creation fails
    pub fail_rule: AtomicBool,
    /// Discount code creation fails
    pub fail_code: AtomicBool,
    /// Price rule deletion fails
    pub fail_delete: AtomicBool,
    pub created_rules: Mutex<Vec<PriceRuleRequest>>,
    pub deleted_rules: Mutex<Vec<u64>>,
    pub created_codes: Mutex<Vec<String>>,
    next_id: AtomicU64,
}

impl Default for FakeCommerce {
    fn default() -> Self {
        Self {
            products: Mutex::new(Vec::new()),
            customers: Mutex::new(Vec::new()),
            orders: Mutex::new(Vec::new()),
            fail_list: AtomicBool::new(false),
            fail_customers: AtomicBool::new(false),
            fail_rule: AtomicBool::new(false),
            fail_code: AtomicBool::new(false),
            fail_delete: AtomicBool::new(false),
            created_rules: Mutex::new(Vec::new()),
            deleted_rules: Mutex::new(Vec::new()),
            created_codes: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1000),
        }
    }
}

impl FakeCommerce {
    pub fn add_product(&self, id: u64, title: &str, price: &str) {
        self.products.lock().unwrap().push(
            serde_json::from_value(json!({
                "id": id, "title": title, "status": "active", "variants": [{"price": price}]
            }))
            .unwrap(),
        );
    }

    pub fn add_customer(&self, id: u64, email: &str) {
        self.customers.lock().unwrap().push(RemoteCustomer {
            id,
            email: Some(email.into()),
            first_name: Some("Store".into()),
            last_name: Some("Customer".into()),
        });
    }

    pub fn add_order(&self, id: u64, codes: &[&str]) {
        let discount_codes: Vec<Value> = codes.iter().map(|c| json!({"code": c})).collect();
        self.orders.lock().unwrap().push(
            serde_json::from_value(json!({"id": id, "discount_codes": discount_codes})).unwrap(),
        );
    }

    pub fn deleted_rules(&self) -> Vec<u64> {
        self.deleted_rules.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommerceApi for FakeCommerce {
    async fn list_products(&self) -> ProviderResult<Vec<RemoteProduct>> {
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(unavailable("storefront"));
        }
        Ok(self.products.lock().unwrap().clone())
    }

    async fn list_customers(&self) -> ProviderResult<Vec<RemoteCustomer>> {
        if self.fail_list.load(Ordering::SeqCst) || self.fail_customers.load(Ordering::SeqCst) {
            return Err(unavailable("storefront"));
        }
        Ok(self.customers.lock().unwrap().clone())
    }

    async fn list_orders(&self) -> ProviderResult<Vec<RemoteOrder>> {
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(unavailable("storefront"));
        }
        Ok(self.orders.lock().unwrap().clone())
    }

    async fn create_price_rule(&self, rule: &PriceRuleRequest) -> ProviderResult<PriceRule> {
        if self.fail_rule.load(Ordering::SeqCst) {
            return Err(unavailable("storefront"));
        }
        self.created_rules.lock().unwrap().push(rule.clone());
        Ok(PriceRule {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            title: rule.title.clone(),
        })
    }

    async fn delete_price_rule(&self, price_rule_id: u64) -> ProviderResult<()> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(unavailable("storefront"));
        }
        self.deleted_rules.lock().unwrap().push(price_rule_id);
        Ok(())
    }

    async fn create_discount_code(
        &self,
        price_rule_id: u64,
        code: &str,
    ) -> ProviderResult<DiscountCode> {
        if self.fail_code.load(Ordering::SeqCst) {
            return Err(ProviderError::Api {
                status: 422,
                body: "code rejected".into(),
            });
        }
        self.created_codes.lock().unwrap().push(code.to_string());
        Ok(DiscountCode {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            price_rule_id: Some(price_rule_id),
            code: code.to_string(),
        })
    }
}

// ========== Wiring ==========

pub struct FakeClients {
    pub payments: Arc<FakePayments>,
    pub commerce: Arc<FakeCommerce>,
}

impl ClientFactory for FakeClients {
    fn payments(&self, _settings: &PaymentsSettings) -> Arc<dyn PaymentsApi> {
        self.payments.clone()
    }

    fn commerce(&self, _settings: &CommerceSettings) -> Arc<dyn CommerceApi> {
        self.commerce.clone()
    }
}

pub fn test_settings() -> ProviderSettings {
    ProviderSettings {
        payments: PaymentsSettings {
            mode: PaymentsMode::Test,
            test_secret_key: "sk_test_123".into(),
            live_secret_key: String::new(),
            webhook_secret: PAYMENTS_WEBHOOK_SECRET.into(),
            api_base: "https://api.stripe.com".into(),
        },
        commerce: CommerceSettings {
            shop_domain: "care-test.myshopify.com".into(),
            access_token: "shpat_test".into(),
            api_version: "2024-01".into(),
            webhook_secret: COMMERCE_WEBHOOK_SECRET.into(),
        },
    }
}

/// Everything a test needs, sharing one store and one pair of fakes
pub struct Harness {
    pub store: Arc<MemoryRecordStore>,
    pub payments: Arc<FakePayments>,
    pub commerce: Arc<FakeCommerce>,
    pub state: AppState,
}

impl Harness {
    pub fn new() -> Self {
        let store = Arc::new(MemoryRecordStore::new());
        let payments = Arc::new(FakePayments::default());
        let commerce = Arc::new(FakeCommerce::default());
        let mut plans = PlanCatalog::builtin();
        for (plan, terms) in plans.plans.iter_mut() {
            terms.payments_price_id = Some(format!("price_{}", plan.as_str()));
        }
        let state = AppState::from_parts(
            store.clone(),
            test_settings(),
            Arc::new(FakeClients {
                payments: payments.clone(),
                commerce: commerce.clone(),
            }),
            plans,
        );
        Self {
            store,
            payments,
            commerce,
            state,
        }
    }

    pub async fn reconciler(&self) -> Reconciler {
        self.state.reconciler().await
    }

    pub fn store(&self) -> &dyn RecordStore {
        self.store.as_ref()
    }

    /// Insert a raw document with a fixed id
    pub async fn insert(&self, collection: Collection, doc: Value) -> Value {
        self.store.create(collection, doc).await.unwrap()
    }

    pub async fn insert_customer(
        &self,
        id: &str,
        email: &str,
        created_at: i64,
        payments_customer_id: Option<&str>,
    ) {
        self.insert(
            Collection::Customers,
            json!({
                "id": id,
                "email": email,
                "first_name": "Test",
                "last_name": id,
                "payments_customer_id": payments_customer_id,
                "created_at": created_at,
            }),
        )
        .await;
    }

    pub async fn all(&self, collection: Collection) -> Vec<Value> {
        self.store
            .list(collection, &care_sync::store::Filter::all())
            .await
            .unwrap()
    }
}

//! Versioned plan catalog
//!
//! Pricing and service entitlements are copied onto a subscription when it is
//! created, together with the catalog version. Changing the catalog affects
//! new subscriptions only; existing ones keep their creation-time terms.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use shared::models::{BillingInterval, Plan, Pricing, Services};

use crate::error::BoxError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlanTerms {
    pub pricing: Pricing,
    pub services: Services,
    /// Payments-provider price used for payment links
    #[serde(default)]
    pub payments_price_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlanCatalog {
    pub version: u32,
    pub plans: HashMap<Plan, PlanTerms>,
}

fn terms(amount: f64, cleanings: u32, inspections: u32, protection: bool, trade_in: bool) -> PlanTerms {
    PlanTerms {
        pricing: Pricing {
            amount,
            currency: "USD".into(),
            interval: BillingInterval::Month,
        },
        services: Services {
            cleanings,
            inspections,
            protection,
            trade_in,
        },
        payments_price_id: None,
    }
}

impl PlanCatalog {
    /// Built-in catalog (version 1)
    pub fn builtin() -> Self {
        let plans = HashMap::from([
            (Plan::Basic, terms(29.0, 2, 1, false, false)),
            (Plan::Premium, terms(49.0, 4, 2, true, false)),
            (Plan::Elite, terms(79.0, 6, 4, true, true)),
        ]);
        Self { version: 1, plans }
    }

    /// Load a catalog from a JSON file; every plan must be present
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, BoxError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read plan catalog {}: {e}", path.display()))?;
        let catalog: Self = serde_json::from_str(&raw)
            .map_err(|e| format!("Invalid plan catalog {}: {e}", path.display()))?;
        for plan in [Plan::Basic, Plan::Premium, Plan::Elite] {
            if !catalog.plans.contains_key(&plan) {
                return Err(format!("Plan catalog is missing plan `{}`", plan.as_str()).into());
            }
        }
        Ok(catalog)
    }

    pub fn terms(&self, plan: Plan) -> Option<&PlanTerms> {
        self.plans.get(&plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_builtin_entitlements() {
        let catalog = PlanCatalog::builtin();
        let elite = catalog.terms(Plan::Elite).unwrap();
        assert!(elite.services.trade_in);
        assert_eq!(elite.services.cleanings, 6);
        let basic = catalog.terms(Plan::Basic).unwrap();
        assert!(!basic.services.protection);
        assert_eq!(basic.pricing.amount, 29.0);
    }

    #[test]
    fn test_load_from_file() {
        let mut catalog = PlanCatalog::builtin();
        catalog.version = 3;
        catalog
            .plans
            .entry(Plan::Premium)
            .and_modify(|t| t.payments_price_id = Some("price_premium".into()));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", serde_json::to_string(&catalog).unwrap()).unwrap();

        let loaded = PlanCatalog::from_json_file(file.path()).unwrap();
        assert_eq!(loaded.version, 3);
        assert_eq!(
            loaded.terms(Plan::Premium).unwrap().payments_price_id.as_deref(),
            Some("price_premium")
        );
    }

    #[test]
    fn test_missing_plan_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"version": 2, "plans": {{}}}}"#).unwrap();
        assert!(PlanCatalog::from_json_file(file.path()).is_err());
    }
}

//! Coupon Model

use serde::{Deserialize, Serialize};

/// How a coupon's value is applied at checkout
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    #[default]
    FixedAmount,
    Percentage,
}

impl ValueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FixedAmount => "fixed_amount",
            Self::Percentage => "percentage",
        }
    }
}

fn default_usage_limit() -> u32 {
    1
}

/// Local coupon record; the source of truth for promised credit
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Coupon {
    pub id: String,
    pub code: String,
    #[serde(default)]
    pub evaluation_id: Option<String>,
    #[serde(default)]
    pub customer_id: Option<String>,
    pub value: f64,
    #[serde(default)]
    pub value_type: ValueType,
    pub active: bool,
    #[serde(default)]
    pub usage_count: u32,
    #[serde(default = "default_usage_limit")]
    pub usage_limit: u32,
    #[serde(default)]
    pub expires_at: Option<i64>,
    /// Operator-facing notes; remote failures are appended here
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub commerce_price_rule_id: Option<String>,
    #[serde(default)]
    pub commerce_discount_code_id: Option<String>,
    /// Price rule left behind by a failed coupon creation
    #[serde(default)]
    pub orphaned_price_rule_id: Option<String>,
    #[serde(default)]
    pub created_at: i64,
}

impl Coupon {
    /// Apply one redemption; returns true when the limit was just reached
    pub fn record_use(&mut self) -> bool {
        self.usage_count += 1;
        if self.usage_count >= self.usage_limit {
            let was_active = self.active;
            self.active = false;
            return was_active;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coupon(limit: u32) -> Coupon {
        Coupon {
            id: "cp1".into(),
            code: "TRADEIN-X".into(),
            evaluation_id: None,
            customer_id: None,
            value: 600.0,
            value_type: ValueType::FixedAmount,
            active: true,
            usage_count: 0,
            usage_limit: limit,
            expires_at: None,
            description: None,
            commerce_price_rule_id: None,
            commerce_discount_code_id: None,
            orphaned_price_rule_id: None,
            created_at: 0,
        }
    }

    #[test]
    fn test_single_use_deactivates() {
        let mut c = coupon(1);
        assert!(c.record_use());
        assert!(!c.active);
        assert_eq!(c.usage_count, 1);
    }

    #[test]
    fn test_multi_use_stays_active() {
        let mut c = coupon(3);
        assert!(!c.record_use());
        assert!(!c.record_use());
        assert!(c.active);
        assert!(c.record_use());
        assert!(!c.active);
    }

    #[test]
    fn test_usage_limit_defaults_to_one() {
        let c: Coupon = serde_json::from_value(serde_json::json!({
            "id": "cp1", "code": "X", "value": 10.0, "active": true
        }))
        .unwrap();
        assert_eq!(c.usage_limit, 1);
        assert_eq!(c.value_type, ValueType::FixedAmount);
    }
}

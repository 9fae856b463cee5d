//! Subscription Model

use serde::{Deserialize, Serialize};

/// Subscription plan tier
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Plan {
    Basic,
    Premium,
    Elite,
}

impl Plan {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Premium => "premium",
            Self::Elite => "elite",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "basic" => Some(Self::Basic),
            "premium" => Some(Self::Premium),
            "elite" => Some(Self::Elite),
            _ => None,
        }
    }
}

/// Subscription lifecycle status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Inactive,
    Paused,
    Cancelled,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Paused => "paused",
            Self::Cancelled => "cancelled",
        }
    }

    /// `cancelled` is terminal; every other status may move anywhere else.
    pub fn can_transition_to(&self, target: SubscriptionStatus) -> bool {
        *self != Self::Cancelled && *self != target
    }

    /// Map a payments-provider subscription status onto the local one
    pub fn from_payments(status: &str) -> Self {
        match status {
            "active" | "trialing" => Self::Active,
            "paused" => Self::Paused,
            "canceled" | "cancelled" | "incomplete_expired" => Self::Cancelled,
            // past_due, unpaid, incomplete
            _ => Self::Inactive,
        }
    }
}

/// Billing interval
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum BillingInterval {
    #[default]
    Month,
    Year,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Pricing {
    pub amount: f64,
    pub currency: String,
    pub interval: BillingInterval,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Billing {
    /// e.g. "card", "manual"
    #[serde(default)]
    pub method: String,
    /// Last successful payment (Unix millis)
    #[serde(default)]
    pub last_payment: Option<i64>,
    #[serde(default)]
    pub payment_link_id: Option<String>,
    #[serde(default)]
    pub payment_link_url: Option<String>,
}

/// Service entitlements granted by the plan at creation time
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Services {
    pub cleanings: u32,
    pub inspections: u32,
    pub protection: bool,
    pub trade_in: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Credits {
    pub cleanings_used: u32,
    pub inspections_used: u32,
}

/// Subscription record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Subscription {
    pub id: String,
    pub customer_id: String,
    pub plan: Plan,
    pub status: SubscriptionStatus,
    pub pricing: Pricing,
    #[serde(default)]
    pub billing: Billing,
    pub services: Services,
    #[serde(default)]
    pub credits: Credits,
    /// Plan catalog version the pricing and services were taken from
    #[serde(default)]
    pub plan_version: u32,
    #[serde(default)]
    pub payments_subscription_id: Option<String>,
    /// Unix millis
    pub start_date: i64,
    #[serde(default)]
    pub paused_at: Option<i64>,
    #[serde(default)]
    pub cancelled_at: Option<i64>,
    #[serde(default)]
    pub created_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancelled_is_terminal() {
        assert!(!SubscriptionStatus::Cancelled.can_transition_to(SubscriptionStatus::Active));
        assert!(SubscriptionStatus::Paused.can_transition_to(SubscriptionStatus::Active));
        assert!(SubscriptionStatus::Active.can_transition_to(SubscriptionStatus::Cancelled));
        assert!(!SubscriptionStatus::Active.can_transition_to(SubscriptionStatus::Active));
    }

    #[test]
    fn test_payments_status_mapping() {
        assert_eq!(
            SubscriptionStatus::from_payments("trialing"),
            SubscriptionStatus::Active
        );
        assert_eq!(
            SubscriptionStatus::from_payments("canceled"),
            SubscriptionStatus::Cancelled
        );
        assert_eq!(
            SubscriptionStatus::from_payments("past_due"),
            SubscriptionStatus::Inactive
        );
    }

    #[test]
    fn test_plan_parse() {
        assert_eq!(Plan::parse("Premium"), Some(Plan::Premium));
        assert_eq!(Plan::parse("gold"), None);
    }
}

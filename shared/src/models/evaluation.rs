//! Trade-in Evaluation Model

use serde::{Deserialize, Serialize};

/// Mattress condition, as judged by the evaluator
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl Condition {
    /// Share of the estimated value granted as credit, in tenths
    pub fn factor_tenths(&self) -> i64 {
        match self {
            Self::Excellent => 8,
            Self::Good => 6,
            Self::Fair => 4,
            Self::Poor => 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Mattress {
    pub brand: String,
    #[serde(default)]
    pub model: String,
    /// Age in years
    #[serde(default)]
    pub age: u32,
    pub condition: Condition,
    #[serde(default)]
    pub size: String,
}

/// Evaluation status. Forward-only:
/// `pending -> approved | rejected`, `approved -> redeemed`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationStatus {
    Pending,
    Approved,
    Rejected,
    Redeemed,
}

impl EvaluationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Redeemed => "redeemed",
        }
    }

    pub fn can_transition_to(&self, target: EvaluationStatus) -> bool {
        matches!(
            (self, target),
            (Self::Pending, Self::Approved)
                | (Self::Pending, Self::Rejected)
                | (Self::Approved, Self::Redeemed)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Rejected | Self::Redeemed)
    }
}

/// Trade-in evaluation record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Evaluation {
    pub id: String,
    pub customer_id: String,
    pub mattress: Mattress,
    pub estimated_value: f64,
    /// Whole currency units
    pub credit_approved: i64,
    pub status: EvaluationStatus,
    #[serde(default)]
    pub coupon_id: Option<String>,
    #[serde(default)]
    pub coupon_code: Option<String>,
    #[serde(default)]
    pub expires_at: Option<i64>,
    #[serde(default)]
    pub redeemed_at: Option<i64>,
    #[serde(default)]
    pub created_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_only_transitions() {
        use EvaluationStatus::*;
        assert!(Pending.can_transition_to(Approved));
        assert!(Pending.can_transition_to(Rejected));
        assert!(Approved.can_transition_to(Redeemed));

        assert!(!Rejected.can_transition_to(Redeemed));
        assert!(!Rejected.can_transition_to(Approved));
        assert!(!Approved.can_transition_to(Rejected));
        assert!(!Redeemed.can_transition_to(Approved));
        assert!(!Pending.can_transition_to(Redeemed));
    }

    #[test]
    fn test_terminal_states() {
        assert!(EvaluationStatus::Rejected.is_terminal());
        assert!(EvaluationStatus::Redeemed.is_terminal());
        assert!(!EvaluationStatus::Approved.is_terminal());
    }
}

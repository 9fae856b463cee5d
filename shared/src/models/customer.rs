//! Customer Model

use serde::{Deserialize, Serialize};

/// Canonical customer record owned by the record store
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Customer {
    pub id: String,
    /// Business key; uniqueness is expected but not enforced by storage
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub payments_customer_id: Option<String>,
    #[serde(default)]
    pub commerce_customer_id: Option<String>,
    /// Creation time (Unix millis)
    #[serde(default)]
    pub created_at: i64,
}

impl Customer {
    /// Email key used for duplicate detection (trimmed, lowercased)
    pub fn email_key(&self) -> String {
        normalize_email(&self.email)
    }

    /// True when at least one external provider id is present
    pub fn has_external_ids(&self) -> bool {
        self.payments_customer_id.is_some() || self.commerce_customer_id.is_some()
    }
}

/// Normalize an email address for comparison
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Create payload for a new customer
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CustomerCreate {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payments_customer_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commerce_customer_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_key_normalizes() {
        let c = Customer {
            id: "c1".into(),
            email: "  Jane@Example.COM ".into(),
            first_name: String::new(),
            last_name: String::new(),
            payments_customer_id: None,
            commerce_customer_id: None,
            created_at: 0,
        };
        assert_eq!(c.email_key(), "jane@example.com");
        assert!(!c.has_external_ids());
    }

    #[test]
    fn test_deserialize_sparse_document() {
        let c: Customer =
            serde_json::from_value(serde_json::json!({"id": "c1", "email": "a@x.com"})).unwrap();
        assert_eq!(c.first_name, "");
        assert!(c.payments_customer_id.is_none());
    }
}

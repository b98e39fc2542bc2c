use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::domain::error::{DomainError, FieldError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Income,
    Expense,
    Transfer,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Income => "income",
            Direction::Expense => "expense",
            Direction::Transfer => "transfer",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "income" => Some(Direction::Income),
            "expense" => Some(Direction::Expense),
            "transfer" => Some(Direction::Transfer),
            _ => None,
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A ledger entry. Immutable once created.
///
/// `amount` is always a positive magnitude; the sign lives in `direction`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Transaction {
    pub id: Uuid,
    pub account_id: Uuid,
    pub amount: Decimal,
    pub currency: String,
    pub direction: Direction,
    /// Real-world transaction time, caller-supplied. Not the insert time.
    pub occurred_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_source: Option<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
    /// Derived from `description`; `None` when the description was absent or
    /// embedding generation failed non-fatally.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    pub fn has_embedding(&self) -> bool {
        self.embedding.is_some()
    }

    /// The amount with its direction applied: expenses are negative.
    pub fn signed_amount(&self) -> Decimal {
        match self.direction {
            Direction::Expense => -self.amount,
            Direction::Income | Direction::Transfer => self.amount,
        }
    }
}

/// Caller-supplied fields for `create_transaction`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TransactionDraft {
    pub account_id: Uuid,
    /// Positive magnitude; pair with `direction` for the sign.
    pub amount: Decimal,
    pub currency: String,
    pub direction: Direction,
    pub occurred_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

impl TransactionDraft {
    /// Validates caller-supplied fields. Runs before any I/O.
    pub fn validate(&self) -> Result<(), DomainError> {
        let mut errors = Vec::new();

        if self.amount <= Decimal::ZERO {
            errors.push(FieldError::new("amount", "must be a positive magnitude"));
        }
        if self.currency.trim().is_empty() {
            errors.push(FieldError::new("currency", "must not be empty"));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(DomainError::InvalidArguments(errors))
        }
    }

    /// The text an embedding is derived from; `None` when the description is
    /// absent or blank (embedding is skipped entirely in that case).
    pub fn embedding_source(&self) -> Option<&str> {
        self.description
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_draft() -> TransactionDraft {
        TransactionDraft {
            account_id: Uuid::new_v4(),
            amount: Decimal::new(250, 0),
            currency: "RUB".to_string(),
            direction: Direction::Expense,
            occurred_at: "2024-05-01T08:00:00Z".parse().expect("valid timestamp"),
            description: Some("bought coffee".to_string()),
            category_id: None,
            raw_source: None,
            metadata: None,
        }
    }

    #[test]
    fn valid_draft_passes() {
        assert!(sample_draft().validate().is_ok());
    }

    #[test]
    fn non_positive_amount_is_rejected() {
        let mut draft = sample_draft();
        draft.amount = Decimal::ZERO;
        assert!(draft.validate().is_err());

        draft.amount = Decimal::new(-5, 0);
        let err = draft.validate().expect_err("negative amount should fail");
        assert_eq!(err.field_errors().unwrap()[0].field, "amount");
    }

    #[test]
    fn blank_currency_is_rejected() {
        let mut draft = sample_draft();
        draft.currency = " ".to_string();
        assert!(draft.validate().is_err());
    }

    #[test]
    fn embedding_source_skips_blank_description() {
        let mut draft = sample_draft();
        assert_eq!(draft.embedding_source(), Some("bought coffee"));

        draft.description = Some("   ".to_string());
        assert_eq!(draft.embedding_source(), None);

        draft.description = None;
        assert_eq!(draft.embedding_source(), None);
    }

    #[test]
    fn signed_amount_applies_direction() {
        let tx = Transaction {
            id: Uuid::new_v4(),
            account_id: Uuid::new_v4(),
            amount: Decimal::new(100, 0),
            currency: "USD".to_string(),
            direction: Direction::Expense,
            occurred_at: Utc::now(),
            description: None,
            category_id: None,
            raw_source: None,
            metadata: Map::new(),
            embedding: None,
            created_at: Utc::now(),
        };

        assert_eq!(tx.signed_amount(), Decimal::new(-100, 0));
    }
}

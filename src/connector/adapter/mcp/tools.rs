use schemars::JsonSchema;
use serde::Serialize;

use crate::domain::{Account, Category, CategoryMatch, Transaction, TransactionMatch};

/// Payload returned by the create_transaction tool.
#[derive(Debug, Serialize, JsonSchema)]
pub struct CreateTransactionOutput {
    /// The persisted transaction, with its generated id
    pub transaction: Transaction,

    /// Non-fatal problems encountered while creating the record
    /// (e.g. the embedding step failed and was skipped)
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// Payload returned by the search_similar_transactions tool.
#[derive(Debug, Serialize, JsonSchema)]
pub struct SearchTransactionsOutput {
    /// Matches in ascending cosine-distance order (closest first)
    pub matches: Vec<TransactionMatch>,
}

/// Payload returned by the upsert_category tool.
#[derive(Debug, Serialize, JsonSchema)]
pub struct UpsertCategoryOutput {
    pub category: Category,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// Payload returned by the search_similar_categories tool.
#[derive(Debug, Serialize, JsonSchema)]
pub struct SearchCategoriesOutput {
    pub matches: Vec<CategoryMatch>,
}

/// Payload returned by the list_accounts tool.
#[derive(Debug, Serialize, JsonSchema)]
pub struct ListAccountsOutput {
    /// Accounts ordered by name
    pub accounts: Vec<Account>,
}

/// Payload returned by the upsert_account tool.
#[derive(Debug, Serialize, JsonSchema)]
pub struct UpsertAccountOutput {
    pub account: Account,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AccountKind, Direction};
    use chrono::Utc;
    use rust_decimal::Decimal;
    use serde_json::Map;
    use uuid::Uuid;

    #[test]
    fn empty_warnings_are_omitted_from_the_wire() {
        let output = CreateTransactionOutput {
            transaction: Transaction {
                id: Uuid::new_v4(),
                account_id: Uuid::new_v4(),
                amount: Decimal::new(100, 2),
                currency: "USD".to_string(),
                direction: Direction::Expense,
                occurred_at: Utc::now(),
                description: None,
                category_id: None,
                raw_source: None,
                metadata: Map::new(),
                embedding: None,
                created_at: Utc::now(),
            },
            warnings: Vec::new(),
        };

        let json = serde_json::to_value(&output).unwrap();
        assert!(json.get("warnings").is_none());
        assert!(json.get("transaction").is_some());
    }

    #[test]
    fn account_output_serializes_kind_as_snake_case() {
        let output = UpsertAccountOutput {
            account: Account {
                id: Uuid::new_v4(),
                name: "Main Wallet".to_string(),
                kind: AccountKind::Offchain,
                currency: "USD".to_string(),
                network: None,
                institution: Some("Test Bank".to_string()),
                metadata: Map::new(),
                created_at: Utc::now(),
            },
        };

        let json = serde_json::to_value(&output).unwrap();
        assert_eq!(json["account"]["kind"], "offchain");
    }
}

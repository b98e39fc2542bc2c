use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::domain::error::{DomainError, FieldError};

/// Where an account lives: a blockchain wallet or a traditional institution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AccountKind {
    Onchain,
    Offchain,
}

impl AccountKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountKind::Onchain => "onchain",
            AccountKind::Offchain => "offchain",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "onchain" => Some(AccountKind::Onchain),
            "offchain" => Some(AccountKind::Offchain),
            _ => None,
        }
    }
}

impl std::fmt::Display for AccountKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Account {
    pub id: Uuid,
    pub name: String,
    pub kind: AccountKind,
    pub currency: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub institution: Option<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// The key an account upsert resolves against.
    pub fn upsert_key(&self) -> (&str, AccountKind) {
        (&self.name, self.kind)
    }
}

/// Caller-supplied fields for `upsert_account`, keyed by `(name, kind)`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AccountDraft {
    pub name: String,
    pub kind: AccountKind,
    pub currency: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub institution: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

impl AccountDraft {
    /// Validates caller-supplied fields. Runs before any I/O.
    pub fn validate(&self) -> Result<(), DomainError> {
        let mut errors = Vec::new();

        if self.name.trim().is_empty() {
            errors.push(FieldError::new("name", "must not be empty"));
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
}

/// Optional filters for `list_accounts`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct AccountFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<AccountKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
}

impl AccountFilter {
    /// The search needle, lowercased; `None` when absent or blank.
    pub fn normalized_search(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase)
    }

    pub fn matches(&self, account: &Account) -> bool {
        if let Some(kind) = self.kind {
            if account.kind != kind {
                return false;
            }
        }
        if let Some(needle) = self.normalized_search() {
            if !account.name.to_lowercase().contains(&needle) {
                return false;
            }
        }
        true
    }
}

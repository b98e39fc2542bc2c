use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::error::{DomainError, FieldError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum CategoryKind {
    Income,
    Expense,
    Transfer,
}

impl CategoryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CategoryKind::Income => "income",
            CategoryKind::Expense => "expense",
            CategoryKind::Transfer => "transfer",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "income" => Some(CategoryKind::Income),
            "expense" => Some(CategoryKind::Expense),
            "transfer" => Some(CategoryKind::Transfer),
            _ => None,
        }
    }
}

impl std::fmt::Display for CategoryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Category {
    pub id: Uuid,
    /// Unique across all categories; the upsert key.
    pub name: String,
    pub kind: CategoryKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Derived from `description` (or `name` when absent); `None` when
    /// embedding generation was skipped or failed non-fatally.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
    pub created_at: DateTime<Utc>,
}

impl Category {
    pub fn has_embedding(&self) -> bool {
        self.embedding.is_some()
    }
}

/// Caller-supplied fields for `upsert_category`, keyed by `name`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CategoryDraft {
    pub name: String,
    pub kind: CategoryKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl CategoryDraft {
    /// Validates caller-supplied fields. Runs before any I/O.
    pub fn validate(&self) -> Result<(), DomainError> {
        let mut errors = Vec::new();

        if self.name.trim().is_empty() {
            errors.push(FieldError::new("name", "must not be empty"));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(DomainError::InvalidArguments(errors))
        }
    }

    /// The text an embedding is derived from: the description when present
    /// and non-blank, otherwise the category name.
    pub fn embedding_source(&self) -> &str {
        self.description
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(self.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_name_is_rejected() {
        let draft = CategoryDraft {
            name: "  ".to_string(),
            kind: CategoryKind::Expense,
            description: None,
        };

        let err = draft.validate().expect_err("blank name should fail");
        assert!(err.is_invalid_arguments());
    }

    #[test]
    fn embedding_source_prefers_description() {
        let draft = CategoryDraft {
            name: "Coffee".to_string(),
            kind: CategoryKind::Expense,
            description: Some("coffee and cafes".to_string()),
        };
        assert_eq!(draft.embedding_source(), "coffee and cafes");
    }

    #[test]
    fn embedding_source_falls_back_to_name() {
        let draft = CategoryDraft {
            name: "Coffee".to_string(),
            kind: CategoryKind::Expense,
            description: Some("   ".to_string()),
        };
        assert_eq!(draft.embedding_source(), "Coffee");

        let draft = CategoryDraft {
            name: "Coffee".to_string(),
            kind: CategoryKind::Expense,
            description: None,
        };
        assert_eq!(draft.embedding_source(), "Coffee");
    }
}

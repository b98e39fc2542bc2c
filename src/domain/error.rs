use serde::Serialize;
use thiserror::Error;

/// A single validation failure, tied to the argument field that caused it.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Invalid arguments: {}", format_fields(.0))]
    InvalidArguments(Vec<FieldError>),

    #[error("Account not found: {0}")]
    AccountNotFound(String),

    #[error("Category not found: {0}")]
    CategoryNotFound(String),

    #[error("Embedding unavailable: {0}")]
    EmbeddingUnavailable(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Ambiguous upsert key: {0}")]
    ConflictOnUpsertKey(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

fn format_fields(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(FieldError::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl DomainError {
    pub fn invalid_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidArguments(vec![FieldError::new(field, message)])
    }

    pub fn account_not_found(msg: impl Into<String>) -> Self {
        Self::AccountNotFound(msg.into())
    }

    pub fn category_not_found(msg: impl Into<String>) -> Self {
        Self::CategoryNotFound(msg.into())
    }

    pub fn embedding_unavailable(msg: impl Into<String>) -> Self {
        Self::EmbeddingUnavailable(msg.into())
    }

    pub fn store_unavailable(msg: impl Into<String>) -> Self {
        Self::StoreUnavailable(msg.into())
    }

    pub fn conflict_on_upsert_key(msg: impl Into<String>) -> Self {
        Self::ConflictOnUpsertKey(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Stable identifier used in wire-level error payloads.
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::InvalidArguments(_) => "invalid_arguments",
            Self::AccountNotFound(_) => "account_not_found",
            Self::CategoryNotFound(_) => "category_not_found",
            Self::EmbeddingUnavailable(_) => "embedding_unavailable",
            Self::StoreUnavailable(_) => "store_unavailable",
            Self::ConflictOnUpsertKey(_) => "conflict_on_upsert_key",
            Self::Internal(_) => "internal",
        }
    }

    pub fn field_errors(&self) -> Option<&[FieldError]> {
        match self {
            Self::InvalidArguments(errors) => Some(errors),
            _ => None,
        }
    }

    pub fn is_invalid_arguments(&self) -> bool {
        matches!(self, Self::InvalidArguments(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::AccountNotFound(_) | Self::CategoryNotFound(_))
    }

    pub fn is_embedding_unavailable(&self) -> bool {
        matches!(self, Self::EmbeddingUnavailable(_))
    }

    pub fn is_store_unavailable(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_arguments_display_lists_fields() {
        let err = DomainError::InvalidArguments(vec![
            FieldError::new("amount", "must be positive"),
            FieldError::new("currency", "must not be empty"),
        ]);

        let text = err.to_string();
        assert!(text.contains("amount: must be positive"));
        assert!(text.contains("currency: must not be empty"));
    }

    #[test]
    fn error_kind_is_stable() {
        assert_eq!(
            DomainError::account_not_found("acct").error_kind(),
            "account_not_found"
        );
        assert_eq!(
            DomainError::invalid_field("query", "blank").error_kind(),
            "invalid_arguments"
        );
    }
}

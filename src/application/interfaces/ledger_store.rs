use async_trait::async_trait;

use crate::domain::{
    Account, AccountDraft, AccountFilter, Category, CategoryDraft, CategoryMatch, DomainError,
    Transaction, TransactionDraft, TransactionMatch,
};

/// Persistence and nearest-neighbor search over ledger records.
///
/// Upserts resolve their key (accounts: `(name, kind)`; categories: `name`)
/// and fail with `ConflictOnUpsertKey` when more than one stored row matches.
/// `insert_transaction` verifies referential integrity before writing.
/// Nearest-neighbor operations only consider rows with a non-null embedding,
/// return cosine distance in ascending order, and break ties by insertion
/// order (`created_at`, then id).
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn insert_transaction(
        &self,
        draft: &TransactionDraft,
        embedding: Option<Vec<f32>>,
    ) -> Result<Transaction, DomainError>;

    async fn upsert_category(
        &self,
        draft: &CategoryDraft,
        embedding: Option<Vec<f32>>,
    ) -> Result<Category, DomainError>;

    async fn upsert_account(&self, draft: &AccountDraft) -> Result<Account, DomainError>;

    async fn list_accounts(&self, filter: &AccountFilter) -> Result<Vec<Account>, DomainError>;

    async fn nearest_transactions(
        &self,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<TransactionMatch>, DomainError>;

    async fn nearest_categories(
        &self,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<CategoryMatch>, DomainError>;
}

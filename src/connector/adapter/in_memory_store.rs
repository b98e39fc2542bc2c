use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::application::LedgerStore;
use crate::domain::{
    cosine_distance, Account, AccountDraft, AccountFilter, Category, CategoryDraft, CategoryMatch,
    DomainError, Transaction, TransactionDraft, TransactionMatch,
};

/// In-memory ledger store for tests and local runs.
///
/// Rows are kept in insertion order, which doubles as the deterministic
/// tie-break for equal nearest-neighbor distances.
pub struct InMemoryStore {
    accounts: Arc<Mutex<Vec<Account>>>,
    categories: Arc<Mutex<Vec<Category>>>,
    transactions: Arc<Mutex<Vec<Transaction>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            accounts: Arc::new(Mutex::new(Vec::new())),
            categories: Arc::new(Mutex::new(Vec::new())),
            transactions: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Inserts an account row as-is, bypassing upsert key resolution.
    /// Fixture seeding only; lets tests construct legacy states (e.g.
    /// duplicate upsert keys) the public operations refuse to create.
    pub async fn seed_account(&self, account: Account) {
        self.accounts.lock().await.push(account);
    }

    /// Inserts a category row as-is, bypassing upsert key resolution.
    pub async fn seed_category(&self, category: Category) {
        self.categories.lock().await.push(category);
    }

    /// Inserts a transaction row as-is, bypassing referential checks.
    pub async fn seed_transaction(&self, transaction: Transaction) {
        self.transactions.lock().await.push(transaction);
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerStore for InMemoryStore {
    async fn insert_transaction(
        &self,
        draft: &TransactionDraft,
        embedding: Option<Vec<f32>>,
    ) -> Result<Transaction, DomainError> {
        {
            let accounts = self.accounts.lock().await;
            if !accounts.iter().any(|a| a.id == draft.account_id) {
                return Err(DomainError::account_not_found(draft.account_id.to_string()));
            }
        }

        if let Some(category_id) = draft.category_id {
            let categories = self.categories.lock().await;
            if !categories.iter().any(|c| c.id == category_id) {
                return Err(DomainError::category_not_found(category_id.to_string()));
            }
        }

        let transaction = Transaction {
            id: Uuid::new_v4(),
            account_id: draft.account_id,
            amount: draft.amount,
            currency: draft.currency.clone(),
            direction: draft.direction,
            occurred_at: draft.occurred_at,
            description: draft.description.clone(),
            category_id: draft.category_id,
            raw_source: draft.raw_source.clone(),
            metadata: draft.metadata.clone().unwrap_or_default(),
            embedding,
            created_at: Utc::now(),
        };

        self.transactions.lock().await.push(transaction.clone());
        debug!("Inserted transaction {} into memory", transaction.id);
        Ok(transaction)
    }

    async fn upsert_category(
        &self,
        draft: &CategoryDraft,
        embedding: Option<Vec<f32>>,
    ) -> Result<Category, DomainError> {
        let mut categories = self.categories.lock().await;

        let matching: Vec<usize> = categories
            .iter()
            .enumerate()
            .filter(|(_, c)| c.name == draft.name)
            .map(|(i, _)| i)
            .collect();
        if matching.len() > 1 {
            return Err(DomainError::conflict_on_upsert_key(format!(
                "multiple categories named \"{}\"",
                draft.name
            )));
        }

        match matching.first() {
            Some(&i) => {
                let category = &mut categories[i];
                category.kind = draft.kind;
                category.description = draft.description.clone();
                category.embedding = embedding;
                Ok(category.clone())
            }
            None => {
                let category = Category {
                    id: Uuid::new_v4(),
                    name: draft.name.clone(),
                    kind: draft.kind,
                    description: draft.description.clone(),
                    embedding,
                    created_at: Utc::now(),
                };
                categories.push(category.clone());
                Ok(category)
            }
        }
    }

    async fn upsert_account(&self, draft: &AccountDraft) -> Result<Account, DomainError> {
        let mut accounts = self.accounts.lock().await;

        let matching: Vec<usize> = accounts
            .iter()
            .enumerate()
            .filter(|(_, a)| a.name == draft.name && a.kind == draft.kind)
            .map(|(i, _)| i)
            .collect();
        if matching.len() > 1 {
            return Err(DomainError::conflict_on_upsert_key(format!(
                "multiple accounts keyed (\"{}\", {})",
                draft.name, draft.kind
            )));
        }

        match matching.first() {
            Some(&i) => {
                let account = &mut accounts[i];
                account.currency = draft.currency.clone();
                account.network = draft.network.clone();
                account.institution = draft.institution.clone();
                if let Some(metadata) = &draft.metadata {
                    account.metadata = metadata.clone();
                }
                Ok(account.clone())
            }
            None => {
                let account = Account {
                    id: Uuid::new_v4(),
                    name: draft.name.clone(),
                    kind: draft.kind,
                    currency: draft.currency.clone(),
                    network: draft.network.clone(),
                    institution: draft.institution.clone(),
                    metadata: draft.metadata.clone().unwrap_or_default(),
                    created_at: Utc::now(),
                };
                accounts.push(account.clone());
                Ok(account)
            }
        }
    }

    async fn list_accounts(&self, filter: &AccountFilter) -> Result<Vec<Account>, DomainError> {
        let accounts = self.accounts.lock().await;

        let mut result: Vec<Account> = accounts
            .iter()
            .filter(|a| filter.matches(a))
            .cloned()
            .collect();
        result.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(result)
    }

    async fn nearest_transactions(
        &self,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<TransactionMatch>, DomainError> {
        let transactions = self.transactions.lock().await;

        // Rows without an embedding are invisible to similarity search.
        // Stable sort keeps insertion order for equal distances.
        let mut scored: Vec<TransactionMatch> = transactions
            .iter()
            .filter_map(|t| {
                t.embedding
                    .as_deref()
                    .map(|v| TransactionMatch::new(t.clone(), cosine_distance(query_embedding, v)))
            })
            .collect();
        scored.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(limit);

        Ok(scored)
    }

    async fn nearest_categories(
        &self,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<CategoryMatch>, DomainError> {
        let categories = self.categories.lock().await;

        let mut scored: Vec<CategoryMatch> = categories
            .iter()
            .filter_map(|c| {
                c.embedding
                    .as_deref()
                    .map(|v| CategoryMatch::new(c.clone(), cosine_distance(query_embedding, v)))
            })
            .collect();
        scored.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(limit);

        Ok(scored)
    }
}

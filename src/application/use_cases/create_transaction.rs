use std::sync::Arc;

use tracing::{info, warn};

use crate::application::{EmbeddingProvider, LedgerStore};
use crate::domain::{DomainError, Transaction, TransactionDraft};

/// Result of a successful `create_transaction` call.
///
/// A failed embedding step does not fail the write; it surfaces here as a
/// warning while the persisted record carries `embedding = None`.
#[derive(Debug, Clone)]
pub struct CreatedTransaction {
    pub transaction: Transaction,
    pub embedding_warning: Option<String>,
}

pub struct CreateTransactionUseCase {
    store: Arc<dyn LedgerStore>,
    embeddings: Arc<dyn EmbeddingProvider>,
}

impl CreateTransactionUseCase {
    pub fn new(store: Arc<dyn LedgerStore>, embeddings: Arc<dyn EmbeddingProvider>) -> Self {
        Self { store, embeddings }
    }

    pub async fn execute(&self, draft: TransactionDraft) -> Result<CreatedTransaction, DomainError> {
        draft.validate()?;

        // Losing a transaction record is worse than losing its searchability:
        // the write proceeds even when the embedding step fails.
        let (embedding, embedding_warning) =
            match self.embeddings.maybe_embed(draft.embedding_source()).await {
                Ok(vector) => (vector, None),
                Err(e) => {
                    warn!(
                        "Embedding failed for transaction description, persisting without: {}",
                        e
                    );
                    (None, Some(format!("embedding skipped: {e}")))
                }
            };

        let transaction = self.store.insert_transaction(&draft, embedding).await?;

        info!(
            "Created transaction {} for account {} ({} {} {})",
            transaction.id,
            transaction.account_id,
            transaction.direction,
            transaction.amount,
            transaction.currency
        );

        Ok(CreatedTransaction {
            transaction,
            embedding_warning,
        })
    }
}

use std::sync::Arc;

use tracing::info;

use crate::application::use_cases::resolve_limit;
use crate::application::{EmbeddingProvider, LedgerStore};
use crate::domain::{DomainError, TransactionMatch};

pub struct SearchTransactionsUseCase {
    store: Arc<dyn LedgerStore>,
    embeddings: Arc<dyn EmbeddingProvider>,
}

impl SearchTransactionsUseCase {
    pub fn new(store: Arc<dyn LedgerStore>, embeddings: Arc<dyn EmbeddingProvider>) -> Self {
        Self { store, embeddings }
    }

    pub async fn execute(
        &self,
        query: &str,
        limit: Option<usize>,
    ) -> Result<Vec<TransactionMatch>, DomainError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(DomainError::invalid_field("query", "must not be empty"));
        }

        // A similarity search is meaningless without a query vector; embedding
        // failure fails the whole call.
        let query_embedding = self.embeddings.embed(query).await?;

        let matches = self
            .store
            .nearest_transactions(&query_embedding, resolve_limit(limit))
            .await?;

        info!(
            "Similarity search over transactions returned {} matches for \"{}\"",
            matches.len(),
            query
        );

        Ok(matches)
    }
}

use std::sync::Arc;

use tracing::info;

use crate::application::use_cases::resolve_limit;
use crate::application::{EmbeddingProvider, LedgerStore};
use crate::domain::{CategoryMatch, DomainError};

pub struct SearchCategoriesUseCase {
    store: Arc<dyn LedgerStore>,
    embeddings: Arc<dyn EmbeddingProvider>,
}

impl SearchCategoriesUseCase {
    pub fn new(store: Arc<dyn LedgerStore>, embeddings: Arc<dyn EmbeddingProvider>) -> Self {
        Self { store, embeddings }
    }

    pub async fn execute(
        &self,
        query: &str,
        limit: Option<usize>,
    ) -> Result<Vec<CategoryMatch>, DomainError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(DomainError::invalid_field("query", "must not be empty"));
        }

        let query_embedding = self.embeddings.embed(query).await?;

        let matches = self
            .store
            .nearest_categories(&query_embedding, resolve_limit(limit))
            .await?;

        info!(
            "Similarity search over categories returned {} matches for \"{}\"",
            matches.len(),
            query
        );

        Ok(matches)
    }
}

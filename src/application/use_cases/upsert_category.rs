use std::sync::Arc;

use tracing::{info, warn};

use crate::application::{EmbeddingProvider, LedgerStore};
use crate::domain::{Category, CategoryDraft, DomainError};

/// Result of a successful `upsert_category` call.
#[derive(Debug, Clone)]
pub struct UpsertedCategory {
    pub category: Category,
    pub embedding_warning: Option<String>,
}

pub struct UpsertCategoryUseCase {
    store: Arc<dyn LedgerStore>,
    embeddings: Arc<dyn EmbeddingProvider>,
}

impl UpsertCategoryUseCase {
    pub fn new(store: Arc<dyn LedgerStore>, embeddings: Arc<dyn EmbeddingProvider>) -> Self {
        Self { store, embeddings }
    }

    pub async fn execute(&self, draft: CategoryDraft) -> Result<UpsertedCategory, DomainError> {
        draft.validate()?;

        // The embedding is recomputed on every upsert from the description,
        // falling back to the name. Failure is non-fatal for the write.
        let (embedding, embedding_warning) =
            match self.embeddings.embed(draft.embedding_source()).await {
                Ok(vector) => (Some(vector), None),
                Err(e) => {
                    warn!(
                        "Embedding failed for category \"{}\", persisting without: {}",
                        draft.name, e
                    );
                    (None, Some(format!("embedding skipped: {e}")))
                }
            };

        let category = self.store.upsert_category(&draft, embedding).await?;

        info!("Upserted category {} (\"{}\")", category.id, category.name);

        Ok(UpsertedCategory {
            category,
            embedding_warning,
        })
    }
}

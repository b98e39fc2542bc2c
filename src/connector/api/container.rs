use std::sync::Arc;

use anyhow::Result;
use tracing::debug;

use crate::application::{
    CreateTransactionUseCase, EmbeddingProvider, LedgerStore, ListAccountsUseCase,
    SearchCategoriesUseCase, SearchTransactionsUseCase, UpsertAccountUseCase,
    UpsertCategoryUseCase,
};
use crate::connector::adapter::{InMemoryStore, MockEmbedding, OpenAiEmbedding, PostgresStore};

pub struct ContainerConfig {
    /// Use deterministic hash-seeded embeddings instead of the HTTP provider.
    pub mock_embeddings: bool,
    /// Keep all records in memory instead of Postgres. Data is lost on exit.
    pub memory_store: bool,
}

/// Wires adapters to use cases. Dependencies are injected explicitly; nothing
/// reaches for a global handle.
///
/// Missing required configuration (API key, database URL) fails construction,
/// so a misconfigured process never starts accepting tool calls.
pub struct Container {
    store: Arc<dyn LedgerStore>,
    embeddings: Arc<dyn EmbeddingProvider>,
}

impl Container {
    pub async fn new(config: ContainerConfig) -> Result<Self> {
        let embeddings: Arc<dyn EmbeddingProvider> = if config.mock_embeddings {
            debug!("Using mock embedding provider");
            Arc::new(MockEmbedding::new())
        } else {
            debug!("Initializing OpenAI-compatible embedding provider");
            Arc::new(OpenAiEmbedding::from_env()?)
        };

        // The store's vector columns are sized to the provider's dimension,
        // so the provider decides and the store follows.
        let dimensions = embeddings.config().dimensions;

        let store: Arc<dyn LedgerStore> = if config.memory_store {
            debug!("Using in-memory ledger store");
            Arc::new(InMemoryStore::new())
        } else {
            debug!("Connecting Postgres ledger store");
            Arc::new(PostgresStore::from_env(dimensions).await?)
        };

        Ok(Self { store, embeddings })
    }

    /// Assembles a container from already-built parts. Used by tests to
    /// inject fakes.
    pub fn with_parts(
        store: Arc<dyn LedgerStore>,
        embeddings: Arc<dyn EmbeddingProvider>,
    ) -> Self {
        Self { store, embeddings }
    }

    pub fn create_transaction_use_case(&self) -> CreateTransactionUseCase {
        CreateTransactionUseCase::new(self.store.clone(), self.embeddings.clone())
    }

    pub fn search_transactions_use_case(&self) -> SearchTransactionsUseCase {
        SearchTransactionsUseCase::new(self.store.clone(), self.embeddings.clone())
    }

    pub fn upsert_category_use_case(&self) -> UpsertCategoryUseCase {
        UpsertCategoryUseCase::new(self.store.clone(), self.embeddings.clone())
    }

    pub fn search_categories_use_case(&self) -> SearchCategoriesUseCase {
        SearchCategoriesUseCase::new(self.store.clone(), self.embeddings.clone())
    }

    pub fn list_accounts_use_case(&self) -> ListAccountsUseCase {
        ListAccountsUseCase::new(self.store.clone())
    }

    pub fn upsert_account_use_case(&self) -> UpsertAccountUseCase {
        UpsertAccountUseCase::new(self.store.clone())
    }

    pub fn store(&self) -> Arc<dyn LedgerStore> {
        self.store.clone()
    }

    pub fn embeddings(&self) -> Arc<dyn EmbeddingProvider> {
        self.embeddings.clone()
    }
}

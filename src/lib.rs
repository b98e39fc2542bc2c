pub mod application;
pub mod connector;
pub mod domain;

pub use application::{
    CreateTransactionUseCase, EmbeddingProvider, LedgerStore, ListAccountsUseCase,
    SearchCategoriesUseCase, SearchTransactionsUseCase, UpsertAccountUseCase,
    UpsertCategoryUseCase,
};

pub use connector::{
    Container, ContainerConfig, InMemoryStore, LedgerMcpServer, MockEmbedding, OpenAiEmbedding,
    PostgresStore,
};

pub use domain::{
    Account, AccountDraft, AccountFilter, AccountKind, Category, CategoryDraft, CategoryKind,
    CategoryMatch, Direction, DomainError, EmbeddingConfig, FieldError, Transaction,
    TransactionDraft, TransactionMatch,
};

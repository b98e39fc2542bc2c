use std::sync::Arc;

use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{
    CallToolResult, Content, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo,
};
use rmcp::tool;
use rmcp::tool_handler;
use rmcp::tool_router;
use rmcp::ErrorData as McpError;
use rmcp::ServerHandler;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::json;

use crate::connector::api::Container;
use crate::domain::{AccountDraft, AccountFilter, CategoryDraft, DomainError, TransactionDraft};

use super::tools::{
    CreateTransactionOutput, ListAccountsOutput, SearchCategoriesOutput, SearchTransactionsOutput,
    UpsertAccountOutput, UpsertCategoryOutput,
};

/// Input parameters for the similarity-search tools
#[derive(Debug, Deserialize, JsonSchema)]
pub struct SearchToolInput {
    /// Natural language query describing the records you're looking for
    pub query: String,

    /// Maximum number of matches to return (default: 5, server cap: 25)
    pub limit: Option<usize>,
}

/// MCP server exposing the ledger tool surface
#[derive(Clone)]
pub struct LedgerMcpServer {
    container: Arc<Container>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl LedgerMcpServer {
    pub fn new(container: Arc<Container>) -> Self {
        Self {
            container,
            tool_router: Self::tool_router(),
        }
    }

    /// Insert a transaction row, automatically embedding the description for
    /// later similarity search. The referenced account must already exist.
    #[tool(name = "create_transaction")]
    async fn create_transaction(
        &self,
        params: Parameters<TransactionDraft>,
    ) -> Result<CallToolResult, McpError> {
        let use_case = self.container.create_transaction_use_case();
        let created = use_case.execute(params.0).await.map_err(to_mcp_error)?;

        json_result(&CreateTransactionOutput {
            transaction: created.transaction,
            warnings: created.embedding_warning.into_iter().collect(),
        })
    }

    /// Semantic nearest-neighbor search over stored transactions. Returns
    /// matches in ascending distance order (closest first).
    #[tool(name = "search_similar_transactions")]
    async fn search_similar_transactions(
        &self,
        params: Parameters<SearchToolInput>,
    ) -> Result<CallToolResult, McpError> {
        let input = params.0;
        let use_case = self.container.search_transactions_use_case();
        let matches = use_case
            .execute(&input.query, input.limit)
            .await
            .map_err(to_mcp_error)?;

        json_result(&SearchTransactionsOutput { matches })
    }

    /// Create or update a category keyed by name, recomputing its embedding
    /// from the description (or the name when no description is given).
    #[tool(name = "upsert_category")]
    async fn upsert_category(
        &self,
        params: Parameters<CategoryDraft>,
    ) -> Result<CallToolResult, McpError> {
        let use_case = self.container.upsert_category_use_case();
        let upserted = use_case.execute(params.0).await.map_err(to_mcp_error)?;

        json_result(&UpsertCategoryOutput {
            category: upserted.category,
            warnings: upserted.embedding_warning.into_iter().collect(),
        })
    }

    /// Semantic nearest-neighbor search over categories.
    #[tool(name = "search_similar_categories")]
    async fn search_similar_categories(
        &self,
        params: Parameters<SearchToolInput>,
    ) -> Result<CallToolResult, McpError> {
        let input = params.0;
        let use_case = self.container.search_categories_use_case();
        let matches = use_case
            .execute(&input.query, input.limit)
            .await
            .map_err(to_mcp_error)?;

        json_result(&SearchCategoriesOutput { matches })
    }

    /// List accounts, optionally filtered by kind or a name substring.
    #[tool(name = "list_accounts")]
    async fn list_accounts(
        &self,
        params: Parameters<AccountFilter>,
    ) -> Result<CallToolResult, McpError> {
        let use_case = self.container.list_accounts_use_case();
        let accounts = use_case.execute(params.0).await.map_err(to_mcp_error)?;

        json_result(&ListAccountsOutput { accounts })
    }

    /// Create or update an account keyed by (name, kind).
    #[tool(name = "upsert_account")]
    async fn upsert_account(
        &self,
        params: Parameters<AccountDraft>,
    ) -> Result<CallToolResult, McpError> {
        let use_case = self.container.upsert_account_use_case();
        let account = use_case.execute(params.0).await.map_err(to_mcp_error)?;

        json_result(&UpsertAccountOutput { account })
    }
}

#[tool_handler]
impl ServerHandler for LedgerMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(
                "Financial ledger server. Manage accounts, categories, and transactions, \
                 and run semantic similarity search over transaction and category \
                 descriptions using vector embeddings."
                    .into(),
            ),
        }
    }
}

/// Maps a domain error to the wire-level `{error_kind, message, field_errors?}`
/// contract. Caller-addressable failures use the invalid-params code.
fn to_mcp_error(e: DomainError) -> McpError {
    let message = e.to_string();
    match &e {
        DomainError::InvalidArguments(fields) => McpError::invalid_params(
            message,
            Some(json!({
                "error_kind": e.error_kind(),
                "field_errors": fields,
            })),
        ),
        DomainError::AccountNotFound(_)
        | DomainError::CategoryNotFound(_)
        | DomainError::ConflictOnUpsertKey(_) => McpError::invalid_params(
            message,
            Some(json!({ "error_kind": e.error_kind() })),
        ),
        _ => McpError::internal_error(
            message,
            Some(json!({ "error_kind": e.error_kind() })),
        ),
    }
}

fn json_result<T: serde::Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output).map_err(|e| {
        McpError::internal_error(format!("Failed to serialize result: {}", e), None)
    })?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::{EmbeddingProvider, LedgerStore};
    use crate::connector::adapter::{InMemoryStore, MockEmbedding};
    use crate::domain::{AccountKind, CategoryKind, Direction, EmbeddingConfig};
    use async_trait::async_trait;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use uuid::Uuid;

    /// Counts embed calls; optionally fails every one of them.
    struct CountingEmbedding {
        inner: MockEmbedding,
        fail: bool,
        calls: AtomicUsize,
    }

    impl CountingEmbedding {
        fn working() -> Self {
            Self {
                inner: MockEmbedding::with_dimensions(8),
                fail: false,
                calls: AtomicUsize::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                inner: MockEmbedding::with_dimensions(8),
                fail: true,
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl EmbeddingProvider for CountingEmbedding {
        async fn embed(&self, text: &str) -> Result<Vec<f32>, DomainError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(DomainError::embedding_unavailable("provider down"));
            }
            self.inner.embed(text).await
        }

        fn config(&self) -> &EmbeddingConfig {
            self.inner.config()
        }
    }

    /// Delegates to an in-memory store while counting reads and writes.
    struct CountingStore {
        inner: InMemoryStore,
        reads: AtomicUsize,
        writes: AtomicUsize,
    }

    impl CountingStore {
        fn new() -> Self {
            Self {
                inner: InMemoryStore::new(),
                reads: AtomicUsize::new(0),
                writes: AtomicUsize::new(0),
            }
        }

        fn reads(&self) -> usize {
            self.reads.load(Ordering::SeqCst)
        }

        fn writes(&self) -> usize {
            self.writes.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl LedgerStore for CountingStore {
        async fn insert_transaction(
            &self,
            draft: &TransactionDraft,
            embedding: Option<Vec<f32>>,
        ) -> Result<crate::domain::Transaction, DomainError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.inner.insert_transaction(draft, embedding).await
        }

        async fn upsert_category(
            &self,
            draft: &CategoryDraft,
            embedding: Option<Vec<f32>>,
        ) -> Result<crate::domain::Category, DomainError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.inner.upsert_category(draft, embedding).await
        }

        async fn upsert_account(
            &self,
            draft: &AccountDraft,
        ) -> Result<crate::domain::Account, DomainError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.inner.upsert_account(draft).await
        }

        async fn list_accounts(
            &self,
            filter: &AccountFilter,
        ) -> Result<Vec<crate::domain::Account>, DomainError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.inner.list_accounts(filter).await
        }

        async fn nearest_transactions(
            &self,
            query_embedding: &[f32],
            limit: usize,
        ) -> Result<Vec<crate::domain::TransactionMatch>, DomainError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.inner.nearest_transactions(query_embedding, limit).await
        }

        async fn nearest_categories(
            &self,
            query_embedding: &[f32],
            limit: usize,
        ) -> Result<Vec<crate::domain::CategoryMatch>, DomainError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.inner.nearest_categories(query_embedding, limit).await
        }
    }

    fn server_with(
        store: Arc<CountingStore>,
        embeddings: Arc<CountingEmbedding>,
    ) -> LedgerMcpServer {
        let container = Container::with_parts(store, embeddings);
        LedgerMcpServer::new(Arc::new(container))
    }

    fn transaction_draft(account_id: Uuid) -> TransactionDraft {
        TransactionDraft {
            account_id,
            amount: Decimal::new(250, 0),
            currency: "RUB".to_string(),
            direction: Direction::Expense,
            occurred_at: Utc::now(),
            description: Some("bought coffee".to_string()),
            category_id: None,
            raw_source: None,
            metadata: None,
        }
    }

    fn payload(result: &CallToolResult) -> serde_json::Value {
        let as_value = serde_json::to_value(result).expect("result serializes");
        let text = as_value["content"][0]["text"]
            .as_str()
            .expect("text content")
            .to_string();
        serde_json::from_str(&text).expect("payload is JSON")
    }

    #[tokio::test]
    async fn rejects_blank_search_query_before_any_io() {
        let store = Arc::new(CountingStore::new());
        let embeddings = Arc::new(CountingEmbedding::working());
        let server = server_with(store.clone(), embeddings.clone());

        let err = server
            .search_similar_transactions(Parameters(SearchToolInput {
                query: "   ".into(),
                limit: None,
            }))
            .await
            .expect_err("expected validation error");

        assert_eq!(err.code, rmcp::model::ErrorCode::INVALID_PARAMS);
        assert_eq!(embeddings.calls(), 0);
        assert_eq!(store.reads(), 0);
    }

    #[tokio::test]
    async fn rejects_invalid_transaction_before_any_io() {
        let store = Arc::new(CountingStore::new());
        let embeddings = Arc::new(CountingEmbedding::working());
        let server = server_with(store.clone(), embeddings.clone());

        let mut draft = transaction_draft(Uuid::new_v4());
        draft.amount = Decimal::ZERO;
        draft.currency = " ".to_string();

        let err = server
            .create_transaction(Parameters(draft))
            .await
            .expect_err("expected validation error");

        assert_eq!(err.code, rmcp::model::ErrorCode::INVALID_PARAMS);
        let data = err.data.expect("error payload");
        assert_eq!(data["error_kind"], "invalid_arguments");
        assert_eq!(data["field_errors"].as_array().unwrap().len(), 2);
        assert_eq!(embeddings.calls(), 0);
        assert_eq!(store.writes(), 0);
    }

    #[tokio::test]
    async fn create_transaction_survives_embedding_failure() {
        let store = Arc::new(CountingStore::new());
        let embeddings = Arc::new(CountingEmbedding::failing());
        let server = server_with(store.clone(), embeddings.clone());

        let account = store
            .inner
            .upsert_account(&AccountDraft {
                name: "Acct".to_string(),
                kind: AccountKind::Offchain,
                currency: "USD".to_string(),
                network: None,
                institution: None,
                metadata: None,
            })
            .await
            .unwrap();

        let result = server
            .create_transaction(Parameters(transaction_draft(account.id)))
            .await
            .expect("write must not be blocked by the embedding step");

        let payload = payload(&result);
        assert!(payload["transaction"]["embedding"].is_null());
        assert_eq!(payload["warnings"].as_array().unwrap().len(), 1);
        assert_eq!(embeddings.calls(), 1);
        assert_eq!(store.writes(), 1);
    }

    #[tokio::test]
    async fn search_fails_without_embedding_and_skips_the_store() {
        let store = Arc::new(CountingStore::new());
        let embeddings = Arc::new(CountingEmbedding::failing());
        let server = server_with(store.clone(), embeddings.clone());

        let err = server
            .search_similar_transactions(Parameters(SearchToolInput {
                query: "cafe purchase".into(),
                limit: Some(5),
            }))
            .await
            .expect_err("search without a query vector must fail");

        let data = err.data.expect("error payload");
        assert_eq!(data["error_kind"], "embedding_unavailable");
        assert_eq!(store.reads(), 0);
    }

    #[tokio::test]
    async fn unknown_account_is_a_typed_error() {
        let store = Arc::new(CountingStore::new());
        let embeddings = Arc::new(CountingEmbedding::working());
        let server = server_with(store.clone(), embeddings.clone());

        let err = server
            .create_transaction(Parameters(transaction_draft(Uuid::new_v4())))
            .await
            .expect_err("unknown account must fail");

        let data = err.data.expect("error payload");
        assert_eq!(data["error_kind"], "account_not_found");
    }

    #[tokio::test]
    async fn upsert_category_returns_embedded_record() {
        let store = Arc::new(CountingStore::new());
        let embeddings = Arc::new(CountingEmbedding::working());
        let server = server_with(store.clone(), embeddings.clone());

        let result = server
            .upsert_category(Parameters(CategoryDraft {
                name: "Coffee".to_string(),
                kind: CategoryKind::Expense,
                description: Some("coffee and cafes".to_string()),
            }))
            .await
            .expect("upsert should succeed");

        let payload = payload(&result);
        assert_eq!(payload["category"]["name"], "Coffee");
        assert!(payload["category"]["embedding"].is_array());
        assert!(payload.get("warnings").is_none());
        assert_eq!(embeddings.calls(), 1);
    }

    #[tokio::test]
    async fn list_accounts_applies_kind_filter() {
        let store = Arc::new(CountingStore::new());
        let embeddings = Arc::new(CountingEmbedding::working());
        let server = server_with(store.clone(), embeddings.clone());

        server
            .upsert_account(Parameters(AccountDraft {
                name: "Bank".to_string(),
                kind: AccountKind::Offchain,
                currency: "USD".to_string(),
                network: None,
                institution: Some("Test Bank".to_string()),
                metadata: None,
            }))
            .await
            .unwrap();
        server
            .upsert_account(Parameters(AccountDraft {
                name: "Wallet".to_string(),
                kind: AccountKind::Onchain,
                currency: "ETH".to_string(),
                network: Some("ethereum".to_string()),
                institution: None,
                metadata: None,
            }))
            .await
            .unwrap();

        let result = server
            .list_accounts(Parameters(AccountFilter {
                kind: Some(AccountKind::Onchain),
                search: None,
            }))
            .await
            .expect("list should succeed");

        let payload = payload(&result);
        let accounts = payload["accounts"].as_array().unwrap();
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0]["name"], "Wallet");
    }
}

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use deadpool_postgres::{Manager, ManagerConfig, Object, Pool, RecyclingMethod};
use serde_json::Value;
use tokio_postgres::{NoTls, Row};
use tracing::{debug, info};
use uuid::Uuid;

use crate::application::LedgerStore;
use crate::domain::{
    Account, AccountDraft, AccountFilter, AccountKind, Category, CategoryDraft, CategoryKind,
    CategoryMatch, Direction, DomainError, Transaction, TransactionDraft, TransactionMatch,
};

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const POOL_MAX_SIZE: usize = 16;

/// PostgreSQL + pgvector ledger store.
///
/// Connection pooling via deadpool-postgres; nearest-neighbor search uses the
/// pgvector `<=>` cosine-distance operator. Every call is bounded by the
/// configured timeout and surfaces persistence failures as `StoreUnavailable`.
///
/// This type is cheap to clone - the underlying connection pool is `Arc`-based.
#[derive(Clone)]
pub struct PostgresStore {
    pool: Pool,
    dimensions: usize,
    timeout: Duration,
}

impl PostgresStore {
    /// Creates a pooled client and bootstraps the schema (tables, pgvector
    /// extension, HNSW cosine indexes) if it does not exist yet.
    pub async fn connect(
        database_url: &str,
        dimensions: usize,
        timeout: Duration,
    ) -> Result<Self, DomainError> {
        let pg_config: tokio_postgres::Config = database_url.parse().map_err(|e| {
            DomainError::store_unavailable(format!("invalid Postgres connection string: {e}"))
        })?;

        let mgr_config = ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        };
        let mgr = Manager::from_config(pg_config, NoTls, mgr_config);
        let pool = Pool::builder(mgr)
            .max_size(POOL_MAX_SIZE)
            .build()
            .map_err(|e| {
                DomainError::store_unavailable(format!("failed to create connection pool: {e}"))
            })?;

        let store = Self {
            pool,
            dimensions,
            timeout,
        };
        store.initialize().await?;

        info!("Postgres ledger store initialized ({dimensions}-dimension embeddings)");
        Ok(store)
    }

    /// Construct from environment variables (`DATABASE_URL`,
    /// `STORE_TIMEOUT_SECS`); the embedding dimension comes from the
    /// configured provider.
    pub async fn from_env(dimensions: usize) -> Result<Self, DomainError> {
        let url = std::env::var("DATABASE_URL").map_err(|_| {
            DomainError::internal("Missing required environment variable DATABASE_URL")
        })?;
        let timeout_secs = std::env::var("STORE_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        Self::connect(&url, dimensions, Duration::from_secs(timeout_secs)).await
    }

    async fn initialize(&self) -> Result<(), DomainError> {
        let client = self.client().await?;

        let schema = format!(
            r#"
            CREATE EXTENSION IF NOT EXISTS vector;

            CREATE TABLE IF NOT EXISTS accounts (
                id UUID PRIMARY KEY,
                name TEXT NOT NULL,
                kind TEXT NOT NULL,
                currency TEXT NOT NULL,
                network TEXT,
                institution TEXT,
                metadata JSONB NOT NULL DEFAULT '{{}}',
                created_at TIMESTAMPTZ NOT NULL
            );
            CREATE INDEX IF NOT EXISTS accounts_name_kind_idx ON accounts (name, kind);

            CREATE TABLE IF NOT EXISTS categories (
                id UUID PRIMARY KEY,
                name TEXT NOT NULL,
                kind TEXT NOT NULL,
                description TEXT,
                embedding vector({dims}),
                created_at TIMESTAMPTZ NOT NULL
            );
            CREATE INDEX IF NOT EXISTS categories_name_idx ON categories (name);

            CREATE TABLE IF NOT EXISTS transactions (
                id UUID PRIMARY KEY,
                account_id UUID NOT NULL REFERENCES accounts (id),
                amount NUMERIC NOT NULL,
                currency TEXT NOT NULL,
                direction TEXT NOT NULL,
                occurred_at TIMESTAMPTZ NOT NULL,
                description TEXT,
                category_id UUID REFERENCES categories (id),
                raw_source TEXT,
                metadata JSONB NOT NULL DEFAULT '{{}}',
                embedding vector({dims}),
                created_at TIMESTAMPTZ NOT NULL
            );
            CREATE INDEX IF NOT EXISTS transactions_account_idx ON transactions (account_id);

            CREATE INDEX IF NOT EXISTS transactions_embedding_idx
                ON transactions USING hnsw (embedding vector_cosine_ops);
            CREATE INDEX IF NOT EXISTS categories_embedding_idx
                ON categories USING hnsw (embedding vector_cosine_ops);
            "#,
            dims = self.dimensions
        );

        client
            .batch_execute(&schema)
            .await
            .map_err(|e| DomainError::store_unavailable(format!("schema bootstrap failed: {e}")))?;
        debug!("Ledger schema ensured");

        Ok(())
    }

    async fn client(&self) -> Result<Object, DomainError> {
        self.pool.get().await.map_err(|e| {
            DomainError::store_unavailable(format!("failed to get connection from pool: {e}"))
        })
    }

    /// Bounds a store call by the configured timeout.
    async fn bounded<T, F>(&self, operation: &str, fut: F) -> Result<T, DomainError>
    where
        F: Future<Output = Result<T, DomainError>> + Send,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(DomainError::store_unavailable(format!(
                "{operation} timed out after {:?}",
                self.timeout
            ))),
        }
    }
}

/// Renders a vector as a pgvector literal, enforcing the fixed dimension.
fn vector_literal(vector: &[f32], dimensions: usize) -> Result<String, DomainError> {
    if vector.len() != dimensions {
        return Err(DomainError::internal(format!(
            "expected embedding dimension {dimensions}, got {}",
            vector.len()
        )));
    }
    let mut s = String::with_capacity(vector.len() * 8);
    s.push('[');
    for (i, v) in vector.iter().enumerate() {
        if i > 0 {
            s.push(',');
        }
        s.push_str(&v.to_string());
    }
    s.push(']');
    Ok(s)
}

fn store_err(operation: &str, e: tokio_postgres::Error) -> DomainError {
    DomainError::store_unavailable(format!("{operation}: {e}"))
}

fn column<'a, T>(row: &'a Row, name: &str) -> Result<T, DomainError>
where
    T: tokio_postgres::types::FromSql<'a>,
{
    row.try_get(name)
        .map_err(|e| DomainError::internal(format!("bad column {name}: {e}")))
}

fn metadata_from_row(row: &Row) -> Result<serde_json::Map<String, Value>, DomainError> {
    let value: Value = column(row, "metadata")?;
    match value {
        Value::Object(map) => Ok(map),
        other => Err(DomainError::internal(format!(
            "metadata column is not an object: {other}"
        ))),
    }
}

fn parse_vector(text: Option<String>) -> Result<Option<Vec<f32>>, DomainError> {
    let Some(text) = text else {
        return Ok(None);
    };
    let inner = text
        .trim()
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .ok_or_else(|| DomainError::internal(format!("malformed vector literal: {text}")))?;
    if inner.trim().is_empty() {
        return Ok(Some(Vec::new()));
    }
    inner
        .split(',')
        .map(|part| {
            part.trim()
                .parse::<f32>()
                .map_err(|e| DomainError::internal(format!("malformed vector element: {e}")))
        })
        .collect::<Result<Vec<f32>, _>>()
        .map(Some)
}

fn account_from_row(row: &Row) -> Result<Account, DomainError> {
    let kind_raw: String = column(row, "kind")?;
    let kind = AccountKind::parse(&kind_raw)
        .ok_or_else(|| DomainError::internal(format!("unknown account kind: {kind_raw}")))?;

    Ok(Account {
        id: column(row, "id")?,
        name: column(row, "name")?,
        kind,
        currency: column(row, "currency")?,
        network: column(row, "network")?,
        institution: column(row, "institution")?,
        metadata: metadata_from_row(row)?,
        created_at: column(row, "created_at")?,
    })
}

fn category_from_row(row: &Row) -> Result<Category, DomainError> {
    let kind_raw: String = column(row, "kind")?;
    let kind = CategoryKind::parse(&kind_raw)
        .ok_or_else(|| DomainError::internal(format!("unknown category kind: {kind_raw}")))?;

    Ok(Category {
        id: column(row, "id")?,
        name: column(row, "name")?,
        kind,
        description: column(row, "description")?,
        embedding: parse_vector(column(row, "embedding")?)?,
        created_at: column(row, "created_at")?,
    })
}

fn transaction_from_row(row: &Row) -> Result<Transaction, DomainError> {
    let direction_raw: String = column(row, "direction")?;
    let direction = Direction::parse(&direction_raw)
        .ok_or_else(|| DomainError::internal(format!("unknown direction: {direction_raw}")))?;

    Ok(Transaction {
        id: column(row, "id")?,
        account_id: column(row, "account_id")?,
        amount: column(row, "amount")?,
        currency: column(row, "currency")?,
        direction,
        occurred_at: column(row, "occurred_at")?,
        description: column(row, "description")?,
        category_id: column(row, "category_id")?,
        raw_source: column(row, "raw_source")?,
        metadata: metadata_from_row(row)?,
        embedding: parse_vector(column(row, "embedding")?)?,
        created_at: column(row, "created_at")?,
    })
}

const TRANSACTION_COLUMNS: &str = "id, account_id, amount, currency, direction, occurred_at, \
     description, category_id, raw_source, metadata, embedding::text AS embedding, created_at";

const CATEGORY_COLUMNS: &str =
    "id, name, kind, description, embedding::text AS embedding, created_at";

const ACCOUNT_COLUMNS: &str =
    "id, name, kind, currency, network, institution, metadata, created_at";

#[async_trait]
impl LedgerStore for PostgresStore {
    async fn insert_transaction(
        &self,
        draft: &TransactionDraft,
        embedding: Option<Vec<f32>>,
    ) -> Result<Transaction, DomainError> {
        self.bounded("insert transaction", async {
            let client = self.client().await?;

            // Referential integrity is checked up front so a bad reference
            // yields a typed error instead of a raw constraint violation.
            let account_rows = client
                .query("SELECT 1 FROM accounts WHERE id = $1", &[&draft.account_id])
                .await
                .map_err(|e| store_err("check account", e))?;
            if account_rows.is_empty() {
                return Err(DomainError::account_not_found(draft.account_id.to_string()));
            }

            if let Some(category_id) = draft.category_id {
                let category_rows = client
                    .query("SELECT 1 FROM categories WHERE id = $1", &[&category_id])
                    .await
                    .map_err(|e| store_err("check category", e))?;
                if category_rows.is_empty() {
                    return Err(DomainError::category_not_found(category_id.to_string()));
                }
            }

            let vector_literal = embedding
                .as_deref()
                .map(|v| vector_literal(v, self.dimensions))
                .transpose()?;
            let metadata = Value::Object(draft.metadata.clone().unwrap_or_default());

            let sql = format!(
                "INSERT INTO transactions \
                 (id, account_id, amount, currency, direction, occurred_at, description, \
                  category_id, raw_source, metadata, embedding, created_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11::text::vector, $12) \
                 RETURNING {TRANSACTION_COLUMNS}"
            );
            let row = client
                .query_one(
                    sql.as_str(),
                    &[
                        &Uuid::new_v4(),
                        &draft.account_id,
                        &draft.amount,
                        &draft.currency,
                        &draft.direction.as_str(),
                        &draft.occurred_at,
                        &draft.description,
                        &draft.category_id,
                        &draft.raw_source,
                        &metadata,
                        &vector_literal,
                        &Utc::now(),
                    ],
                )
                .await
                .map_err(|e| store_err("insert transaction", e))?;

            transaction_from_row(&row)
        })
        .await
    }

    async fn upsert_category(
        &self,
        draft: &CategoryDraft,
        embedding: Option<Vec<f32>>,
    ) -> Result<Category, DomainError> {
        self.bounded("upsert category", async {
            let mut client = self.client().await?;
            let tx = client
                .transaction()
                .await
                .map_err(|e| store_err("begin upsert", e))?;

            let existing = tx
                .query("SELECT id FROM categories WHERE name = $1", &[&draft.name])
                .await
                .map_err(|e| store_err("resolve category key", e))?;
            if existing.len() > 1 {
                return Err(DomainError::conflict_on_upsert_key(format!(
                    "multiple categories named \"{}\"",
                    draft.name
                )));
            }

            let vector_literal = embedding
                .as_deref()
                .map(|v| vector_literal(v, self.dimensions))
                .transpose()?;

            let row = match existing.first() {
                Some(found) => {
                    let id: Uuid = column(found, "id")?;
                    let sql = format!(
                        "UPDATE categories \
                         SET kind = $2, description = $3, embedding = $4::text::vector \
                         WHERE id = $1 \
                         RETURNING {CATEGORY_COLUMNS}"
                    );
                    tx.query_one(
                        sql.as_str(),
                        &[&id, &draft.kind.as_str(), &draft.description, &vector_literal],
                    )
                    .await
                    .map_err(|e| store_err("update category", e))?
                }
                None => {
                    let sql = format!(
                        "INSERT INTO categories (id, name, kind, description, embedding, created_at) \
                         VALUES ($1, $2, $3, $4, $5::text::vector, $6) \
                         RETURNING {CATEGORY_COLUMNS}"
                    );
                    tx.query_one(
                        sql.as_str(),
                        &[
                            &Uuid::new_v4(),
                            &draft.name,
                            &draft.kind.as_str(),
                            &draft.description,
                            &vector_literal,
                            &Utc::now(),
                        ],
                    )
                    .await
                    .map_err(|e| store_err("insert category", e))?
                }
            };

            tx.commit().await.map_err(|e| store_err("commit upsert", e))?;
            category_from_row(&row)
        })
        .await
    }

    async fn upsert_account(&self, draft: &AccountDraft) -> Result<Account, DomainError> {
        self.bounded("upsert account", async {
            let mut client = self.client().await?;
            let tx = client
                .transaction()
                .await
                .map_err(|e| store_err("begin upsert", e))?;

            let existing = tx
                .query(
                    "SELECT id FROM accounts WHERE name = $1 AND kind = $2",
                    &[&draft.name, &draft.kind.as_str()],
                )
                .await
                .map_err(|e| store_err("resolve account key", e))?;
            if existing.len() > 1 {
                return Err(DomainError::conflict_on_upsert_key(format!(
                    "multiple accounts keyed (\"{}\", {})",
                    draft.name, draft.kind
                )));
            }

            let row = match existing.first() {
                Some(found) => {
                    let id: Uuid = column(found, "id")?;
                    // Metadata is only replaced when the caller supplies it.
                    let sql = format!(
                        "UPDATE accounts \
                         SET currency = $2, network = $3, institution = $4, \
                             metadata = COALESCE($5, metadata) \
                         WHERE id = $1 \
                         RETURNING {ACCOUNT_COLUMNS}"
                    );
                    let metadata = draft.metadata.clone().map(Value::Object);
                    tx.query_one(
                        sql.as_str(),
                        &[
                            &id,
                            &draft.currency,
                            &draft.network,
                            &draft.institution,
                            &metadata,
                        ],
                    )
                    .await
                    .map_err(|e| store_err("update account", e))?
                }
                None => {
                    let sql = format!(
                        "INSERT INTO accounts \
                         (id, name, kind, currency, network, institution, metadata, created_at) \
                         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
                         RETURNING {ACCOUNT_COLUMNS}"
                    );
                    let metadata = Value::Object(draft.metadata.clone().unwrap_or_default());
                    tx.query_one(
                        sql.as_str(),
                        &[
                            &Uuid::new_v4(),
                            &draft.name,
                            &draft.kind.as_str(),
                            &draft.currency,
                            &draft.network,
                            &draft.institution,
                            &metadata,
                            &Utc::now(),
                        ],
                    )
                    .await
                    .map_err(|e| store_err("insert account", e))?
                }
            };

            tx.commit().await.map_err(|e| store_err("commit upsert", e))?;
            account_from_row(&row)
        })
        .await
    }

    async fn list_accounts(&self, filter: &AccountFilter) -> Result<Vec<Account>, DomainError> {
        self.bounded("list accounts", async {
            let client = self.client().await?;

            let rows = match filter.kind {
                Some(kind) => {
                    let sql = format!(
                        "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE kind = $1 ORDER BY name"
                    );
                    client
                        .query(sql.as_str(), &[&kind.as_str()])
                        .await
                        .map_err(|e| store_err("list accounts", e))?
                }
                None => {
                    let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts ORDER BY name");
                    client
                        .query(sql.as_str(), &[])
                        .await
                        .map_err(|e| store_err("list accounts", e))?
                }
            };

            let mut accounts = rows
                .iter()
                .map(account_from_row)
                .collect::<Result<Vec<_>, _>>()?;

            // Substring search stays in Rust; it is rare and unindexed.
            if let Some(needle) = filter.normalized_search() {
                accounts.retain(|a| a.name.to_lowercase().contains(&needle));
            }

            Ok(accounts)
        })
        .await
    }

    async fn nearest_transactions(
        &self,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<TransactionMatch>, DomainError> {
        self.bounded("search transactions", async {
            let client = self.client().await?;
            let literal = vector_literal(query_embedding, self.dimensions)?;

            let sql = format!(
                "SELECT {TRANSACTION_COLUMNS}, (embedding <=> $1::text::vector)::real AS distance \
                 FROM transactions \
                 WHERE embedding IS NOT NULL \
                 ORDER BY embedding <=> $1::text::vector, created_at, id \
                 LIMIT $2"
            );
            let rows = client
                .query(sql.as_str(), &[&literal, &(limit as i64)])
                .await
                .map_err(|e| store_err("search transactions", e))?;

            rows.iter()
                .map(|row| {
                    Ok(TransactionMatch::new(
                        transaction_from_row(row)?,
                        column(row, "distance")?,
                    ))
                })
                .collect()
        })
        .await
    }

    async fn nearest_categories(
        &self,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<CategoryMatch>, DomainError> {
        self.bounded("search categories", async {
            let client = self.client().await?;
            let literal = vector_literal(query_embedding, self.dimensions)?;

            let sql = format!(
                "SELECT {CATEGORY_COLUMNS}, (embedding <=> $1::text::vector)::real AS distance \
                 FROM categories \
                 WHERE embedding IS NOT NULL \
                 ORDER BY embedding <=> $1::text::vector, created_at, id \
                 LIMIT $2"
            );
            let rows = client
                .query(sql.as_str(), &[&literal, &(limit as i64)])
                .await
                .map_err(|e| store_err("search categories", e))?;

            rows.iter()
                .map(|row| {
                    Ok(CategoryMatch::new(
                        category_from_row(row)?,
                        column(row, "distance")?,
                    ))
                })
                .collect()
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vector_literal_renders_and_checks_dimension() {
        let literal = vector_literal(&[0.5, -1.0, 2.0], 3).unwrap();
        assert_eq!(literal, "[0.5,-1,2]");

        assert!(vector_literal(&[0.5], 3).is_err());
    }

    #[test]
    fn parse_vector_round_trips() {
        let parsed = parse_vector(Some("[0.5,-1,2]".to_string())).unwrap().unwrap();
        assert_eq!(parsed, vec![0.5, -1.0, 2.0]);

        assert!(parse_vector(None).unwrap().is_none());
        assert!(parse_vector(Some("not a vector".to_string())).is_err());
    }
}

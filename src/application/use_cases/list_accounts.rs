use std::sync::Arc;

use tracing::info;

use crate::application::LedgerStore;
use crate::domain::{Account, AccountFilter, DomainError};

pub struct ListAccountsUseCase {
    store: Arc<dyn LedgerStore>,
}

impl ListAccountsUseCase {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    pub async fn execute(&self, filter: AccountFilter) -> Result<Vec<Account>, DomainError> {
        let accounts = self.store.list_accounts(&filter).await?;

        info!(
            "Listed {} accounts (kind={:?}, search={:?})",
            accounts.len(),
            filter.kind,
            filter.search
        );

        Ok(accounts)
    }
}

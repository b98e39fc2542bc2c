use std::sync::Arc;

use tracing::info;

use crate::application::LedgerStore;
use crate::domain::{Account, AccountDraft, DomainError};

pub struct UpsertAccountUseCase {
    store: Arc<dyn LedgerStore>,
}

impl UpsertAccountUseCase {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    pub async fn execute(&self, draft: AccountDraft) -> Result<Account, DomainError> {
        draft.validate()?;

        let account = self.store.upsert_account(&draft).await?;

        info!(
            "Upserted account {} (\"{}\", {})",
            account.id, account.name, account.kind
        );

        Ok(account)
    }
}

mod embedding_provider;
mod ledger_store;

pub use embedding_provider::*;
pub use ledger_store::*;

mod in_memory_store;
mod mock_embedding;
mod openai_embedding;
mod postgres_store;

pub mod mcp;

pub use in_memory_store::*;
pub use mcp::*;
pub use mock_embedding::*;
pub use openai_embedding::*;
pub use postgres_store::*;

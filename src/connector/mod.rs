//! # Connector Layer
//!
//! External integrations implementing application interfaces:
//! - Embedding generation (OpenAI-compatible HTTP API, deterministic mock)
//! - Storage (Postgres + pgvector, in-memory for tests and local runs)
//! - MCP server exposing the tool surface

pub mod adapter;
pub mod api;

pub use adapter::*;
pub use api::*;

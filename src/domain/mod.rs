//! # Domain Layer
//!
//! Record models and the error taxonomy. No I/O, no framework types.

pub mod error;
pub mod models;

pub use error::*;
pub use models::*;

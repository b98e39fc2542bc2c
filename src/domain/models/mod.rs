mod account;
mod category;
mod embedding;
mod similar;
mod transaction;

pub use account::*;
pub use category::*;
pub use embedding::*;
pub use similar::*;
pub use transaction::*;

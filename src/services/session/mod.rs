pub mod store;
pub mod transaction;

pub use store::{SessionId, SessionStore};
pub use transaction::{Transaction, TransactionState};

// core.rs splits the ledger into block hashing, the chain value, integrity
// checks and the shared store.
pub mod block;
pub mod chain;
pub mod store;
pub mod validation;

pub use block::*;
pub use chain::*;
pub use store::*;
pub use validation::*;

// Thin re-export module: implementation lives in `blockchain/core.rs`, which
// separates block hashing, chain management, validation and the shared store.

pub mod core;
pub use self::core::*;

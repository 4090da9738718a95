//! Storage abstraction for envseal.
//!
//! Backend crates (e.g., envseal-store-memory, envseal-store-sqlite) implement these
//! traits so the core never depends on a specific database engine. Backends only
//! ever see ciphertext and wrap metadata.

use thiserror::Error;

mod store;
mod types;

pub use store::*;
pub use types::*;

/// Uniform error type for all storage backends.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found")]
    NotFound,
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("invalid record: {0}")]
    InvalidRecord(String),
    #[error("backend error: {0}")]
    Backend(String),
}

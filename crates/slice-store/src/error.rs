#![forbid(unsafe_code)]

//! Error types for store operations.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors reported by [`Store`](crate::Store) operations.
///
/// Listener and derive-function failures are panics and are governed by
/// [`PanicPolicy`](crate::PanicPolicy), not by this type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The store was built from a one-shot value and has no initializer to
    /// regenerate its initial state.
    #[error("reset is unsupported: store was built from a one-shot value, not a reusable initializer")]
    ResetUnsupported,
}

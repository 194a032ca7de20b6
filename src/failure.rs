//! The Failure and Result types of this library.
//!
//! The collections in this library never fail on contention: the high-level write operations retry internally until
//! they succeed. Only the low-level `ReadOptimizedMap::try_insert`, which leaves the restart loop to its caller,
//! reports why a publication did not take place, as a `Failure`.

use std::result;

use thiserror::Error;

/// Universal Failure type of this library.
#[derive(Clone, Copy, Debug, Error, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub enum Failure {
    /// The snapshot handle is no longer the published one; another writer published first.
    #[error("Contended")]
    Contended,
    /// The snapshot handle already contains an item with the same key.
    #[error("KeyPresent")]
    KeyPresent,
}

/// Universal Result type of this library.
pub type Result<T> = result::Result<T, Failure>;

//! SQLite storage bootstrap, schema ownership and the record store.
//!
//! # Responsibility
//! - Own the physical SQLite handle and its lifecycle.
//! - Verify the on-disk schema matches the expected descriptor before any
//!   application data is read or written.
//!
//! # Invariants
//! - The expected schema fingerprint is mirrored into the `store_master`
//!   metadata table on creation and compared on every open.
//! - A store whose live schema drifted is invalid until destructively reset.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod schema;
pub mod store;

pub use store::{
    ClientStore, StoreConfig, StoreLifecycleListener, ValidationResult,
};

pub type StoreResult<T> = Result<T, StoreError>;

/// Fault taxonomy for store-level operations.
#[derive(Debug)]
pub enum StoreError {
    /// Underlying file/storage I/O failure. Never retried automatically.
    Storage(rusqlite::Error),
    /// On-disk schema disagrees with the expected descriptor. Fatal until the
    /// caller performs a destructive reset.
    SchemaMismatch { diagnostic: String },
    /// Blocking store call issued from the thread the embedding application
    /// marked as interactive. Always a programming error.
    WrongThreadUsage,
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Storage(err) => write!(f, "{err}"),
            Self::SchemaMismatch { diagnostic } => {
                write!(f, "storage schema does not match expected schema: {diagnostic}")
            }
            Self::WrongThreadUsage => write!(
                f,
                "blocking store operation invoked from the interactive thread"
            ),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Storage(err) => Some(err),
            Self::SchemaMismatch { .. } | Self::WrongThreadUsage => None,
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Storage(value)
    }
}

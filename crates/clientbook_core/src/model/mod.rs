//! Domain model for the client roster.
//!
//! # Responsibility
//! - Define the canonical client record persisted by the store.
//!
//! # Invariants
//! - Every record is identified by its `email`; there is no surrogate key.
//! - Deletion is a hard delete; no tombstones are kept.

pub mod client;

//! Data access layer over the record store.
//!
//! # Responsibility
//! - Define the typed CRUD contract for client records.
//! - Keep SQL text and row marshalling behind the accessor boundary.
//!
//! # Invariants
//! - Every write validates the record before touching SQL.
//! - Each public operation runs in exactly one transaction; transactions are
//!   never nested.

pub mod client_repo;

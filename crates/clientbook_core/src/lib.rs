//! Embedded single-table client record store.
//! This crate is the single source of truth for roster persistence invariants.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use db::store::{ClientStore, StoreConfig, StoreLifecycleListener, ValidationResult};
pub use db::{StoreError, StoreResult};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::client::{ClientRecord, ClientValidationError};
pub use repo::client_repo::{ClientAccessor, ClientRepository, RepoError, RepoResult};
pub use service::client_service::{ClientService, RegisterClientRequest};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

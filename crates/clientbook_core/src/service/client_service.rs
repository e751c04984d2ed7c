//! Client roster use-case service.
//!
//! # Responsibility
//! - Provide stable registration/removal/listing entry points for callers.
//! - Normalize input before it reaches repository validation.
//!
//! # Invariants
//! - Service APIs never bypass repository validation or transaction
//!   contracts.
//! - Email normalization (trim + ASCII lowercase) happens exactly once, here.

use crate::model::client::{current_epoch_ms, ClientRecord};
use crate::repo::client_repo::{ClientRepository, RepoResult};

/// Input for registering (or re-registering) a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterClientRequest {
    pub name: String,
    pub city: String,
    pub email: String,
    pub phone: String,
    pub contact_ok: bool,
}

/// Thin orchestration layer over any [`ClientRepository`].
pub struct ClientService<R: ClientRepository> {
    repo: R,
}

impl<R: ClientRepository> ClientService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Registers a client, replacing any earlier registration with the same
    /// normalized email.
    ///
    /// # Contract
    /// - Email is trimmed and lower-cased before persistence.
    /// - `created_at` is stamped with the current epoch-ms instant.
    /// - Returns the record as persisted.
    pub fn register_client(&self, request: &RegisterClientRequest) -> RepoResult<ClientRecord> {
        let record = ClientRecord {
            email: normalize_email(&request.email),
            name: request.name.clone(),
            city: request.city.clone(),
            phone: request.phone.clone(),
            contact_ok: request.contact_ok,
            created_at: current_epoch_ms(),
        };
        self.repo.upsert(&record)?;
        Ok(record)
    }

    /// Removes a client by email. Unknown emails are a no-op.
    pub fn remove_client(&self, email: &str) -> RepoResult<()> {
        self.repo.delete_by_email(&normalize_email(email))
    }

    /// Drops every registration.
    pub fn clear_roster(&self) -> RepoResult<()> {
        self.repo.clear()
    }

    /// Full roster, most recently registered first.
    pub fn roster(&self) -> RepoResult<Vec<ClientRecord>> {
        self.repo.list_all()
    }

    /// Number of registered clients.
    pub fn client_count(&self) -> RepoResult<u64> {
        self.repo.count()
    }
}

/// Canonical email form used as the storage key.
pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_ascii_lowercase()
}

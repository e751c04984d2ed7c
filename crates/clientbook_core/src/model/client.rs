//! Client record domain model.
//!
//! # Responsibility
//! - Define the one row shape persisted in the `clients` table.
//! - Provide validation used by every write path before SQL mutation.
//!
//! # Invariants
//! - `email` is the primary key: a second record with the same email fully
//!   replaces the earlier one on upsert, never a partial merge.
//! - `created_at` is epoch milliseconds and drives default list ordering.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::{SystemTime, UNIX_EPOCH};

// One non-whitespace local part, one `@`, one non-whitespace domain part.
// Anything stricter belongs to the embedding application, not the store.
static EMAIL_SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+$").expect("email regex must compile"));

/// One client contact row.
///
/// Records are transient value objects: constructed per call on writes and
/// per row on reads, never cached by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientRecord {
    /// Primary key. Unique, non-empty, shaped like `local@domain`.
    pub email: String,
    pub name: String,
    pub city: String,
    pub phone: String,
    /// Whether the client agreed to be contacted. Persisted as INTEGER 0/1.
    #[serde(rename = "contactOk")]
    pub contact_ok: bool,
    /// Creation instant in epoch milliseconds.
    #[serde(rename = "createdAt")]
    pub created_at: i64,
}

/// Semantic validation failures for a [`ClientRecord`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientValidationError {
    EmptyEmail,
    MalformedEmail(String),
    EmptyName,
}

impl Display for ClientValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyEmail => write!(f, "client email must not be empty"),
            Self::MalformedEmail(email) => {
                write!(f, "client email `{email}` is not shaped like local@domain")
            }
            Self::EmptyName => write!(f, "client name must not be empty"),
        }
    }
}

impl Error for ClientValidationError {}

impl ClientRecord {
    /// Creates a record stamped with the current wall-clock instant.
    pub fn new(
        email: impl Into<String>,
        name: impl Into<String>,
        city: impl Into<String>,
        phone: impl Into<String>,
        contact_ok: bool,
    ) -> Self {
        Self {
            email: email.into(),
            name: name.into(),
            city: city.into(),
            phone: phone.into(),
            contact_ok,
            created_at: current_epoch_ms(),
        }
    }

    /// Checks record invariants enforced before every SQL mutation.
    ///
    /// # Errors
    /// - [`ClientValidationError::EmptyEmail`] for a blank key.
    /// - [`ClientValidationError::MalformedEmail`] when the key does not look
    ///   like `local@domain`.
    /// - [`ClientValidationError::EmptyName`] for a blank display name.
    pub fn validate(&self) -> Result<(), ClientValidationError> {
        if self.email.trim().is_empty() {
            return Err(ClientValidationError::EmptyEmail);
        }
        if !EMAIL_SHAPE.is_match(&self.email) {
            return Err(ClientValidationError::MalformedEmail(self.email.clone()));
        }
        if self.name.trim().is_empty() {
            return Err(ClientValidationError::EmptyName);
        }
        Ok(())
    }
}

/// Current wall clock as epoch milliseconds.
pub fn current_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

//! Client repository contract and the store-backed accessor.
//!
//! # Responsibility
//! - Provide atomic upsert/delete/clear/list primitives over `clients`.
//! - Wrap every logical operation in exactly one commit-or-rollback
//!   transaction.
//!
//! # Invariants
//! - A failed write rolls back entirely; partial row mutation is never
//!   observable (the transaction rolls back on drop).
//! - Reads either return the full materialized sequence or an error, never a
//!   partial one.

use crate::db::store::StoreShared;
use crate::db::StoreError;
use crate::model::client::{ClientRecord, ClientValidationError};
use rusqlite::{params, Row, Transaction};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

const CLIENT_SELECT_SQL: &str = "SELECT
    email,
    name,
    city,
    phone,
    contactOk,
    createdAt
FROM clients";

const UPSERT_SQL: &str = "INSERT OR REPLACE INTO clients (
    email, name, city, phone, contactOk, createdAt
) VALUES (?1, ?2, ?3, ?4, ?5, ?6);";

pub type RepoResult<T> = Result<T, RepoError>;

/// Accessor-level error wrapper around validation, store and data faults.
#[derive(Debug)]
pub enum RepoError {
    Validation(ClientValidationError),
    Store(StoreError),
    /// A persisted row violates the record contract (e.g. a contactOk value
    /// outside 0/1). Surfaced instead of silently coercing.
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Store(err) => write!(f, "{err}"),
            Self::InvalidData(message) => {
                write!(f, "invalid persisted client data: {message}")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Store(err) => Some(err),
            Self::InvalidData(_) => None,
        }
    }
}

impl From<ClientValidationError> for RepoError {
    fn from(value: ClientValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<StoreError> for RepoError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Store(StoreError::Storage(value))
    }
}

/// CRUD contract for client records.
pub trait ClientRepository {
    /// Inserts or fully replaces the row keyed by `record.email`.
    fn upsert(&self, record: &ClientRecord) -> RepoResult<()>;
    /// Upserts a batch inside one transaction; any failure rolls back every
    /// row of the batch.
    fn upsert_all(&self, records: &[ClientRecord]) -> RepoResult<()>;
    /// Deletes 0 or 1 rows; a missing email is a no-op, not an error.
    fn delete_by_email(&self, email: &str) -> RepoResult<()>;
    /// Deletes every row.
    fn clear(&self) -> RepoResult<()>;
    /// All rows ordered by `createdAt` descending (most recent first).
    fn list_all(&self) -> RepoResult<Vec<ClientRecord>>;
    /// Number of persisted rows.
    fn count(&self) -> RepoResult<u64>;
}

impl<R: ClientRepository + ?Sized> ClientRepository for &R {
    fn upsert(&self, record: &ClientRecord) -> RepoResult<()> {
        (**self).upsert(record)
    }

    fn upsert_all(&self, records: &[ClientRecord]) -> RepoResult<()> {
        (**self).upsert_all(records)
    }

    fn delete_by_email(&self, email: &str) -> RepoResult<()> {
        (**self).delete_by_email(email)
    }

    fn clear(&self) -> RepoResult<()> {
        (**self).clear()
    }

    fn list_all(&self) -> RepoResult<Vec<ClientRecord>> {
        (**self).list_all()
    }

    fn count(&self) -> RepoResult<u64> {
        (**self).count()
    }
}

/// Store-backed singleton accessor for client records.
///
/// Obtained through [`crate::ClientStore::accessor`]; shares the store's
/// mutex-guarded connection, so there is one writer at a time.
pub struct ClientAccessor {
    shared: Arc<StoreShared>,
}

impl ClientAccessor {
    pub(crate) fn new(shared: Arc<StoreShared>) -> Self {
        Self { shared }
    }

    /// Thread-guard and validity preconditions shared by every operation.
    fn check_usable(&self) -> RepoResult<()> {
        self.shared.assert_blockable()?;
        self.shared.ensure_valid()?;
        Ok(())
    }
}

impl ClientRepository for ClientAccessor {
    fn upsert(&self, record: &ClientRecord) -> RepoResult<()> {
        self.check_usable()?;
        record.validate()?;

        let mut conn = self.shared.lock_conn();
        let tx = conn.transaction()?;
        execute_upsert(&tx, record)?;
        tx.commit()?;
        Ok(())
    }

    fn upsert_all(&self, records: &[ClientRecord]) -> RepoResult<()> {
        self.check_usable()?;

        let mut conn = self.shared.lock_conn();
        let tx = conn.transaction()?;
        for record in records {
            // Validation failure mid-batch drops the transaction, rolling
            // back rows already written in this batch.
            record.validate()?;
            execute_upsert(&tx, record)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn delete_by_email(&self, email: &str) -> RepoResult<()> {
        self.check_usable()?;

        let mut conn = self.shared.lock_conn();
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM clients WHERE email = ?1;", [email])?;
        tx.commit()?;
        Ok(())
    }

    fn clear(&self) -> RepoResult<()> {
        self.check_usable()?;

        let mut conn = self.shared.lock_conn();
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM clients;", [])?;
        tx.commit()?;
        Ok(())
    }

    fn list_all(&self) -> RepoResult<Vec<ClientRecord>> {
        self.check_usable()?;

        let conn = self.shared.lock_conn();
        let mut stmt = conn.prepare(&format!(
            "{CLIENT_SELECT_SQL} ORDER BY createdAt DESC;"
        ))?;
        let mut rows = stmt.query([])?;
        let mut clients = Vec::new();

        while let Some(row) = rows.next()? {
            clients.push(parse_client_row(row)?);
        }

        Ok(clients)
    }

    fn count(&self) -> RepoResult<u64> {
        self.check_usable()?;

        let conn = self.shared.lock_conn();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM clients;", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

fn execute_upsert(tx: &Transaction<'_>, record: &ClientRecord) -> RepoResult<()> {
    tx.execute(
        UPSERT_SQL,
        params![
            record.email,
            record.name,
            record.city,
            record.phone,
            i64::from(record.contact_ok),
            record.created_at,
        ],
    )?;
    Ok(())
}

fn parse_client_row(row: &Row<'_>) -> RepoResult<ClientRecord> {
    let contact_ok = match row.get::<_, i64>("contactOk")? {
        0 => false,
        1 => true,
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid contactOk value `{other}` in clients.contactOk"
            )));
        }
    };

    let record = ClientRecord {
        email: row.get("email")?,
        name: row.get("name")?,
        city: row.get("city")?,
        phone: row.get("phone")?,
        contact_ok,
        created_at: row.get("createdAt")?,
    };
    record.validate()?;
    Ok(record)
}

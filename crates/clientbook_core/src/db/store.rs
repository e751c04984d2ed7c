//! Record store lifecycle: open, validate, reset, clear, singleton accessor.
//!
//! # Responsibility
//! - Open or create the backing SQLite file and verify its schema.
//! - Hand out the one lazily constructed [`ClientAccessor`].
//! - Provide destructive reset and clear-all with space reclamation.
//!
//! # Invariants
//! - Lifecycle listeners run synchronously in registration order; a listener
//!   error aborts the operation and propagates to the caller.
//! - A store invalidated by schema drift rejects accessor operations with
//!   `SchemaMismatch` until `destructive_reset` succeeds.
//! - Compaction only runs when no transaction is open on this handle.

use crate::db::{schema, StoreError, StoreResult};
use crate::repo::client_repo::ClientAccessor;
use log::{error, info, warn};
use once_cell::sync::OnceCell;
use rusqlite::Connection;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Observer of store lifecycle events, called in registration order.
///
/// `on_create` fires once when a fresh database is initialized, `on_open` on
/// every successful open, `on_destructive_reset` whenever the table is
/// dropped and recreated. Implementations typically seed data or log.
pub trait StoreLifecycleListener: Send + Sync {
    fn on_create(&self, _conn: &Connection) -> StoreResult<()> {
        Ok(())
    }

    fn on_open(&self, _conn: &Connection) -> StoreResult<()> {
        Ok(())
    }

    fn on_destructive_reset(&self, _conn: &Connection) -> StoreResult<()> {
        Ok(())
    }
}

enum StoreLocation {
    File(PathBuf),
    Memory,
}

/// Open-time configuration for a [`ClientStore`].
pub struct StoreConfig {
    location: StoreLocation,
    recover_on_mismatch: bool,
    listeners: Vec<Box<dyn StoreLifecycleListener>>,
}

impl StoreConfig {
    /// Configuration for a file-backed store at `path`.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            location: StoreLocation::File(path.into()),
            recover_on_mismatch: false,
            listeners: Vec::new(),
        }
    }

    /// Configuration for an in-memory store. Used by tests and the CLI probe.
    pub fn in_memory() -> Self {
        Self {
            location: StoreLocation::Memory,
            recover_on_mismatch: false,
            listeners: Vec::new(),
        }
    }

    /// When enabled, a schema mismatch at open time drops and recreates the
    /// table instead of failing. All data is lost; listeners are told via
    /// `on_destructive_reset`.
    pub fn recover_on_mismatch(mut self, enabled: bool) -> Self {
        self.recover_on_mismatch = enabled;
        self
    }

    /// Registers a lifecycle listener. Listeners fire in registration order.
    pub fn with_listener(mut self, listener: Box<dyn StoreLifecycleListener>) -> Self {
        self.listeners.push(listener);
        self
    }
}

/// Outcome of comparing the live schema against the expected descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    pub ok: bool,
    /// Expected-vs-found rendering; present exactly when `ok` is false.
    pub diagnostic: Option<String>,
}

enum StoreState {
    Open,
    /// Terminal until `destructive_reset`; keeps the drift diagnostic so
    /// rejected operations can report what went wrong.
    Invalid { diagnostic: String },
}

/// Connection, validity state and thread guard shared between the store and
/// its accessor.
pub(crate) struct StoreShared {
    conn: Mutex<Connection>,
    state: Mutex<StoreState>,
    forbidden_thread: Mutex<Option<ThreadId>>,
}

impl StoreShared {
    /// Locks the connection, recovering from a poisoned lock: the connection
    /// itself stays consistent because every mutation runs in a transaction
    /// that rolls back on unwind.
    pub(crate) fn lock_conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fails fast when called from the thread marked interactive.
    pub(crate) fn assert_blockable(&self) -> StoreResult<()> {
        let forbidden = self
            .forbidden_thread
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if *forbidden == Some(thread::current().id()) {
            return Err(StoreError::WrongThreadUsage);
        }
        Ok(())
    }

    /// Rejects operations on an invalidated store with the stored diagnostic.
    pub(crate) fn ensure_valid(&self) -> StoreResult<()> {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        match &*state {
            StoreState::Open => Ok(()),
            StoreState::Invalid { diagnostic } => Err(StoreError::SchemaMismatch {
                diagnostic: diagnostic.clone(),
            }),
        }
    }

    fn mark_invalid(&self, diagnostic: String) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        *state = StoreState::Invalid { diagnostic };
    }

    fn mark_open(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        *state = StoreState::Open;
    }
}

/// Embedded single-table record store over SQLite.
///
/// Owns the connection behind a mutex (single writer) and the singleton
/// [`ClientAccessor`]. All operations are blocking and synchronous; the store
/// spawns no background work.
pub struct ClientStore {
    shared: Arc<StoreShared>,
    listeners: Vec<Box<dyn StoreLifecycleListener>>,
    accessor: OnceCell<ClientAccessor>,
}

impl std::fmt::Debug for ClientStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientStore").finish_non_exhaustive()
    }
}

impl ClientStore {
    /// Opens or creates the backing database and validates its schema.
    ///
    /// A fresh database gets the table plus fingerprint metadata installed
    /// and fires `on_create`. An existing database is checked fingerprint
    /// first, structure second; a database carrying a `clients` table but no
    /// metadata row is checked structurally before its table is adopted.
    /// Drift either fails with `SchemaMismatch` or, with
    /// [`StoreConfig::recover_on_mismatch`], drops and recreates the table.
    /// Every successful open ends by firing `on_open`.
    ///
    /// # Errors
    /// - `Storage` when the file is unreadable or corrupt.
    /// - `SchemaMismatch` on drift without recovery enabled.
    pub fn open(config: StoreConfig) -> StoreResult<Self> {
        let started_at = Instant::now();
        let mode = match config.location {
            StoreLocation::File(_) => "file",
            StoreLocation::Memory => "memory",
        };
        info!("event=store_open module=db status=start mode={mode}");

        match Self::open_inner(config) {
            Ok(store) => {
                info!(
                    "event=store_open module=db status=ok mode={mode} duration_ms={}",
                    started_at.elapsed().as_millis()
                );
                Ok(store)
            }
            Err(err) => {
                error!(
                    "event=store_open module=db status=error mode={mode} duration_ms={} error={err}",
                    started_at.elapsed().as_millis()
                );
                Err(err)
            }
        }
    }

    fn open_inner(config: StoreConfig) -> StoreResult<Self> {
        let StoreConfig {
            location,
            recover_on_mismatch,
            listeners,
        } = config;

        let mut conn = match &location {
            StoreLocation::File(path) => Connection::open(path)?,
            StoreLocation::Memory => Connection::open_in_memory()?,
        };
        bootstrap_connection(&conn)?;

        let mut fire_create = false;
        let mut fire_reset = false;

        if !schema::is_initialized(&conn)? {
            // No metadata row. The clients table may still exist (a file
            // written before the store stamped fingerprints, or by another
            // program): validate its structure before adopting it.
            let live = schema::read_live(&conn)?;
            if live.columns.is_empty() {
                schema::install(&mut conn)?;
                fire_create = true;
            } else if let Some(diagnostic) = schema::diff(schema::expected(), &live) {
                if !recover_on_mismatch {
                    return Err(StoreError::SchemaMismatch { diagnostic });
                }
                warn!(
                    "event=store_recover module=db status=start reason=schema_mismatch"
                );
                schema::reinstall(&mut conn)?;
                fire_reset = true;
            } else {
                // Structure matches exactly: keep the rows, stamp the
                // fingerprint.
                schema::install(&mut conn)?;
            }
        } else if let Some(diagnostic) = schema::validate(&conn)? {
            if !recover_on_mismatch {
                return Err(StoreError::SchemaMismatch { diagnostic });
            }
            warn!(
                "event=store_recover module=db status=start reason=schema_mismatch"
            );
            schema::reinstall(&mut conn)?;
            fire_reset = true;
        }

        if fire_create {
            notify(&listeners, &conn, LifecycleEvent::Create)?;
        }
        if fire_reset {
            notify(&listeners, &conn, LifecycleEvent::DestructiveReset)?;
        }
        notify(&listeners, &conn, LifecycleEvent::Open)?;

        Ok(Self {
            shared: Arc::new(StoreShared {
                conn: Mutex::new(conn),
                state: Mutex::new(StoreState::Open),
                forbidden_thread: Mutex::new(None),
            }),
            listeners,
            accessor: OnceCell::new(),
        })
    }

    /// Returns the singleton accessor, constructing it exactly once.
    ///
    /// Concurrent first calls from multiple threads observe the identical
    /// instance; `OnceCell` provides the double-checked initialization.
    pub fn accessor(&self) -> &ClientAccessor {
        self.accessor
            .get_or_init(|| ClientAccessor::new(Arc::clone(&self.shared)))
    }

    /// Re-reads the live schema and compares it against the expected
    /// descriptor.
    ///
    /// On mismatch the store transitions to its terminal invalid state:
    /// subsequent accessor operations fail with `SchemaMismatch` until
    /// [`ClientStore::destructive_reset`] succeeds.
    pub fn validate_schema(&self) -> StoreResult<ValidationResult> {
        self.shared.assert_blockable()?;
        let diagnostic = {
            let conn = self.shared.lock_conn();
            schema::validate(&conn)?
        };

        match diagnostic {
            None => Ok(ValidationResult {
                ok: true,
                diagnostic: None,
            }),
            Some(diagnostic) => {
                warn!("event=schema_validate module=db status=mismatch");
                self.shared.mark_invalid(diagnostic.clone());
                Ok(ValidationResult {
                    ok: false,
                    diagnostic: Some(diagnostic),
                })
            }
        }
    }

    /// Drops the clients table, reinstalls the schema and fingerprint, and
    /// notifies `on_destructive_reset` listeners in registration order.
    ///
    /// This is the only way out of the invalid state; all persisted rows are
    /// lost.
    pub fn destructive_reset(&self) -> StoreResult<()> {
        self.shared.assert_blockable()?;
        {
            let mut conn = self.shared.lock_conn();
            schema::reinstall(&mut conn)?;
            notify(&self.listeners, &conn, LifecycleEvent::DestructiveReset)?;
        }
        self.shared.mark_open();
        info!("event=store_reset module=db status=ok");
        Ok(())
    }

    /// Deletes every row in one transaction, checkpoints the WAL and then
    /// compacts the file.
    ///
    /// `VACUUM` cannot run inside a transaction, so compaction is skipped
    /// when the handle is not in autocommit mode. With the connection mutex
    /// held and the delete already committed, that state is not reachable
    /// from this method today; the check is scoped to this store's
    /// connection, not process-global.
    pub fn clear_all_data(&self) -> StoreResult<()> {
        self.shared.assert_blockable()?;
        self.shared.ensure_valid()?;

        let mut conn = self.shared.lock_conn();
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM clients;", [])?;
        tx.commit()?;

        // wal_checkpoint returns a status row even when not in WAL mode.
        conn.query_row("PRAGMA wal_checkpoint(FULL);", [], |_row| Ok(()))?;
        if conn.is_autocommit() {
            conn.execute_batch("VACUUM;")?;
        }

        info!("event=store_clear_all module=db status=ok");
        Ok(())
    }

    /// Marks the calling thread as interactive: from now on every blocking
    /// store and accessor operation invoked on it fails with
    /// `WrongThreadUsage` instead of silently stalling that thread.
    pub fn forbid_blocking_from_current_thread(&self) {
        let mut forbidden = self
            .shared
            .forbidden_thread
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *forbidden = Some(thread::current().id());
    }
}

#[derive(Clone, Copy)]
enum LifecycleEvent {
    Create,
    Open,
    DestructiveReset,
}

fn notify(
    listeners: &[Box<dyn StoreLifecycleListener>],
    conn: &Connection,
    event: LifecycleEvent,
) -> StoreResult<()> {
    for listener in listeners {
        match event {
            LifecycleEvent::Create => listener.on_create(conn)?,
            LifecycleEvent::Open => listener.on_open(conn)?,
            LifecycleEvent::DestructiveReset => listener.on_destructive_reset(conn)?,
        }
    }
    Ok(())
}

fn bootstrap_connection(conn: &Connection) -> StoreResult<()> {
    conn.busy_timeout(BUSY_TIMEOUT)?;
    // journal_mode reports the resulting mode as a row; in-memory databases
    // answer "memory" and keep working without WAL.
    conn.query_row("PRAGMA journal_mode = WAL;", [], |_row| Ok(()))?;
    Ok(())
}

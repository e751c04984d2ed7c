//! Static schema descriptor, fingerprinting and live-schema validation.
//!
//! # Responsibility
//! - Hold the single expected `clients` table definition.
//! - Install/reinstall the schema plus its fingerprint metadata row.
//! - Compare the live schema (via `PRAGMA table_info`) against the expected
//!   descriptor and render an expected-vs-found diagnostic on drift.
//!
//! # Invariants
//! - The descriptor is process-wide, immutable and built once.
//! - The fingerprint is a pure function of the descriptor: any column rename,
//!   retype or nullability change produces a different fingerprint.

use crate::db::StoreResult;
use once_cell::sync::Lazy;
use rusqlite::Connection;
use sha2::{Digest, Sha256};

pub const CLIENTS_TABLE: &str = "clients";
pub const MASTER_TABLE: &str = "store_master";

// Single fixed row id in `store_master`, so creation can INSERT OR REPLACE
// without ever growing the metadata table.
const MASTER_ROW_ID: i64 = 42;

/// Bit-exact table definition. Column names are part of the on-disk format
/// and must not be renamed to Rust conventions.
pub const CREATE_CLIENTS_SQL: &str = "CREATE TABLE IF NOT EXISTS clients (
    email     TEXT NOT NULL,
    name      TEXT NOT NULL,
    city      TEXT NOT NULL,
    phone     TEXT NOT NULL,
    contactOk INTEGER NOT NULL,
    createdAt INTEGER NOT NULL,
    PRIMARY KEY(email)
);";

const CREATE_MASTER_SQL: &str = "CREATE TABLE IF NOT EXISTS store_master (
    id            INTEGER PRIMARY KEY,
    identity_hash TEXT
);";

/// One column of a table descriptor, in the shape `PRAGMA table_info` reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    pub name: String,
    /// Declared type, normalized to upper case.
    pub decl_type: String,
    pub not_null: bool,
    /// 1-based position inside the primary key, 0 when not part of it.
    pub pk_position: u32,
    pub default_value: Option<String>,
}

impl ColumnInfo {
    fn expected(name: &str, decl_type: &str, pk_position: u32) -> Self {
        Self {
            name: name.to_string(),
            decl_type: decl_type.to_string(),
            not_null: true,
            pk_position,
            default_value: None,
        }
    }
}

/// Structural description of one table: name plus column metadata.
///
/// The expected instance doubles as the fingerprint source; the found
/// instance is parsed from the live database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDescriptor {
    pub table: String,
    /// Declaration order for the expected descriptor, `cid` order for a
    /// descriptor read back from storage. Comparison is order-insensitive.
    pub columns: Vec<ColumnInfo>,
}

static EXPECTED: Lazy<TableDescriptor> = Lazy::new(|| TableDescriptor {
    table: CLIENTS_TABLE.to_string(),
    columns: vec![
        ColumnInfo::expected("email", "TEXT", 1),
        ColumnInfo::expected("name", "TEXT", 0),
        ColumnInfo::expected("city", "TEXT", 0),
        ColumnInfo::expected("phone", "TEXT", 0),
        ColumnInfo::expected("contactOk", "INTEGER", 0),
        ColumnInfo::expected("createdAt", "INTEGER", 0),
    ],
});

static FINGERPRINT: Lazy<String> = Lazy::new(|| {
    let mut hasher = Sha256::new();
    hasher.update(canonical_rendering(expected()));
    let digest = hasher.finalize();
    digest.iter().map(|byte| format!("{byte:02x}")).collect()
});

/// Returns the process-wide expected descriptor for `clients`.
pub fn expected() -> &'static TableDescriptor {
    &EXPECTED
}

/// Returns the hex SHA-256 fingerprint of the expected descriptor.
pub fn fingerprint() -> &'static str {
    &FINGERPRINT
}

// Canonical line-per-column rendering hashed into the fingerprint. Stable
// across runs as long as the descriptor itself is unchanged.
fn canonical_rendering(descriptor: &TableDescriptor) -> String {
    let mut rendered = format!("table={}\n", descriptor.table);
    for column in &descriptor.columns {
        rendered.push_str(&format!(
            "column={} type={} notnull={} pk={} default={}\n",
            column.name,
            column.decl_type,
            column.not_null,
            column.pk_position,
            column.default_value.as_deref().unwrap_or("<none>"),
        ));
    }
    rendered
}

/// Creates the clients table, the metadata table and the fingerprint row
/// inside one transaction.
pub fn install(conn: &mut Connection) -> StoreResult<()> {
    let tx = conn.transaction()?;
    tx.execute_batch(CREATE_CLIENTS_SQL)?;
    tx.execute_batch(CREATE_MASTER_SQL)?;
    tx.execute(
        "INSERT OR REPLACE INTO store_master (id, identity_hash) VALUES (?1, ?2);",
        (MASTER_ROW_ID, fingerprint()),
    )?;
    tx.commit()?;
    Ok(())
}

/// Drops the clients table and reinstalls the schema with a fresh
/// fingerprint row. Used only on destructive reset.
pub fn reinstall(conn: &mut Connection) -> StoreResult<()> {
    conn.execute_batch("DROP TABLE IF EXISTS clients;")?;
    install(conn)
}

/// Returns whether the metadata table exists, i.e. whether this database has
/// been initialized by the store before.
pub fn is_initialized(conn: &Connection) -> StoreResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1
        );",
        [MASTER_TABLE],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

/// Reads the fingerprint recorded when the schema was installed.
pub fn stored_fingerprint(conn: &Connection) -> StoreResult<Option<String>> {
    let mut stmt =
        conn.prepare("SELECT identity_hash FROM store_master WHERE id = ?1;")?;
    let mut rows = stmt.query([MASTER_ROW_ID])?;
    if let Some(row) = rows.next()? {
        return Ok(row.get(0)?);
    }
    Ok(None)
}

/// Parses the live `clients` definition out of `PRAGMA table_info`.
///
/// Returns a descriptor with no columns when the table is absent.
pub fn read_live(conn: &Connection) -> StoreResult<TableDescriptor> {
    let mut stmt = conn.prepare("PRAGMA table_info(clients);")?;
    let mut rows = stmt.query([])?;
    let mut columns = Vec::new();
    while let Some(row) = rows.next()? {
        columns.push(ColumnInfo {
            name: row.get("name")?,
            decl_type: row.get::<_, String>("type")?.to_ascii_uppercase(),
            not_null: row.get::<_, i64>("notnull")? != 0,
            pk_position: row.get::<_, i64>("pk")? as u32,
            default_value: row.get("dflt_value")?,
        });
    }
    Ok(TableDescriptor {
        table: CLIENTS_TABLE.to_string(),
        columns,
    })
}

/// Structurally compares the expected descriptor with a live one.
///
/// Returns `None` when they match, otherwise a human-readable
/// expected-vs-found diagnostic. Column order is ignored; name, declared
/// type, nullability and primary-key position are compared.
pub fn diff(expected: &TableDescriptor, found: &TableDescriptor) -> Option<String> {
    let mut expected_sorted = expected.columns.clone();
    let mut found_sorted = found.columns.clone();
    expected_sorted.sort_by(|a, b| a.name.cmp(&b.name));
    found_sorted.sort_by(|a, b| a.name.cmp(&b.name));

    if expected_sorted == found_sorted {
        return None;
    }

    Some(format!(
        "{}\n expected:\n{}\n found:\n{}",
        expected.table,
        render_columns(&expected_sorted),
        render_columns(&found_sorted),
    ))
}

/// Full drift check: stored fingerprint first, structure second.
///
/// Either check failing produces a diagnostic; both passing returns `None`.
pub fn validate(conn: &Connection) -> StoreResult<Option<String>> {
    match stored_fingerprint(conn)? {
        Some(stored) if stored == fingerprint() => {}
        stored => {
            return Ok(Some(format!(
                "{}\n expected identity hash: {}\n found identity hash: {}",
                CLIENTS_TABLE,
                fingerprint(),
                stored.as_deref().unwrap_or("<missing>"),
            )));
        }
    }

    let live = read_live(conn)?;
    Ok(diff(expected(), &live))
}

fn render_columns(columns: &[ColumnInfo]) -> String {
    if columns.is_empty() {
        return "  <table missing>".to_string();
    }
    columns
        .iter()
        .map(|column| {
            format!(
                "  {} {} notnull={} pk={}",
                column.name, column.decl_type, column.not_null, column.pk_position
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

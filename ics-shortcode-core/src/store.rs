//! Deduplicated event storage.
//!
//! Each distinct set of [`EventOptions`] is stored once, keyed by its content
//! hash, and addressed by an auto-incrementing integer id.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use rusqlite::{Connection, ErrorCode, OptionalExtension, params};

use crate::error::{ShortcodeError, ShortcodeResult};
use crate::options::{EventOptions, content_hash};

/// Table name suffix appended to the configured prefix.
const TABLE_SUFFIX: &str = "plugins_icsshortcode";

/// A row of the event table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredEvent {
    pub id: i64,
    pub hash: String,
    pub options: String,
}

/// How long a writer waits on another process holding the database lock.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite-backed event store.
pub struct EventStore {
    conn: Mutex<Connection>,
    table: String,
}

impl EventStore {
    /// Open the store in a database file.
    pub fn open(path: impl AsRef<Path>, table_prefix: &str) -> ShortcodeResult<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Self::with_connection(conn, table_prefix)
    }

    /// Open a store backed by a private in-memory database.
    pub fn in_memory(table_prefix: &str) -> ShortcodeResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn, table_prefix)
    }

    fn with_connection(conn: Connection, table_prefix: &str) -> ShortcodeResult<Self> {
        Ok(EventStore {
            conn: Mutex::new(conn),
            table: table_name(table_prefix)?,
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Create the backing table. Safe to run more than once.
    pub fn create_schema(&self) -> ShortcodeResult<()> {
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {} (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                hash CHAR(32) NOT NULL UNIQUE,
                options TEXT NOT NULL
            )",
            self.table
        );
        self.conn().execute(&sql, [])?;
        tracing::info!(table = %self.table, "schema_created");
        Ok(())
    }

    /// Drop the backing table and every stored event with it.
    pub fn drop_schema(&self) -> ShortcodeResult<()> {
        let sql = format!("DROP TABLE IF EXISTS {}", self.table);
        self.conn().execute(&sql, [])?;
        tracing::info!(table = %self.table, "schema_dropped");
        Ok(())
    }

    /// Whether the backing table exists.
    pub fn schema_exists(&self) -> ShortcodeResult<bool> {
        let found: Option<i64> = self
            .conn()
            .query_row(
                "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
                params![self.table],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Return the id of `options`, inserting a row on first sight.
    ///
    /// Equal options always map to the same id. A concurrent insert of the
    /// same content loses on the unique hash and re-reads the winner's row.
    pub fn get_or_create(&self, options: &EventOptions) -> ShortcodeResult<i64> {
        let serialized = options.to_canonical()?;
        let hash = content_hash(&serialized);

        if let Some(row) = self.find_by_hash(&hash)? {
            tracing::debug!(id = row.id, hash = %hash, "event_reused");
            return Ok(row.id);
        }

        let sql = format!("INSERT INTO {} (hash, options) VALUES (?1, ?2)", self.table);
        let inserted = {
            let conn = self.conn();
            conn.execute(&sql, params![hash, serialized])
                .map(|_| conn.last_insert_rowid())
        };

        match inserted {
            Ok(id) => {
                tracing::info!(id, hash = %hash, "event_created");
                Ok(id)
            }
            Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
                tracing::debug!(hash = %hash, "event_insert_conflict");
                self.find_by_hash(&hash)?
                    .map(|row| row.id)
                    .ok_or(ShortcodeError::Storage(rusqlite::Error::QueryReturnedNoRows))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Fetch the options stored under `id`, or `None` if there is no such row.
    pub fn get(&self, id: i64) -> ShortcodeResult<Option<EventOptions>> {
        let sql = format!("SELECT options FROM {} WHERE id = ?1", self.table);
        let serialized: Option<String> = self
            .conn()
            .query_row(&sql, params![id], |row| row.get(0))
            .optional()?;

        serialized
            .map(|s| EventOptions::from_canonical(&s))
            .transpose()
    }

    /// Look up a row by content hash.
    pub fn find_by_hash(&self, hash: &str) -> ShortcodeResult<Option<StoredEvent>> {
        let sql = format!("SELECT id, hash, options FROM {} WHERE hash = ?1", self.table);
        let row = self
            .conn()
            .query_row(&sql, params![hash], |row| {
                Ok(StoredEvent {
                    id: row.get(0)?,
                    hash: row.get(1)?,
                    options: row.get(2)?,
                })
            })
            .optional()?;
        Ok(row)
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Build the table name for a prefix, rejecting anything that is not a plain
/// SQL identifier.
fn table_name(prefix: &str) -> ShortcodeResult<String> {
    if !prefix.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(ShortcodeError::InvalidTablePrefix(prefix.to_string()));
    }
    Ok(format!("{}{}", prefix, TABLE_SUFFIX))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> EventStore {
        let store = EventStore::in_memory("wp_").unwrap();
        store.create_schema().unwrap();
        store
    }

    fn options(title: &str) -> EventOptions {
        EventOptions {
            start: "31.12.2014 22:00".to_string(),
            end: "01.01.2015 05:00".to_string(),
            title: title.to_string(),
            description: String::new(),
            location: "Kugl, St. Gallen".to_string(),
            link: String::new(),
            filename: "entry.ics".to_string(),
            linkclass: "calendar".to_string(),
            linktext: "Add to calendar".to_string(),
        }
    }

    #[test]
    fn test_table_name_uses_prefix() {
        assert_eq!(store().table(), "wp_plugins_icsshortcode");
    }

    #[test]
    fn test_invalid_prefix_is_rejected() {
        assert!(matches!(
            EventStore::in_memory("wp; DROP TABLE x; --"),
            Err(ShortcodeError::InvalidTablePrefix(_))
        ));
    }

    #[test]
    fn test_get_or_create_is_idempotent() {
        let store = store();
        let first = store.get_or_create(&options("Party")).unwrap();
        let second = store.get_or_create(&options("Party")).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_different_content_gets_different_ids() {
        let store = store();
        let party = store.get_or_create(&options("Party")).unwrap();
        let brunch = store.get_or_create(&options("Brunch")).unwrap();
        assert_ne!(party, brunch);
        // Order of calls does not change existing mappings
        assert_eq!(store.get_or_create(&options("Party")).unwrap(), party);
    }

    #[test]
    fn test_get_returns_stored_options() {
        let store = store();
        let id = store.get_or_create(&options("Party")).unwrap();
        assert_eq!(store.get(id).unwrap(), Some(options("Party")));
    }

    #[test]
    fn test_get_unknown_id_is_none() {
        let store = store();
        assert_eq!(store.get(42).unwrap(), None);
        assert_eq!(store.get(-1).unwrap(), None);
    }

    #[test]
    fn test_hash_column_is_unique() {
        let store = store();
        let id = store.get_or_create(&options("Party")).unwrap();
        let hash = content_hash(&options("Party").to_canonical().unwrap());
        let row = store.find_by_hash(&hash).unwrap().unwrap();
        assert_eq!(row.id, id);

        let sql = format!("INSERT INTO {} (hash, options) VALUES (?1, ?2)", store.table());
        let duplicate = store.conn().execute(&sql, params![row.hash, row.options]);
        assert!(duplicate.is_err());
    }

    #[test]
    fn test_schema_lifecycle() {
        let store = EventStore::in_memory("").unwrap();
        assert!(!store.schema_exists().unwrap());
        store.create_schema().unwrap();
        store.create_schema().unwrap();
        assert!(store.schema_exists().unwrap());
        store.drop_schema().unwrap();
        assert!(!store.schema_exists().unwrap());
    }

    #[test]
    fn test_rows_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.sqlite");

        let id = {
            let store = EventStore::open(&path, "").unwrap();
            store.create_schema().unwrap();
            store.get_or_create(&options("Party")).unwrap()
        };

        let store = EventStore::open(&path, "").unwrap();
        assert_eq!(store.get_or_create(&options("Party")).unwrap(), id);
        assert_eq!(store.get(id).unwrap(), Some(options("Party")));
    }

    #[test]
    fn test_concurrent_identical_inserts_share_one_row() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.sqlite");
        EventStore::open(&path, "wp_").unwrap().create_schema().unwrap();

        let stores: Vec<EventStore> = (0..8)
            .map(|_| EventStore::open(&path, "wp_").unwrap())
            .collect();

        for round in 0..20 {
            let event = options(&format!("Party {round}"));
            let shared = &event;
            let ids: Vec<i64> = std::thread::scope(|scope| {
                let handles: Vec<_> = stores
                    .iter()
                    .map(|store| scope.spawn(move || store.get_or_create(shared).unwrap()))
                    .collect();
                handles.into_iter().map(|h| h.join().unwrap()).collect()
            });

            assert!(ids.iter().all(|id| *id == ids[0]), "round {round}: {ids:?}");
            assert_eq!(stores[0].get(ids[0]).unwrap(), Some(event));
        }
    }
}

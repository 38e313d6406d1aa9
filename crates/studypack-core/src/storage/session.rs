//! Embedded SQLite database session.
//!
//! The database member of an archive is held fully in memory: `open`
//! deserializes its bytes into an in-memory connection, `export` serializes
//! the current state back out. One session is open at a time per archive
//! and the connection lives behind a mutex for the session's lifetime; the
//! underlying engine is not assumed thread-safe.

use std::ptr::NonNull;
use std::sync::{Mutex, MutexGuard};

use rusqlite::serialize::OwnedData;
use rusqlite::{Connection, DatabaseName, Transaction};

use crate::error::{Result, StudypackError};

/// Tables every study database must contain.
const REQUIRED_TABLES: [&str; 3] = ["Note", "Tag", "TagMap"];

/// Schema for databases this engine creates. Column names and constraints
/// match the established archive schema so the ecosystem's reader
/// application can open the result.
const SCHEMA_SQL: &str = r#"
    CREATE TABLE Note (
        NoteId INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT,
        Guid TEXT NOT NULL UNIQUE,
        UserMarkId INTEGER,
        LocationId INTEGER,
        Title TEXT,
        Content TEXT,
        LastModified TEXT NOT NULL,
        Created TEXT NOT NULL,
        BlockType INTEGER NOT NULL DEFAULT 0,
        BlockIdentifier INTEGER
    );

    CREATE TABLE Tag (
        TagId INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT,
        Type INTEGER NOT NULL,
        Name TEXT NOT NULL,
        UNIQUE(Type, Name)
    );

    CREATE TABLE TagMap (
        TagMapId INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT,
        TagId INTEGER NOT NULL,
        NoteId INTEGER,
        Position INTEGER NOT NULL,
        UNIQUE(TagId, NoteId),
        UNIQUE(TagId, Position),
        FOREIGN KEY (TagId) REFERENCES Tag (TagId),
        FOREIGN KEY (NoteId) REFERENCES Note (NoteId)
    );
"#;

/// A live, mutable session over an archive's embedded database.
pub struct Session {
    conn: Mutex<Connection>,
}

impl Session {
    /// Open a session over the raw bytes of a database member.
    ///
    /// # Errors
    ///
    /// Returns `StudypackError::CorruptDatabase` if the bytes are not a
    /// valid SQLite database file or any required table (`Note`, `Tag`,
    /// `TagMap`) is absent.
    pub fn open(database: &[u8]) -> Result<Self> {
        let mut conn = Connection::open_in_memory()
            .map_err(|e| StudypackError::CorruptDatabase(format!("SQLite open failed: {}", e)))?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(|e| StudypackError::CorruptDatabase(format!("SQLite pragma failed: {}", e)))?;

        let owned = Self::owned_data_from_bytes(database)?;
        conn.deserialize(DatabaseName::Main, owned, false)
            .map_err(|e| {
                StudypackError::CorruptDatabase(format!("Not a SQLite database: {}", e))
            })?;

        let session = Self {
            conn: Mutex::new(conn),
        };
        session.require_schema()?;
        Ok(session)
    }

    /// Create a session over a fresh, empty database with the archive
    /// schema in place.
    pub fn create() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| StudypackError::CorruptDatabase(format!("SQLite open failed: {}", e)))?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Lock the database connection, returning an error if the mutex is
    /// poisoned.
    fn lock_conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StudypackError::Query("SQLite connection poisoned".to_string()))
    }

    /// Copy database bytes into a SQLite-owned allocation suitable for
    /// `Connection::deserialize`.
    fn owned_data_from_bytes(bytes: &[u8]) -> Result<OwnedData> {
        if bytes.is_empty() {
            return Err(StudypackError::CorruptDatabase(
                "Database member is empty".to_string(),
            ));
        }

        let size: i32 = bytes.len().try_into().map_err(|_| {
            StudypackError::CorruptDatabase("Database member too large".to_string())
        })?;

        // SAFETY: sqlite3_malloc returns a valid pointer or null; null is
        // checked immediately. The size has been validated to fit in i32.
        let raw = unsafe { rusqlite::ffi::sqlite3_malloc(size) as *mut u8 };
        if raw.is_null() {
            return Err(StudypackError::Encoding(
                "SQLite allocation failed".to_string(),
            ));
        }

        // SAFETY:
        // - `raw` is non-null and writable for `bytes.len()` bytes, since
        //   sqlite3_malloc(size) allocated exactly size == bytes.len() bytes
        // - the source slice is valid for reads of its own length and the
        //   regions cannot overlap (freshly allocated heap memory)
        // - `OwnedData::from_raw_nonnull` takes ownership of the buffer,
        //   which SQLite frees when the OwnedData is dropped or consumed
        unsafe {
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), raw, bytes.len());
            let ptr = NonNull::new(raw).ok_or_else(|| {
                StudypackError::Encoding("SQLite allocation returned null".to_string())
            })?;
            Ok(OwnedData::from_raw_nonnull(ptr, bytes.len()))
        }
    }

    /// Verify the required tables exist. The first query against a
    /// deserialized payload also surfaces "file is not a database" here.
    fn require_schema(&self) -> Result<()> {
        let conn = self.lock_conn()?;
        for table in REQUIRED_TABLES {
            let present: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?",
                    [table],
                    |row| row.get(0),
                )
                .map_err(|e| {
                    StudypackError::CorruptDatabase(format!("Schema check failed: {}", e))
                })?;
            if present == 0 {
                return Err(StudypackError::CorruptDatabase(format!(
                    "Required table '{}' is missing",
                    table
                )));
            }
        }
        Ok(())
    }

    /// Run a read operation against the connection.
    pub fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self.lock_conn()?;
        f(&conn)
    }

    /// Execute a single statement, returning the affected row count.
    pub fn execute(&self, sql: &str, params: impl rusqlite::Params) -> Result<usize> {
        let conn = self.lock_conn()?;
        conn.execute(sql, params).map_err(Into::into)
    }

    /// Run a unit of work inside a transaction.
    ///
    /// The transaction commits only if the closure returns `Ok`; on any
    /// `Err` (or an unwind through the closure) it is dropped and rolls
    /// back, leaving the session usable.
    pub fn with_transaction<T>(
        &self,
        f: impl FnOnce(&Transaction<'_>) -> Result<T>,
    ) -> Result<T> {
        let mut conn = self.lock_conn()?;
        let tx = conn.transaction()?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    /// Serialize the current state of all tables back to database file
    /// bytes.
    ///
    /// Byte-identical output across engine versions is not guaranteed;
    /// callers must recompute the integrity hash from whatever this
    /// returns, never reuse a stale hash.
    pub fn export(&self) -> Result<Vec<u8>> {
        let conn = self.lock_conn()?;
        let data = conn.serialize(DatabaseName::Main).map_err(|e| {
            StudypackError::Encoding(format!("Failed to serialize database: {}", e))
        })?;
        Ok(data.as_ref().to_vec())
    }

    /// Check referential consistency and schema presence.
    pub fn check_integrity(&self) -> Result<()> {
        self.require_schema()?;

        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare("PRAGMA foreign_key_check")?;
        let mut rows = stmt.query([])?;
        if rows.next()?.is_some() {
            return Err(StudypackError::CorruptDatabase(
                "Foreign key integrity check failed".to_string(),
            ));
        }
        Ok(())
    }
}

//! SQLite handle for the doctor directory.
//!
//! One connection behind a `Mutex`; every open path applies the same
//! pragmas and brings the schema up to date before returning.

use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use rusqlite::functions::FunctionFlags;
use rusqlite::Connection;
use tracing::{debug, info};

use mediconnect_core::error::MediConnectError;

use crate::migrations;

/// How long a statement waits on a locked database file before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const FILE_PRAGMAS: &str = "PRAGMA journal_mode = WAL;
     PRAGMA synchronous = NORMAL;
     PRAGMA foreign_keys = ON;";

const MEMORY_PRAGMAS: &str = "PRAGMA foreign_keys = ON;";

/// SQL function lowercasing its text argument with full Unicode rules.
/// SQLite's own `lower()` and `LIKE` fold ASCII letters only.
pub const CASEFOLD_FN: &str = "casefold";

fn storage_err(context: &str) -> impl FnOnce(rusqlite::Error) -> MediConnectError + '_ {
    move |e| MediConnectError::Storage(format!("{}: {}", context, e))
}

pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open the directory database at `path`, creating the file and its
    /// parent directories on first use.
    pub fn new(path: &Path) -> Result<Self, MediConnectError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path).map_err(storage_err("Failed to open database"))?;
        conn.busy_timeout(BUSY_TIMEOUT)
            .map_err(storage_err("Failed to set busy timeout"))?;
        let db = Self::init(conn, FILE_PRAGMAS)?;
        info!(path = %path.display(), "Doctor directory opened");
        Ok(db)
    }

    /// Private, empty database that disappears when dropped. Used by tests.
    pub fn in_memory() -> Result<Self, MediConnectError> {
        let conn =
            Connection::open_in_memory().map_err(storage_err("Failed to open in-memory db"))?;
        let db = Self::init(conn, MEMORY_PRAGMAS)?;
        debug!("In-memory doctor directory opened");
        Ok(db)
    }

    fn init(conn: Connection, pragmas: &str) -> Result<Self, MediConnectError> {
        conn.execute_batch(pragmas)
            .map_err(storage_err("Failed to set pragmas"))?;
        register_casefold(&conn)?;
        migrations::run_migrations(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run `f` while holding the connection lock.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, MediConnectError>
    where
        F: FnOnce(&Connection) -> Result<T, MediConnectError>,
    {
        let guard = self
            .conn
            .lock()
            .map_err(|e| MediConnectError::Storage(format!("Database lock poisoned: {}", e)))?;
        f(&guard)
    }
}

fn register_casefold(conn: &Connection) -> Result<(), MediConnectError> {
    conn.create_scalar_function(
        CASEFOLD_FN,
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let value: Option<String> = ctx.get(0)?;
            Ok(value.map(|s| s.to_lowercase()))
        },
    )
    .map_err(storage_err("Failed to register casefold"))
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doctor_count(db: &Database) -> i64 {
        db.with_conn(|conn| {
            conn.query_row("SELECT COUNT(*) FROM doctors", [], |row| row.get(0))
                .map_err(|e| MediConnectError::Storage(e.to_string()))
        })
        .unwrap()
    }

    #[test]
    fn test_in_memory_starts_empty() {
        let db = Database::in_memory().unwrap();
        assert_eq!(doctor_count(&db), 0);
    }

    #[test]
    fn test_file_database_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("mediconnect.db");
        let db = Database::new(&path).unwrap();
        assert_eq!(doctor_count(&db), 0);
        assert!(path.exists());
    }

    #[test]
    fn test_casefold_folds_non_ascii() {
        let db = Database::in_memory().unwrap();
        let folded: (String, Option<String>) = db
            .with_conn(|conn| {
                conn.query_row("SELECT casefold('ÄRZTIN Zürich'), casefold(NULL)", [], |row| {
                    Ok((row.get(0)?, row.get(1)?))
                })
                .map_err(|e| MediConnectError::Storage(e.to_string()))
            })
            .unwrap();
        assert_eq!(folded, ("ärztin zürich".to_string(), None));
    }

    #[test]
    fn test_file_database_uses_wal() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(&dir.path().join("mediconnect.db")).unwrap();
        let mode: String = db
            .with_conn(|conn| {
                conn.query_row("PRAGMA journal_mode", [], |row| row.get(0))
                    .map_err(|e| MediConnectError::Storage(e.to_string()))
            })
            .unwrap();
        assert_eq!(mode.to_lowercase(), "wal");
    }

    #[test]
    fn test_reopen_keeps_rows_and_schema_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mediconnect.db");
        {
            let db = Database::new(&path).unwrap();
            db.with_conn(|conn| {
                conn.execute("INSERT INTO doctors (full_name) VALUES ('Dr. Ada')", [])
                    .map_err(|e| MediConnectError::Storage(e.to_string()))
            })
            .unwrap();
        }
        let db = Database::new(&path).unwrap();
        assert_eq!(doctor_count(&db), 1);

        let versions: i64 = db
            .with_conn(|conn| {
                conn.query_row("SELECT COUNT(*) FROM schema_migrations", [], |row| row.get(0))
                    .map_err(|e| MediConnectError::Storage(e.to_string()))
            })
            .unwrap();
        assert_eq!(versions, 1);
    }
}

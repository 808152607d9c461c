//! Database schema migrations.

use rusqlite::Connection;
use tracing::info;

use mediconnect_core::error::MediConnectError;

/// Run all pending database migrations.
pub fn run_migrations(conn: &Connection) -> Result<(), MediConnectError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version     INTEGER PRIMARY KEY NOT NULL,
            name        TEXT NOT NULL,
            applied_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );",
    )
    .map_err(|e| MediConnectError::Storage(format!("Failed to create migrations table: {}", e)))?;

    let current_version: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .map_err(|e| {
            MediConnectError::Storage(format!("Failed to query migration version: {}", e))
        })?;

    if current_version < 1 {
        apply_v1(conn)?;
        info!("Applied migration v1: doctors");
    }

    Ok(())
}

/// Version 1: doctor directory.
///
/// AUTOINCREMENT keeps ids from being reused after deletes.
fn apply_v1(conn: &Connection) -> Result<(), MediConnectError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS doctors (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            full_name   TEXT NOT NULL DEFAULT '',
            specialty   TEXT NOT NULL DEFAULT '',
            city        TEXT NOT NULL DEFAULT '',
            address     TEXT NOT NULL DEFAULT '',
            rating      REAL NOT NULL DEFAULT 0.0,
            fees        REAL NOT NULL DEFAULT 0.0,
            phone       TEXT NOT NULL DEFAULT '',
            created_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );

        CREATE INDEX IF NOT EXISTS idx_doctors_rank
            ON doctors (rating DESC, fees ASC);

        CREATE INDEX IF NOT EXISTS idx_doctors_specialty
            ON doctors (specialty);

        CREATE INDEX IF NOT EXISTS idx_doctors_city
            ON doctors (city);

        INSERT INTO schema_migrations (version, name) VALUES (1, 'doctors');
        ",
    )
    .map_err(|e| MediConnectError::Storage(format!("Migration v1 failed: {}", e)))?;
    Ok(())
}

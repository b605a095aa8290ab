use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use rusqlite::Connection;

use super::DB_SCHEMA_VERSION;
use crate::util::{ensure_directory, now_utc_string};

pub(crate) fn open_store(db_path: &Path, lock_wait: Duration) -> Result<Connection> {
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        ensure_directory(parent)?;
    }

    let connection = Connection::open(db_path)
        .with_context(|| format!("failed to open {}", db_path.display()))?;
    configure_connection(&connection, lock_wait)?;
    Ok(connection)
}

pub(crate) fn configure_connection(connection: &Connection, lock_wait: Duration) -> Result<()> {
    connection
        .pragma_update(None, "journal_mode", "WAL")
        .context("failed to set journal_mode=WAL")?;
    connection
        .pragma_update(None, "synchronous", "NORMAL")
        .context("failed to set synchronous=NORMAL")?;
    connection
        .busy_timeout(lock_wait)
        .context("failed to set busy timeout")?;
    Ok(())
}

pub(crate) fn ensure_schema(connection: &Connection) -> Result<()> {
    connection
        .execute_batch(
            "
            CREATE TABLE IF NOT EXISTS metadata (
              key TEXT PRIMARY KEY,
              value TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS scan_records (
              record_id INTEGER PRIMARY KEY AUTOINCREMENT,
              payload TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS bookmark (
              singleton INTEGER PRIMARY KEY CHECK (singleton = 1),
              last_processed_id INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS business_aggregates (
              aggregate_id INTEGER PRIMARY KEY AUTOINCREMENT,
              business_id INTEGER NOT NULL,
              num_total INTEGER NOT NULL,
              total_value REAL NOT NULL,
              total_ocr_score REAL NOT NULL,
              total_ai_score REAL NOT NULL,
              computed_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_business_aggregates_business_time
              ON business_aggregates(business_id, computed_at);
            ",
        )
        .context("failed to create tables")?;

    // Re-running init must never rewind the cursor.
    connection
        .execute(
            "INSERT INTO bookmark(singleton, last_processed_id) VALUES(1, 0)
             ON CONFLICT(singleton) DO NOTHING",
            [],
        )
        .context("failed to seed bookmark")?;

    let now = now_utc_string();
    connection.execute(
        "INSERT INTO metadata(key, value) VALUES('db_schema_version', ?1)
         ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        [DB_SCHEMA_VERSION],
    )?;
    connection.execute(
        "INSERT INTO metadata(key, value) VALUES('db_updated_at', ?1)
         ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        [now],
    )?;

    Ok(())
}

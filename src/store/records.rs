use rusqlite::{Connection, OptionalExtension, params};

use crate::model::Record;

/// Appends one raw payload and returns its new record id.
pub(crate) fn append_record(connection: &Connection, payload: &str) -> rusqlite::Result<i64> {
    connection.execute("INSERT INTO scan_records(payload) VALUES(?1)", [payload])?;
    Ok(connection.last_insert_rowid())
}

/// Records with `low_exclusive < record_id <= high_inclusive`, ascending by id.
pub(crate) fn fetch_range(
    connection: &Connection,
    low_exclusive: i64,
    high_inclusive: i64,
) -> rusqlite::Result<Vec<Record>> {
    let mut statement = connection.prepare_cached(
        "
        SELECT record_id, payload
        FROM scan_records
        WHERE record_id > ?1 AND record_id <= ?2
        ORDER BY record_id ASC
        ",
    )?;

    let rows = statement.query_map(params![low_exclusive, high_inclusive], |row| {
        Ok(Record {
            id: row.get(0)?,
            payload: row.get(1)?,
        })
    })?;

    rows.collect()
}

pub(crate) fn max_record_id(connection: &Connection) -> rusqlite::Result<Option<i64>> {
    connection
        .query_row("SELECT MAX(record_id) FROM scan_records", [], |row| {
            row.get::<_, Option<i64>>(0)
        })
        .optional()
        .map(Option::flatten)
}

pub(crate) fn count_records(connection: &Connection) -> rusqlite::Result<i64> {
    connection.query_row("SELECT COUNT(*) FROM scan_records", [], |row| row.get(0))
}

use rusqlite::{Connection, OptionalExtension};

use crate::model::Bookmark;

/// `None` when the bookmark row was never seeded.
pub(crate) fn read_bookmark(connection: &Connection) -> rusqlite::Result<Option<Bookmark>> {
    connection
        .query_row(
            "SELECT last_processed_id FROM bookmark WHERE singleton = 1",
            [],
            |row| row.get(0).map(Bookmark::new),
        )
        .optional()
}

/// Moves the bookmark forward to `bookmark`. Returns the number of rows updated,
/// which is 0 if the row is missing or the value would move backwards.
pub(crate) fn write_bookmark(connection: &Connection, bookmark: Bookmark) -> rusqlite::Result<usize> {
    connection.execute(
        "UPDATE bookmark SET last_processed_id = ?1
         WHERE singleton = 1 AND last_processed_id <= ?1",
        [bookmark.last_processed_id],
    )
}

use rusqlite::Connection;
use tracing::debug;

use crate::error::PipelineError;
use crate::model::{BatchRange, Bookmark, Record};
use crate::store::{fetch_range, read_bookmark};

/// Records picked for one run, plus the window they were picked from.
#[derive(Debug)]
pub(crate) struct Selection {
    pub(crate) bookmark: Bookmark,
    pub(crate) range: BatchRange,
    pub(crate) records: Vec<Record>,
}

/// Reads the bookmark and fetches the fixed-width window after it. The window
/// end is the next bookmark candidate even when fewer records exist.
pub(crate) fn select_batch(
    connection: &Connection,
    batch_size: u32,
) -> Result<Selection, PipelineError> {
    let bookmark = read_bookmark(connection)
        .map_err(PipelineError::transient("reading bookmark"))?
        .ok_or(PipelineError::BookmarkMissing)?;

    let range = bookmark.next_range(batch_size);
    let records = fetch_range(connection, range.start_exclusive, range.end_inclusive)
        .map_err(PipelineError::transient("fetching records"))?;
    debug_assert!(records.iter().all(|record| range.contains(record.id)));

    debug!(
        range_start = range.start_exclusive,
        range_end = range.end_inclusive,
        records = records.len(),
        "selected batch"
    );

    Ok(Selection {
        bookmark,
        range,
        records,
    })
}

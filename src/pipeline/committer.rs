use chrono::{DateTime, Utc};
use rusqlite::Transaction;

use super::aggregator::BatchTotals;
use crate::error::PipelineError;
use crate::model::{BatchRange, Bookmark, BusinessAggregate};
use crate::store::{append_aggregates, write_bookmark};

#[derive(Debug)]
pub(crate) struct CommitReceipt {
    pub(crate) rows_written: usize,
    pub(crate) bookmark: Bookmark,
}

/// Appends one stamped row per business and advances the bookmark to the end of
/// `range`, all inside `tx`. Any failure drops `tx`, which rolls both writes back.
pub(crate) fn commit(
    tx: Transaction<'_>,
    totals: &BatchTotals,
    range: BatchRange,
    computed_at: DateTime<Utc>,
) -> Result<CommitReceipt, PipelineError> {
    let range_end = range.end_inclusive;
    let rows = totals
        .iter()
        .map(|(&business_id, business)| business.stamp(business_id, computed_at))
        .collect::<Vec<BusinessAggregate>>();

    let rows_written =
        append_aggregates(&tx, &rows).map_err(PipelineError::commit(range_end))?;

    let bookmark = Bookmark::new(range_end);
    let updated = write_bookmark(&tx, bookmark).map_err(PipelineError::commit(range_end))?;
    if updated != 1 {
        return Err(PipelineError::BookmarkMissing);
    }

    tx.commit().map_err(PipelineError::commit(range_end))?;

    Ok(CommitReceipt {
        rows_written,
        bookmark,
    })
}

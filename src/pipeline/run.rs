use chrono::Utc;
use rusqlite::{Connection, ErrorCode, Transaction, TransactionBehavior};
use serde::Serialize;
use tracing::info;

use super::aggregator::aggregate;
use super::committer::commit;
use super::selector::select_batch;
use crate::cli::{BatchArgs, MalformedPolicy};
use crate::error::PipelineError;
use crate::model::{BatchRange, Bookmark};

#[derive(Debug, Clone)]
pub(crate) struct PipelineConfig {
    pub(crate) batch_size: u32,
    pub(crate) aggregatable_field: String,
    pub(crate) malformed_policy: MalformedPolicy,
}

impl From<&BatchArgs> for PipelineConfig {
    fn from(args: &BatchArgs) -> Self {
        Self {
            batch_size: args.batch_size,
            aggregatable_field: args.aggregatable_field.clone(),
            malformed_policy: args.malformed_policy,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct BatchOutcome {
    pub(crate) range: BatchRange,
    pub(crate) records_selected: usize,
    pub(crate) records_skipped: usize,
    pub(crate) rows_written: usize,
    pub(crate) bookmark: Bookmark,
}

/// Runs select -> aggregate -> commit once.
///
/// The whole run holds one `IMMEDIATE` transaction, so a concurrent run waits
/// for the connection's busy timeout and then fails with
/// [`PipelineError::RunInProgress`] instead of racing on the bookmark.
pub(crate) fn run_batch(
    connection: &mut Connection,
    config: &PipelineConfig,
) -> Result<BatchOutcome, PipelineError> {
    let tx = begin_run(connection)?;

    let selection = select_batch(&tx, config.batch_size)?;
    let aggregation = aggregate(
        &selection.records,
        &config.aggregatable_field,
        config.malformed_policy,
    )?;

    let receipt = commit(tx, &aggregation.totals, selection.range, Utc::now())?;

    info!(
        range_start = selection.range.start_exclusive,
        range_end = selection.range.end_inclusive,
        previous_bookmark = selection.bookmark.last_processed_id,
        records = selection.records.len(),
        aggregated = aggregation.records_aggregated,
        skipped = aggregation.records_skipped,
        businesses = receipt.rows_written,
        field = %config.aggregatable_field,
        policy = config.malformed_policy.as_str(),
        "batch committed"
    );

    Ok(BatchOutcome {
        range: selection.range,
        records_selected: selection.records.len(),
        records_skipped: aggregation.records_skipped,
        rows_written: receipt.rows_written,
        bookmark: receipt.bookmark,
    })
}

fn begin_run(connection: &mut Connection) -> Result<Transaction<'_>, PipelineError> {
    connection
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(|err| {
            if is_lock_contention(&err) {
                PipelineError::RunInProgress
            } else {
                PipelineError::TransientStore {
                    operation: "starting run",
                    source: err,
                }
            }
        })
}

fn is_lock_contention(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(failure, _)
            if matches!(failure.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
    )
}

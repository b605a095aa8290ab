use std::thread;
use std::time::Duration;

use anyhow::Result;
use rusqlite::Connection;
use tracing::{error, info, warn};

use crate::cli::ScheduleArgs;
use crate::error::PipelineError;
use crate::pipeline::{BatchOutcome, PipelineConfig, run_batch};
use crate::store::open_store;

pub fn run(args: ScheduleArgs) -> Result<()> {
    let db_path = args.store.resolve_db_path();
    let mut connection = open_store(&db_path, Duration::from_millis(args.batch.lock_wait_ms))?;
    let config = PipelineConfig::from(&args.batch);
    let interval = Duration::from_secs(args.interval_secs);

    info!(
        path = %db_path.display(),
        interval_secs = args.interval_secs,
        batch_size = config.batch_size,
        max_ticks = ?args.max_ticks,
        "scheduler started"
    );

    let mut tick = 0u64;
    loop {
        tick += 1;
        run_tick(&mut connection, &config, tick);

        if args.max_ticks.is_some_and(|max| tick >= max) {
            info!(ticks = tick, "scheduler reached max ticks");
            return Ok(());
        }
        thread::sleep(interval);
    }
}

/// One scheduled invocation. Failures are logged and left for the next tick to
/// retry; the bookmark has not moved in any failure case.
fn run_tick(
    connection: &mut Connection,
    config: &PipelineConfig,
    tick: u64,
) -> Option<BatchOutcome> {
    match run_batch(connection, config) {
        Ok(outcome) => Some(outcome),
        Err(err @ PipelineError::RunInProgress) => {
            warn!(tick, error = %err, "tick skipped");
            None
        }
        Err(err) => {
            error!(tick, class = err.class(), error = %err, "tick failed");
            if let Some(source) = std::error::Error::source(&err) {
                error!(tick, cause = %source, "caused by");
            }
            None
        }
    }
}

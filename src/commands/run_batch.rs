use std::time::Duration;

use anyhow::{Context, Result};

use crate::cli::RunBatchArgs;
use crate::pipeline::{PipelineConfig, run_batch};
use crate::store::open_store;

pub fn run(args: RunBatchArgs) -> Result<()> {
    let db_path = args.store.resolve_db_path();
    let mut connection = open_store(&db_path, Duration::from_millis(args.batch.lock_wait_ms))?;
    let config = PipelineConfig::from(&args.batch);

    let outcome = run_batch(&mut connection, &config)
        .with_context(|| format!("batch run failed for {}", db_path.display()))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    }

    Ok(())
}

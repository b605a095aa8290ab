use std::time::Duration;

use anyhow::{Context, Result};
use tracing::info;

use crate::cli::InitArgs;
use crate::store::{DB_SCHEMA_VERSION, ensure_schema, open_store, read_bookmark};

pub fn run(args: InitArgs) -> Result<()> {
    let db_path = args.store.resolve_db_path();
    let connection = open_store(&db_path, Duration::from_secs(5))?;
    ensure_schema(&connection)?;

    let bookmark = read_bookmark(&connection)
        .context("failed to read bookmark after init")?
        .map(|value| value.last_processed_id)
        .unwrap_or_default();

    info!(
        path = %db_path.display(),
        schema_version = DB_SCHEMA_VERSION,
        bookmark,
        "store initialized"
    );

    Ok(())
}

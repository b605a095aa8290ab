use anyhow::{Context, Result};
use rusqlite::{Connection, OpenFlags};
use tracing::{info, warn};

use crate::cli::StatusArgs;
use crate::store::{count_aggregates, count_records, max_record_id, read_bookmark};

pub fn run(args: StatusArgs) -> Result<()> {
    let db_path = args.store.resolve_db_path();

    info!(path = %db_path.display(), "status requested");

    if !db_path.exists() {
        warn!(path = %db_path.display(), "database file missing");
        return Ok(());
    }

    let connection = Connection::open_with_flags(&db_path, OpenFlags::SQLITE_OPEN_READ_ONLY)
        .with_context(|| format!("failed to open {}", db_path.display()))?;

    let Some(bookmark) = read_bookmark(&connection).context("failed to read bookmark")? else {
        warn!(path = %db_path.display(), "bookmark missing; run `init` first");
        return Ok(());
    };

    let records = count_records(&connection).context("failed to count records")?;
    let max_id = max_record_id(&connection)
        .context("failed to read max record id")?
        .unwrap_or_default();
    let aggregates = count_aggregates(&connection).context("failed to count aggregates")?;

    info!(
        bookmark = bookmark.last_processed_id,
        records,
        max_record_id = max_id,
        pending_records = (max_id - bookmark.last_processed_id).max(0),
        aggregate_rows = aggregates,
        "store status"
    );

    Ok(())
}

//! SQLite persistence for raw scan records, the bookmark row and the
//! append-only aggregate history.

mod aggregates;
mod bookmark;
mod db_setup;
mod records;
#[cfg(test)]
mod tests;

pub(crate) use aggregates::{append_aggregates, count_aggregates, query_recent};
pub(crate) use bookmark::{read_bookmark, write_bookmark};
pub(crate) use db_setup::{ensure_schema, open_store};
pub(crate) use records::{append_record, count_records, fetch_range, max_record_id};

pub(crate) const DB_SCHEMA_VERSION: &str = "0.1.0";

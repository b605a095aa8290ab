use std::time::Duration;

use chrono::{TimeZone, Utc};
use rusqlite::Connection;

use super::*;
use crate::model::{Bookmark, BusinessAggregate};

fn in_memory_store() -> Connection {
    let connection = Connection::open_in_memory().expect("in-memory DB should open");
    ensure_schema(&connection).expect("schema should apply");
    connection
}

fn aggregate_row(business_id: i64, num_total: i64, minute: u32) -> BusinessAggregate {
    BusinessAggregate {
        business_id,
        num_total,
        total_value: num_total as f64 * 10.0,
        total_ocr_score: 0.5,
        total_ai_score: 0.25,
        computed_at: Utc
            .with_ymd_and_hms(2026, 3, 29, 12, minute, 0)
            .single()
            .expect("valid timestamp"),
    }
}

#[test]
fn ensure_schema_seeds_bookmark_once() {
    let connection = in_memory_store();
    assert_eq!(
        read_bookmark(&connection).expect("bookmark read"),
        Some(Bookmark::new(0))
    );

    write_bookmark(&connection, Bookmark::new(7)).expect("bookmark write");
    ensure_schema(&connection).expect("schema should re-apply");

    assert_eq!(
        read_bookmark(&connection).expect("bookmark read"),
        Some(Bookmark::new(7))
    );
}

#[test]
fn ensure_schema_records_schema_version() {
    let connection = in_memory_store();
    let version: String = connection
        .query_row(
            "SELECT value FROM metadata WHERE key = 'db_schema_version'",
            [],
            |row| row.get(0),
        )
        .expect("version row");
    assert_eq!(version, DB_SCHEMA_VERSION);
}

#[test]
fn append_record_assigns_increasing_ids_from_one() {
    let connection = in_memory_store();
    let first = append_record(&connection, r#"{"business_id":1}"#).expect("append");
    let second = append_record(&connection, r#"{"business_id":2}"#).expect("append");

    assert_eq!(first, 1);
    assert_eq!(second, 2);
    assert_eq!(max_record_id(&connection).expect("max id"), Some(2));
    assert_eq!(count_records(&connection).expect("count"), 2);
}

#[test]
fn max_record_id_is_none_for_empty_store() {
    let connection = in_memory_store();
    assert_eq!(max_record_id(&connection).expect("max id"), None);
}

#[test]
fn fetch_range_is_exclusive_low_inclusive_high_and_ordered() {
    let connection = in_memory_store();
    for business_id in 0..6 {
        append_record(&connection, &format!(r#"{{"business_id":{business_id}}}"#))
            .expect("append");
    }

    let records = fetch_range(&connection, 2, 5).expect("fetch");
    let ids = records.iter().map(|record| record.id).collect::<Vec<_>>();
    assert_eq!(ids, vec![3, 4, 5]);
    assert_eq!(records[0].payload, r#"{"business_id":2}"#);

    assert!(fetch_range(&connection, 6, 10).expect("fetch").is_empty());
}

#[test]
fn write_bookmark_never_moves_backwards() {
    let connection = in_memory_store();
    assert_eq!(
        write_bookmark(&connection, Bookmark::new(10)).expect("advance"),
        1
    );
    assert_eq!(
        write_bookmark(&connection, Bookmark::new(4)).expect("regress"),
        0
    );
    assert_eq!(
        read_bookmark(&connection).expect("bookmark read"),
        Some(Bookmark::new(10))
    );
}

#[test]
fn write_bookmark_reports_missing_row() {
    let connection = in_memory_store();
    connection
        .execute("DELETE FROM bookmark", [])
        .expect("delete bookmark");

    assert_eq!(read_bookmark(&connection).expect("bookmark read"), None);
    assert_eq!(
        write_bookmark(&connection, Bookmark::new(3)).expect("write"),
        0
    );
}

#[test]
fn query_recent_returns_newest_first_limited_to_business() {
    let connection = in_memory_store();
    append_aggregates(
        &connection,
        &[
            aggregate_row(1, 1, 0),
            aggregate_row(2, 9, 1),
            aggregate_row(1, 2, 2),
            aggregate_row(1, 3, 3),
        ],
    )
    .expect("append aggregates");

    let recent = query_recent(&connection, 1, 2).expect("query");
    let counts = recent.iter().map(|row| row.num_total).collect::<Vec<_>>();
    assert_eq!(counts, vec![3, 2]);
    assert!(recent.iter().all(|row| row.business_id == 1));
    assert_eq!(recent[0], aggregate_row(1, 3, 3));
    assert_eq!(count_aggregates(&connection).expect("count"), 4);
}

#[test]
fn query_recent_breaks_timestamp_ties_by_insertion_order() {
    let connection = in_memory_store();
    append_aggregates(
        &connection,
        &[aggregate_row(5, 1, 30), aggregate_row(5, 2, 30)],
    )
    .expect("append aggregates");

    let recent = query_recent(&connection, 5, 5).expect("query");
    let counts = recent.iter().map(|row| row.num_total).collect::<Vec<_>>();
    assert_eq!(counts, vec![2, 1]);
}

#[test]
fn query_recent_is_empty_for_unknown_business() {
    let connection = in_memory_store();
    assert!(query_recent(&connection, 42, 5).expect("query").is_empty());
}

#[test]
fn open_store_creates_parent_directory() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db_path = dir.path().join("nested").join("store.sqlite");

    let connection = open_store(&db_path, Duration::from_millis(100)).expect("open store");
    ensure_schema(&connection).expect("schema");

    assert!(db_path.exists());
}

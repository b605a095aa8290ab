use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OpenFlags};
use serde::Serialize;
use tracing::info;

use crate::cli::ReportArgs;
use crate::model::BusinessAggregate;
use crate::store::query_recent;
use crate::util::{round_to, write_json_pretty};

/// Summary over the most recent aggregate rows of one business.
///
/// Built from "most recent N" rows rather than a unique row per batch, so a
/// duplicate row left by a crash-and-replay shifts the window but never fails
/// the report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct BusinessReport {
    pub(crate) business_id: i64,
    pub(crate) start_time: DateTime<Utc>,
    pub(crate) end_time: DateTime<Utc>,
    pub(crate) batches: usize,
    pub(crate) num_receipts: i64,
    pub(crate) total_sale: f64,
    pub(crate) avg_sale: Option<f64>,
    pub(crate) avg_ai_score: Option<f64>,
    pub(crate) avg_ocr_score: Option<f64>,
}

pub fn run(args: ReportArgs) -> Result<()> {
    let db_path = args.store.resolve_db_path();
    let connection = open_read_only(&db_path)?;

    let rows = query_recent(&connection, args.business_id, args.limit).with_context(|| {
        format!(
            "failed to load recent aggregates for business {}",
            args.business_id
        )
    })?;
    let report = summarize(args.business_id, &rows);

    match &report {
        Some(report) => info!(
            business_id = report.business_id,
            start_time = %report.start_time,
            end_time = %report.end_time,
            batches = report.batches,
            num_receipts = report.num_receipts,
            total_sale = report.total_sale,
            avg_sale = ?report.avg_sale,
            avg_ai_score = ?report.avg_ai_score,
            avg_ocr_score = ?report.avg_ocr_score,
            "business report"
        ),
        None => info!(business_id = args.business_id, "no aggregates yet for business"),
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    if let Some(path) = &args.output {
        write_json_pretty(path, &report)?;
        info!(path = %path.display(), "wrote business report");
    }

    Ok(())
}

/// Reading never provisions storage: a missing database is an error, not a new file.
fn open_read_only(db_path: &Path) -> Result<Connection> {
    if !db_path.exists() {
        bail!(
            "database file missing: {} (run `init` first)",
            db_path.display()
        );
    }

    Connection::open_with_flags(db_path, OpenFlags::SQLITE_OPEN_READ_ONLY)
        .with_context(|| format!("failed to open {}", db_path.display()))
}

/// `rows` must be newest first. `None` means the business has no rows yet.
pub(crate) fn summarize(business_id: i64, rows: &[BusinessAggregate]) -> Option<BusinessReport> {
    let (newest, oldest) = (rows.first()?, rows.last()?);

    let num_receipts = rows.iter().map(|row| row.num_total).sum::<i64>();
    let total_sale = rows.iter().map(|row| row.total_value).sum::<f64>();
    let total_ai_score = rows.iter().map(|row| row.total_ai_score).sum::<f64>();
    let total_ocr_score = rows.iter().map(|row| row.total_ocr_score).sum::<f64>();

    let average = |sum: f64| (num_receipts > 0).then(|| round_to(sum / num_receipts as f64, 2));

    Some(BusinessReport {
        business_id,
        start_time: oldest.computed_at,
        end_time: newest.computed_at,
        batches: rows.len(),
        num_receipts,
        total_sale: round_to(total_sale, 2),
        avg_sale: average(total_sale),
        avg_ai_score: average(total_ai_score),
        avg_ocr_score: average(total_ocr_score),
    })
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn row(num_total: i64, total_value: f64, hour: u32) -> BusinessAggregate {
        BusinessAggregate {
            business_id: 3,
            num_total,
            total_value,
            total_ocr_score: num_total as f64 * 0.5,
            total_ai_score: num_total as f64 * 0.25,
            computed_at: Utc
                .with_ymd_and_hms(2026, 3, 29, hour, 0, 0)
                .single()
                .expect("valid timestamp"),
        }
    }

    #[test]
    fn open_read_only_leaves_missing_database_uncreated() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db_path = dir.path().join("never-initialized").join("store.sqlite");

        assert!(open_read_only(&db_path).is_err());
        assert!(!db_path.exists());
        assert!(!db_path.parent().expect("parent").exists());
    }

    #[test]
    fn open_read_only_reads_initialized_store() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db_path = dir.path().join("store.sqlite");
        let writer = crate::store::open_store(&db_path, std::time::Duration::from_millis(100))
            .expect("open store");
        crate::store::ensure_schema(&writer).expect("schema");

        let reader = open_read_only(&db_path).expect("read-only open");
        assert!(query_recent(&reader, 1, 5).expect("query").is_empty());
        assert!(
            reader
                .execute("DELETE FROM business_aggregates", [])
                .is_err()
        );
    }

    #[test]
    fn summarize_returns_none_without_rows() {
        assert_eq!(summarize(3, &[]), None);
    }

    #[test]
    fn summarize_averages_over_receipts() {
        let rows = vec![row(3, 300.0, 14), row(1, 101.0, 13)];
        let report = summarize(3, &rows).expect("report");

        assert_eq!(report.batches, 2);
        assert_eq!(report.num_receipts, 4);
        assert_eq!(report.total_sale, 401.0);
        assert_eq!(report.avg_sale, Some(100.25));
        assert_eq!(report.avg_ai_score, Some(0.25));
        assert_eq!(report.avg_ocr_score, Some(0.5));
        assert_eq!(report.start_time, rows[1].computed_at);
        assert_eq!(report.end_time, rows[0].computed_at);
    }

    #[test]
    fn summarize_guards_against_zero_receipts() {
        let report = summarize(3, &[row(0, 0.0, 9)]).expect("report");

        assert_eq!(report.num_receipts, 0);
        assert_eq!(report.avg_sale, None);
        assert_eq!(report.avg_ai_score, None);
        assert_eq!(report.avg_ocr_score, None);
    }

    #[test]
    fn empty_report_serializes_as_null() {
        let encoded = serde_json::to_string(&summarize(3, &[])).expect("serialize");
        assert_eq!(encoded, "null");
    }
}

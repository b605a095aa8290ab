use rusqlite::{Connection, params};

use crate::model::BusinessAggregate;

pub(crate) fn append_aggregates(
    connection: &Connection,
    rows: &[BusinessAggregate],
) -> rusqlite::Result<usize> {
    let mut statement = connection.prepare_cached(
        "
        INSERT INTO business_aggregates(
          business_id, num_total, total_value, total_ocr_score, total_ai_score, computed_at
        )
        VALUES(?1, ?2, ?3, ?4, ?5, ?6)
        ",
    )?;

    for row in rows {
        statement.execute(params![
            row.business_id,
            row.num_total,
            row.total_value,
            row.total_ocr_score,
            row.total_ai_score,
            row.computed_at,
        ])?;
    }

    Ok(rows.len())
}

/// Most recent `limit` rows for one business, newest first. Rows sharing a
/// timestamp are ordered by insertion, latest first.
pub(crate) fn query_recent(
    connection: &Connection,
    business_id: i64,
    limit: u32,
) -> rusqlite::Result<Vec<BusinessAggregate>> {
    let mut statement = connection.prepare_cached(
        "
        SELECT business_id, num_total, total_value, total_ocr_score, total_ai_score, computed_at
        FROM business_aggregates
        WHERE business_id = ?1
        ORDER BY computed_at DESC, aggregate_id DESC
        LIMIT ?2
        ",
    )?;

    let rows = statement.query_map(params![business_id, limit], |row| {
        Ok(BusinessAggregate {
            business_id: row.get(0)?,
            num_total: row.get(1)?,
            total_value: row.get(2)?,
            total_ocr_score: row.get(3)?,
            total_ai_score: row.get(4)?,
            computed_at: row.get(5)?,
        })
    })?;

    rows.collect()
}

pub(crate) fn count_aggregates(connection: &Connection) -> rusqlite::Result<i64> {
    connection.query_row("SELECT COUNT(*) FROM business_aggregates", [], |row| {
        row.get(0)
    })
}

use std::collections::BTreeMap;

use tracing::warn;

use crate::cli::MalformedPolicy;
use crate::error::PipelineError;
use crate::model::{BusinessTotals, Field, Payload, Record};

pub(crate) type BatchTotals = BTreeMap<i64, BusinessTotals>;

#[derive(Debug, Default)]
pub(crate) struct Aggregation {
    pub(crate) totals: BatchTotals,
    pub(crate) records_aggregated: usize,
    pub(crate) records_skipped: usize,
}

/// Folds the aggregatable field of every record into per-business totals.
///
/// Records are visited in ascending id order whatever order they arrive in, so
/// the same record set always produces bit-identical floating point sums.
pub(crate) fn aggregate(
    records: &[Record],
    field_name: &str,
    policy: MalformedPolicy,
) -> Result<Aggregation, PipelineError> {
    let mut ordered = records.iter().collect::<Vec<_>>();
    ordered.sort_by_key(|record| record.id);

    let mut aggregation = Aggregation::default();
    for record in ordered {
        let (business_id, field) = match parse_record(record, field_name) {
            Ok(parsed) => parsed,
            Err(err) if policy == MalformedPolicy::Skip => {
                warn!(record_id = record.id, error = %err, "skipping malformed record");
                aggregation.records_skipped += 1;
                continue;
            }
            Err(err) => return Err(err),
        };

        fold_field(&mut aggregation.totals, business_id, &field);
        aggregation.records_aggregated += 1;
    }

    Ok(aggregation)
}

fn parse_record(record: &Record, field_name: &str) -> Result<(i64, Field), PipelineError> {
    let payload: Payload =
        serde_json::from_str(&record.payload).map_err(|err| PipelineError::MalformedRecord {
            record_id: record.id,
            reason: format!("unreadable payload: {err}"),
        })?;

    let field = payload
        .field(field_name)
        .map_err(|err| PipelineError::MalformedRecord {
            record_id: record.id,
            reason: format!("field `{field_name}`: {err}"),
        })?;

    Ok((payload.business_id, field))
}

/// An absent field leaves the map untouched. A list registers its business
/// even when every entry is null.
pub(crate) fn fold_field(totals: &mut BatchTotals, business_id: i64, field: &Field) {
    match field {
        Field::Absent => {}
        Field::Single(result) => totals_for(totals, business_id).fold(result),
        Field::Many(entries) => {
            let business = totals_for(totals, business_id);
            for result in entries.iter().flatten() {
                business.fold(result);
            }
        }
    }
}

fn totals_for(totals: &mut BatchTotals, business_id: i64) -> &mut BusinessTotals {
    totals.entry(business_id).or_default()
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One raw scan document as stored by the producer. `payload` is the JSON text
/// exactly as appended; the pipeline parses it lazily.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub id: i64,
    pub payload: String,
}

/// A single extracted value with model and OCR confidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    pub value: f64,
    pub score: f64,
    pub ocr_score: f64,
    #[serde(default)]
    pub bounding_box: [f64; 4],
}

/// Shape of one payload field: `null`, one result, or a list whose entries may be `null`.
///
/// Only serialized through serde; reading goes through [`Payload::field`], which
/// insists on JSON objects for results.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(untagged)]
pub enum Field {
    #[default]
    Absent,
    Single(ScanResult),
    Many(Vec<Option<ScanResult>>),
}

/// Document body of a record. Only `business_id` is typed; every other key is
/// kept raw so that a field is validated only when something aggregates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payload {
    pub business_id: i64,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Payload {
    pub fn new(business_id: i64) -> Self {
        Self {
            business_id,
            fields: Map::new(),
        }
    }

    pub fn with_field(mut self, name: &str, field: &Field) -> serde_json::Result<Self> {
        self.fields
            .insert(name.to_string(), serde_json::to_value(field)?);
        Ok(self)
    }

    /// Missing keys read as [`Field::Absent`]. A result must be a JSON object;
    /// serde would otherwise accept a positional array for a struct.
    pub fn field(&self, name: &str) -> serde_json::Result<Field> {
        match self.fields.get(name) {
            None | Some(Value::Null) => Ok(Field::Absent),
            Some(value @ Value::Object(_)) => ScanResult::deserialize(value).map(Field::Single),
            Some(Value::Array(entries)) => entries
                .iter()
                .map(list_entry)
                .collect::<serde_json::Result<Vec<_>>>()
                .map(Field::Many),
            Some(other) => Err(unexpected_shape(other)),
        }
    }
}

fn list_entry(value: &Value) -> serde_json::Result<Option<ScanResult>> {
    match value {
        Value::Null => Ok(None),
        Value::Object(_) => ScanResult::deserialize(value).map(Some),
        other => Err(unexpected_shape(other)),
    }
}

fn unexpected_shape(value: &Value) -> serde_json::Error {
    serde::de::Error::custom(format!(
        "expected null, a scan result object or a list of them, found {value}"
    ))
}

/// Persisted cursor: the highest record id already folded into aggregates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Bookmark {
    pub last_processed_id: i64,
}

impl Bookmark {
    pub fn new(last_processed_id: i64) -> Self {
        Self { last_processed_id }
    }

    /// The fixed-width id window that follows this bookmark.
    pub fn next_range(self, batch_size: u32) -> BatchRange {
        BatchRange {
            start_exclusive: self.last_processed_id,
            end_inclusive: self.last_processed_id + i64::from(batch_size),
        }
    }
}

/// Half-open id window `(start_exclusive, end_inclusive]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BatchRange {
    pub start_exclusive: i64,
    pub end_inclusive: i64,
}

impl BatchRange {
    pub fn contains(&self, record_id: i64) -> bool {
        record_id > self.start_exclusive && record_id <= self.end_inclusive
    }
}

/// Running totals for one business inside one batch, before a timestamp is attached.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct BusinessTotals {
    pub num_total: i64,
    pub total_value: f64,
    pub total_ocr_score: f64,
    pub total_ai_score: f64,
}

impl BusinessTotals {
    pub fn fold(&mut self, result: &ScanResult) {
        self.num_total += 1;
        self.total_value += result.value;
        self.total_ai_score += result.score;
        self.total_ocr_score += result.ocr_score;
    }

    pub fn stamp(self, business_id: i64, computed_at: DateTime<Utc>) -> BusinessAggregate {
        BusinessAggregate {
            business_id,
            num_total: self.num_total,
            total_value: self.total_value,
            total_ocr_score: self.total_ocr_score,
            total_ai_score: self.total_ai_score,
            computed_at,
        }
    }
}

/// One row of the append-only aggregate history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BusinessAggregate {
    pub business_id: i64,
    pub num_total: i64,
    pub total_value: f64,
    pub total_ocr_score: f64,
    pub total_ai_score: f64,
    pub computed_at: DateTime<Utc>,
}

use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rusqlite::Connection;
use tracing::{info, warn};

use crate::cli::ProduceArgs;
use crate::model::{Field, Payload, ScanResult};
use crate::store::{append_record, ensure_schema, open_store};

const BUSINESS_COUNT: i64 = 10;
const LINE_ITEM_COUNT: usize = 9;
const PRODUCED_FIELDS: [&str; 2] = ["total", "line_items"];

pub fn run(args: ProduceArgs) -> Result<()> {
    let db_path = args.store.resolve_db_path();
    let mut connection = open_store(&db_path, Duration::from_secs(5))?;
    ensure_schema(&connection)?;

    let rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let mut generator = ScanGenerator::new(rng);

    info!(path = %db_path.display(), count = args.count, "producing scan records");

    let tx = connection.transaction()?;
    let mut last_id = 0;
    for _ in 0..args.count {
        let payload = generator.next_payload()?;
        last_id = append_payload(&tx, &payload)?;
    }
    tx.commit().context("failed to commit produced records")?;

    info!(count = args.count, last_record_id = last_id, "produced scan records");

    if !args.follow {
        return Ok(());
    }

    let interval = Duration::from_millis(args.interval_ms);
    info!(interval_ms = args.interval_ms, "following: appending one record per interval");
    loop {
        thread::sleep(interval);
        let payload = generator.next_payload()?;
        match append_payload(&connection, &payload) {
            Ok(record_id) => info!(record_id, business_id = payload.business_id, "appended record"),
            Err(err) => warn!(error = %err, "append failed; retrying next interval"),
        }
    }
}

fn append_payload(connection: &Connection, payload: &Payload) -> Result<i64> {
    let encoded = serde_json::to_string(payload).context("failed to encode payload")?;
    append_record(connection, &encoded).context("failed to append scan record")
}

/// Synthetic receipt scans: a random business, and for each produced field
/// either a lone result-or-null or a list of results-or-null.
pub(crate) struct ScanGenerator<R> {
    rng: R,
}

impl<R: Rng> ScanGenerator<R> {
    pub(crate) fn new(rng: R) -> Self {
        Self { rng }
    }

    pub(crate) fn next_payload(&mut self) -> serde_json::Result<Payload> {
        let choices = [
            self.maybe_result().map_or(Field::Absent, Field::Single),
            Field::Many(
                (0..LINE_ITEM_COUNT)
                    .map(|_| self.maybe_result())
                    .collect(),
            ),
        ];

        let mut payload = Payload::new(self.rng.random_range(0..BUSINESS_COUNT));
        for name in PRODUCED_FIELDS {
            let pick = self.rng.random_range(0..=9usize) % choices.len();
            payload = payload.with_field(name, &choices[pick])?;
        }

        Ok(payload)
    }

    fn maybe_result(&mut self) -> Option<ScanResult> {
        if self.rng.random_range(0..=10) <= 5 {
            return None;
        }

        Some(ScanResult {
            value: f64::from(self.rng.random_range(0..=1000u32)),
            score: self.unit_2dp(),
            ocr_score: self.unit_2dp(),
            bounding_box: self.bounding_box(),
        })
    }

    /// `[x1, y1, x2, y2]` with a strictly positive area.
    fn bounding_box(&mut self) -> [f64; 4] {
        loop {
            let corners = [
                self.unit_2dp(),
                self.unit_2dp(),
                self.unit_2dp(),
                self.unit_2dp(),
            ];
            if corners[0] < corners[2] && corners[1] < corners[3] {
                return corners;
            }
        }
    }

    fn unit_2dp(&mut self) -> f64 {
        crate::util::round_to(self.rng.random::<f64>(), 2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::MalformedPolicy;
    use crate::pipeline::{PipelineConfig, run_batch};

    fn seeded(seed: u64) -> ScanGenerator<StdRng> {
        ScanGenerator::new(StdRng::seed_from_u64(seed))
    }

    #[test]
    fn generated_payloads_have_expected_shape() {
        let mut generator = seeded(7);
        for _ in 0..200 {
            let payload = generator.next_payload().expect("payload");
            assert!((0..BUSINESS_COUNT).contains(&payload.business_id));

            for name in PRODUCED_FIELDS {
                let results = match payload.field(name).expect("field parses") {
                    Field::Absent => Vec::new(),
                    Field::Single(result) => vec![result],
                    Field::Many(entries) => {
                        assert_eq!(entries.len(), LINE_ITEM_COUNT);
                        entries.into_iter().flatten().collect()
                    }
                };

                for result in results {
                    assert!((0.0..=1000.0).contains(&result.value));
                    assert!((0.0..=1.0).contains(&result.score));
                    assert!((0.0..=1.0).contains(&result.ocr_score));
                    let [x1, y1, x2, y2] = result.bounding_box;
                    assert!(x1 < x2 && y1 < y2);
                }
            }
        }
    }

    #[test]
    fn seeded_generators_are_reproducible() {
        let mut first = seeded(42);
        let mut second = seeded(42);
        for _ in 0..20 {
            assert_eq!(
                first.next_payload().expect("payload"),
                second.next_payload().expect("payload")
            );
        }
    }

    #[test]
    fn produced_records_aggregate_without_errors() {
        let mut connection = Connection::open_in_memory().expect("in-memory DB should open");
        ensure_schema(&connection).expect("schema");

        let mut generator = seeded(3);
        for _ in 0..60 {
            let payload = generator.next_payload().expect("payload");
            append_payload(&connection, &payload).expect("append");
        }

        let config = PipelineConfig {
            batch_size: 25,
            aggregatable_field: "total".to_string(),
            malformed_policy: MalformedPolicy::Strict,
        };
        let selected = (0..3)
            .map(|_| run_batch(&mut connection, &config).expect("run succeeds"))
            .map(|outcome| outcome.records_selected)
            .sum::<usize>();
        assert_eq!(selected, 60);
    }
}

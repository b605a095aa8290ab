//! One pipeline run: pick the next id window after the bookmark, fold its
//! payloads into per-business totals, then persist the totals and the advanced
//! bookmark in a single transaction.

mod aggregator;
mod committer;
mod run;
mod selector;

pub(crate) use run::{BatchOutcome, PipelineConfig, run_batch};

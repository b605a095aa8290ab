use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(
    name = "scan-rollup",
    version,
    about = "Incremental per-business rollups over a stream of document scans"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Init(InitArgs),
    Produce(ProduceArgs),
    RunBatch(RunBatchArgs),
    Schedule(ScheduleArgs),
    Report(ReportArgs),
    Status(StatusArgs),
}

#[derive(Args, Debug, Clone)]
pub struct StoreArgs {
    #[arg(long, default_value = ".cache/scan-rollup")]
    pub cache_root: PathBuf,

    #[arg(long, env = "SCAN_ROLLUP_DB")]
    pub db_path: Option<PathBuf>,
}

impl StoreArgs {
    pub fn resolve_db_path(&self) -> PathBuf {
        self.db_path
            .clone()
            .unwrap_or_else(|| self.cache_root.join("scan_rollup.sqlite"))
    }
}

#[derive(Args, Debug, Clone)]
pub struct InitArgs {
    #[command(flatten)]
    pub store: StoreArgs,
}

#[derive(Args, Debug, Clone)]
pub struct ProduceArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    #[arg(long, default_value_t = 100)]
    pub count: usize,

    #[arg(long)]
    pub seed: Option<u64>,

    /// Keep appending one record per interval after the initial count.
    #[arg(long, default_value_t = false)]
    pub follow: bool,

    #[arg(long, default_value_t = 3000)]
    pub interval_ms: u64,
}

/// How the aggregator treats a record whose payload cannot be parsed.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum MalformedPolicy {
    /// Abort the whole batch without committing.
    Strict,
    /// Log the record, leave it out of the totals, keep going.
    Skip,
}

impl MalformedPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Strict => "strict",
            Self::Skip => "skip",
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct BatchArgs {
    #[arg(
        long,
        env = "SCAN_ROLLUP_BATCH_SIZE",
        default_value_t = 1200,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub batch_size: u32,

    #[arg(long, default_value = "total")]
    pub aggregatable_field: String,

    #[arg(long = "malformed", value_enum, default_value_t = MalformedPolicy::Strict)]
    pub malformed_policy: MalformedPolicy,

    #[arg(long, default_value_t = 5000)]
    pub lock_wait_ms: u64,
}

#[derive(Args, Debug, Clone)]
pub struct RunBatchArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    #[command(flatten)]
    pub batch: BatchArgs,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ScheduleArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    #[command(flatten)]
    pub batch: BatchArgs,

    #[arg(long, default_value_t = 3600)]
    pub interval_secs: u64,

    #[arg(long)]
    pub max_ticks: Option<u64>,
}

#[derive(Args, Debug, Clone)]
pub struct ReportArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    #[arg(long)]
    pub business_id: i64,

    #[arg(long, default_value_t = 5)]
    pub limit: u32,

    #[arg(long, default_value_t = false)]
    pub json: bool,

    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    #[command(flatten)]
    pub store: StoreArgs,
}

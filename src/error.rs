use thiserror::Error;

/// Failure classes of a single pipeline run. None of them leave the bookmark advanced.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The store could not be reached or read. Retry the whole run on the next tick.
    #[error("record store unavailable while {operation}")]
    TransientStore {
        operation: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    /// A payload failed to parse or lacks required fields. Needs an upstream data fix.
    #[error("record {record_id} is malformed: {reason}")]
    MalformedRecord { record_id: i64, reason: String },

    /// Write-back failed; the transaction was rolled back.
    #[error("failed to commit batch ending at record {range_end}")]
    Commit {
        range_end: i64,
        #[source]
        source: rusqlite::Error,
    },

    #[error("another batch run holds the bookmark lock")]
    RunInProgress,

    #[error("bookmark row is missing; run `init` first")]
    BookmarkMissing,
}

impl PipelineError {
    pub fn transient(operation: &'static str) -> impl FnOnce(rusqlite::Error) -> Self {
        move |source| Self::TransientStore { operation, source }
    }

    pub fn commit(range_end: i64) -> impl FnOnce(rusqlite::Error) -> Self {
        move |source| Self::Commit { range_end, source }
    }

    /// Short label used in log fields.
    pub fn class(&self) -> &'static str {
        match self {
            Self::TransientStore { .. } => "transient_store",
            Self::MalformedRecord { .. } => "malformed_record",
            Self::Commit { .. } => "commit",
            Self::RunInProgress => "run_in_progress",
            Self::BookmarkMissing => "bookmark_missing",
        }
    }
}

use chrono::{DateTime, Utc};

use scorebook_store::StoreError;

use crate::summary::RunSummary;

/// Run-level failures. Per-match problems never surface here; they are
/// recorded in [`RunSummary::errors`].
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    /// Another run holds the lease.
    #[error("reconciliation already in progress (lease held by {owner} until {expires_at})")]
    InProgress {
        owner: String,
        expires_at: DateTime<Utc>,
    },

    /// Storage failed mid-run. Work up to the failure is durable and
    /// consistent; the next run resumes from the ledger.
    #[error("storage unavailable: {source}")]
    StorageUnavailable {
        #[source]
        source: StoreError,
        summary: Box<RunSummary>,
    },

    /// The lease expired and was claimed by another owner mid-run.
    #[error("reconciliation lease was lost mid-run")]
    LeaseLost { summary: Box<RunSummary> },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ReconcileError {
    /// Work completed before the run stopped, if it got that far.
    pub fn summary(&self) -> Option<&RunSummary> {
        match self {
            Self::StorageUnavailable { summary, .. } | Self::LeaseLost { summary } => Some(summary),
            Self::InProgress { .. } | Self::Config(_) => None,
        }
    }
}

pub type ReconcileResult<T> = Result<T, ReconcileError>;

use scorebook_store::StoreError;
use scorebook_types::{MatchId, TypeError};

/// Errors produced by ledger operations.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// The ledger cannot prove which scorecard a recorded match contributed,
    /// so its contribution cannot be retracted.
    #[error("ledger inconsistency for match {match_id}: {reason}")]
    Inconsistent { match_id: MatchId, reason: String },

    #[error("fingerprint error: {0}")]
    Fingerprint(#[from] TypeError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

pub type LedgerResult<T> = Result<T, LedgerError>;

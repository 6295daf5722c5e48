use std::fmt;

use serde::Serialize;

use scorebook_types::MatchId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    Incremental,
    Full,
}

/// Why a run cleared and rebuilt every derived table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum RebuildReason {
    /// A full run was requested.
    Requested,
    /// An earlier run stopped between journaling and completing work.
    InterruptedRun { intents: Vec<String> },
    /// Ledger entries exist for matches that are gone or no longer completed.
    OrphanedEntries { match_ids: Vec<MatchId> },
    /// The previous contribution of a corrected match cannot be recovered.
    LedgerInconsistency { match_id: MatchId, reason: String },
}

impl fmt::Display for RebuildReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Requested => f.write_str("full run requested"),
            Self::InterruptedRun { intents } => {
                write!(f, "interrupted run left {} intent(s)", intents.len())
            }
            Self::OrphanedEntries { match_ids } => {
                write!(f, "{} orphaned ledger entries", match_ids.len())
            }
            Self::LedgerInconsistency { match_id, reason } => {
                write!(f, "ledger inconsistency for {match_id}: {reason}")
            }
        }
    }
}

/// A match that could not be folded in this run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MatchFailure {
    pub match_id: MatchId,
    pub reason: String,
}

/// What a run did.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub mode: RunMode,
    pub matches_scanned: usize,
    /// Matches whose contribution was written, reprocessed ones included.
    pub matches_processed: usize,
    /// Of `matches_processed`, those that replaced an older contribution.
    pub matches_reprocessed: usize,
    pub matches_skipped: usize,
    pub matches_failed: usize,
    pub rebuild: Option<RebuildReason>,
    pub errors: Vec<MatchFailure>,
}

impl RunSummary {
    pub fn new(mode: RunMode) -> Self {
        Self {
            mode,
            matches_scanned: 0,
            matches_processed: 0,
            matches_reprocessed: 0,
            matches_skipped: 0,
            matches_failed: 0,
            rebuild: None,
            errors: Vec::new(),
        }
    }

    pub fn record_failure(&mut self, match_id: &MatchId, reason: impl Into<String>) {
        self.matches_failed += 1;
        self.errors.push(MatchFailure {
            match_id: match_id.clone(),
            reason: reason.into(),
        });
    }

    /// Forget per-match counts ahead of a rebuild that supersedes them.
    pub(crate) fn restart(&mut self, reason: RebuildReason) {
        *self = Self {
            rebuild: Some(reason),
            ..Self::new(self.mode)
        };
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "scanned {}, processed {} ({} reprocessed), skipped {}, failed {}",
            self.matches_scanned,
            self.matches_processed,
            self.matches_reprocessed,
            self.matches_skipped,
            self.matches_failed
        )?;
        if let Some(reason) = &self.rebuild {
            write!(f, "; rebuilt: {reason}")?;
        }
        Ok(())
    }
}

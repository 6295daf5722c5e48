use chrono::{DateTime, Utc};

use scorebook_stats::{PlayerKey, PlayerStatLine, TeamStanding};
use scorebook_types::{Match, MatchId, MatchStatus, TeamId};

use crate::error::StoreResult;
use crate::records::{Intent, JournalEntry, Lease, LeaseGrant, ProcessedMatchRecord, ScorecardSnapshot};

/// Raw match documents, owned by the surrounding application.
///
/// Read-only for the engine apart from the optional status side signal.
pub trait MatchStore: Send + Sync {
    /// Point read. Returns `Ok(None)` if the match does not exist.
    fn get_match(&self, id: &MatchId) -> StoreResult<Option<Match>>;

    /// Bulk scan of every match in `status`, in match id order.
    fn scan_by_status(&self, status: MatchStatus) -> StoreResult<Vec<Match>>;

    /// Transition a match's status. Returns `false` if the match is gone.
    fn set_status(&self, id: &MatchId, status: MatchStatus) -> StoreResult<bool>;

    /// Every match whose scorecard contributes to statistics, once each.
    ///
    /// The per-status scans are not one snapshot, so a match whose status
    /// flips between them can show up twice.
    fn scan_completed(&self) -> StoreResult<Vec<Match>> {
        let mut all = Vec::new();
        for status in MatchStatus::COMPLETED {
            all.extend(self.scan_by_status(status)?);
        }
        all.sort_by(|a, b| a.id.cmp(&b.id));
        all.dedup_by(|a, b| a.id == b.id);
        Ok(all)
    }
}

/// Derived standings and player statistic lines.
pub trait StatsStore: Send + Sync {
    fn get_standing(&self, team: &TeamId) -> StoreResult<Option<TeamStanding>>;

    /// Upsert by team id.
    fn put_standing(&self, row: &TeamStanding) -> StoreResult<()>;

    /// Returns `true` if the row existed.
    fn delete_standing(&self, team: &TeamId) -> StoreResult<bool>;

    /// All standings in team id order.
    fn list_standings(&self) -> StoreResult<Vec<TeamStanding>>;

    fn get_player_line(&self, key: &PlayerKey) -> StoreResult<Option<PlayerStatLine>>;

    /// Upsert by (season, team, player).
    fn put_player_line(&self, row: &PlayerStatLine) -> StoreResult<()>;

    /// Returns `true` if the row existed.
    fn delete_player_line(&self, key: &PlayerKey) -> StoreResult<bool>;

    /// All player lines in key order.
    fn list_player_lines(&self) -> StoreResult<Vec<PlayerStatLine>>;

    /// Drop every standing and player line.
    fn clear_stats(&self) -> StoreResult<()>;
}

/// Processed-match ledger, retained scorecards, and the intent journal.
pub trait LedgerStore: Send + Sync {
    fn get_record(&self, id: &MatchId) -> StoreResult<Option<ProcessedMatchRecord>>;

    /// Insert or replace by match id.
    fn put_record(&self, record: &ProcessedMatchRecord) -> StoreResult<()>;

    /// All records in match id order.
    fn list_records(&self) -> StoreResult<Vec<ProcessedMatchRecord>>;

    /// Returns `true` if the record existed.
    fn remove_record(&self, id: &MatchId) -> StoreResult<bool>;

    fn clear_records(&self) -> StoreResult<()>;

    fn get_snapshot(&self, id: &MatchId) -> StoreResult<Option<ScorecardSnapshot>>;

    /// Insert or replace by match id.
    fn put_snapshot(&self, snapshot: &ScorecardSnapshot) -> StoreResult<()>;

    /// Returns `true` if a snapshot was retained.
    fn remove_snapshot(&self, id: &MatchId) -> StoreResult<bool>;

    fn clear_snapshots(&self) -> StoreResult<()>;

    /// Insert or replace by [`Intent::key`].
    fn put_intent(&self, entry: &JournalEntry) -> StoreResult<()>;

    /// Returns `true` if the intent was journaled.
    fn remove_intent(&self, intent: &Intent) -> StoreResult<bool>;

    /// All journaled intents in key order.
    fn list_intents(&self) -> StoreResult<Vec<JournalEntry>>;
}

/// The single exclusive reconciliation lease.
///
/// Acquisition is a compare-and-set on one record; implementations apply
/// [`LeaseGrant::decide`] atomically with respect to other callers.
pub trait LeaseStore: Send + Sync {
    fn try_acquire(
        &self,
        owner: &str,
        run_id: &str,
        now: DateTime<Utc>,
        ttl: chrono::Duration,
    ) -> StoreResult<LeaseGrant>;

    /// Extend the lease held by `run_id`. Returns `false` if the lease is
    /// gone or now belongs to another run.
    fn renew(&self, run_id: &str, now: DateTime<Utc>, ttl: chrono::Duration) -> StoreResult<bool>;

    /// Give the lease up. Returns `false` if `run_id` did not hold it.
    fn release(&self, run_id: &str) -> StoreResult<bool>;

    fn current(&self) -> StoreResult<Option<Lease>>;
}

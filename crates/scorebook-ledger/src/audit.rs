use std::collections::BTreeMap;

use serde::Serialize;

use scorebook_store::{JournalEntry, LedgerStore, MatchStore};
use scorebook_types::MatchId;

use crate::error::{LedgerError, LedgerResult};
use crate::ledger::{ProcessedLedger, ProcessedState};

/// Read-only comparison of the ledger against the match record store.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct AuditReport {
    /// Completed matches inspected.
    pub scanned: usize,
    /// Completed matches recorded with their present fingerprint.
    pub current: Vec<MatchId>,
    /// Completed matches never folded in.
    pub unprocessed: Vec<MatchId>,
    /// Completed matches recorded with an older fingerprint.
    pub stale: Vec<MatchId>,
    /// Ledger entries whose retained scorecard is missing or does not hash
    /// to the recorded fingerprint.
    pub missing_snapshots: Vec<MatchId>,
    /// Ledger entries whose match is gone or no longer completed.
    pub orphaned: Vec<MatchId>,
    /// Journal entries left by interrupted runs.
    pub pending_intents: Vec<JournalEntry>,
}

impl AuditReport {
    /// True when an incremental run cannot reconcile the current state and
    /// only a full rebuild can restore consistency.
    pub fn needs_rebuild(&self) -> bool {
        !self.orphaned.is_empty()
            || !self.pending_intents.is_empty()
            || self
                .stale
                .iter()
                .any(|id| self.missing_snapshots.contains(id))
    }

    /// True when the statistics fully reflect every completed match.
    pub fn is_clean(&self) -> bool {
        self.unprocessed.is_empty()
            && self.stale.is_empty()
            && self.missing_snapshots.is_empty()
            && self.orphaned.is_empty()
            && self.pending_intents.is_empty()
    }
}

/// Builds [`AuditReport`]s.
pub struct LedgerAuditor;

impl LedgerAuditor {
    pub fn audit<M, L>(matches: &M, ledger: &ProcessedLedger<L>) -> LedgerResult<AuditReport>
    where
        M: MatchStore + ?Sized,
        L: LedgerStore,
    {
        let completed = matches.scan_completed()?;
        let mut records: BTreeMap<MatchId, _> = ledger
            .records()?
            .into_iter()
            .map(|r| (r.match_id.clone(), r))
            .collect();

        let mut report = AuditReport {
            scanned: completed.len(),
            pending_intents: ledger.pending_intents()?,
            ..AuditReport::default()
        };

        for m in &completed {
            let fingerprint = m.fingerprint()?;
            match ledger.is_processed(&m.id, &fingerprint)? {
                ProcessedState::Absent => report.unprocessed.push(m.id.clone()),
                ProcessedState::Current(_) => report.current.push(m.id.clone()),
                ProcessedState::Stale(_) => report.stale.push(m.id.clone()),
            }
        }

        for record in records.values() {
            match ledger.applied_scorecard(record) {
                Ok(_) => {}
                Err(LedgerError::Inconsistent { .. }) => {
                    report.missing_snapshots.push(record.match_id.clone())
                }
                Err(e) => return Err(e),
            }
        }

        for m in &completed {
            records.remove(&m.id);
        }
        report.orphaned = records.into_keys().collect();
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{NaiveDate, TimeZone, Utc};
    use scorebook_store::{InMemoryStore, Intent};
    use scorebook_types::{Innings, Match, MatchStatus, Overs};

    use super::*;

    fn completed(id: &str, runs: u32) -> Match {
        let mut m = Match::new(id, "lions", "tigers", NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
        m.status = MatchStatus::Completed;
        m.innings = vec![
            Innings::new("lions", runs, 7, Overs::from_balls(120)),
            Innings::new("tigers", 100, 10, Overs::from_balls(100)),
        ];
        m
    }

    fn record(ledger: &ProcessedLedger<InMemoryStore>, m: &Match, with_snapshot: bool) {
        let fp = m.fingerprint().unwrap();
        if with_snapshot {
            ledger.retain_snapshot(m, fp).unwrap();
        }
        ledger
            .mark_processed(&m.id, fp, Utc.timestamp_opt(0, 0).unwrap())
            .unwrap();
    }

    #[test]
    fn clean_store_audits_clean() {
        let store = Arc::new(InMemoryStore::new());
        let ledger = ProcessedLedger::new(Arc::clone(&store));
        let m = completed("m1", 150);
        store.insert_match(m.clone()).unwrap();
        record(&ledger, &m, true);

        let report = LedgerAuditor::audit(store.as_ref(), &ledger).unwrap();
        assert_eq!(report.scanned, 1);
        assert_eq!(report.current, vec![m.id]);
        assert!(report.is_clean());
        assert!(!report.needs_rebuild());
    }

    #[test]
    fn classifies_every_kind_of_drift() {
        let store = Arc::new(InMemoryStore::new());
        let ledger = ProcessedLedger::new(Arc::clone(&store));

        // m1 edited after processing, snapshot retained.
        record(&ledger, &completed("m1", 150), true);
        store.insert_match(completed("m1", 160)).unwrap();
        // m2 never processed.
        store.insert_match(completed("m2", 150)).unwrap();
        // m3 processed, then abandoned.
        let mut m3 = completed("m3", 150);
        record(&ledger, &m3, true);
        m3.status = MatchStatus::Abandoned;
        store.insert_match(m3).unwrap();

        let report = LedgerAuditor::audit(store.as_ref(), &ledger).unwrap();
        assert_eq!(report.stale, vec![MatchId::from("m1")]);
        assert_eq!(report.unprocessed, vec![MatchId::from("m2")]);
        assert_eq!(report.orphaned, vec![MatchId::from("m3")]);
        assert!(report.missing_snapshots.is_empty());
        assert!(report.needs_rebuild());
    }

    #[test]
    fn stale_entry_without_snapshot_needs_rebuild() {
        let store = Arc::new(InMemoryStore::new());
        let ledger = ProcessedLedger::new(Arc::clone(&store));
        record(&ledger, &completed("m1", 150), false);
        store.insert_match(completed("m1", 160)).unwrap();

        let report = LedgerAuditor::audit(store.as_ref(), &ledger).unwrap();
        assert_eq!(report.missing_snapshots, vec![MatchId::from("m1")]);
        assert!(report.needs_rebuild());
    }

    #[test]
    fn leftover_intent_needs_rebuild() {
        let store = Arc::new(InMemoryStore::new());
        let ledger = ProcessedLedger::new(Arc::clone(&store));
        ledger
            .begin(Intent::Rebuild, "crashed", Utc.timestamp_opt(0, 0).unwrap())
            .unwrap();
        let report = LedgerAuditor::audit(store.as_ref(), &ledger).unwrap();
        assert_eq!(report.pending_intents.len(), 1);
        assert!(report.needs_rebuild());
    }
}

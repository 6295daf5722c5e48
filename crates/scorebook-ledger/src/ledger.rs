use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use scorebook_store::{Intent, JournalEntry, LedgerStore, ProcessedMatchRecord, ScorecardSnapshot};
use scorebook_types::{Fingerprint, Match, MatchId};

use crate::error::{LedgerError, LedgerResult};

/// Where a match stands relative to the ledger.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProcessedState {
    /// Never folded into the statistics.
    Absent,
    /// Folded in with the fingerprint it has now.
    Current(ProcessedMatchRecord),
    /// Folded in with an older fingerprint; the contribution must be
    /// retracted and replaced.
    Stale(ProcessedMatchRecord),
}

impl ProcessedState {
    pub fn record(&self) -> Option<&ProcessedMatchRecord> {
        match self {
            Self::Absent => None,
            Self::Current(r) | Self::Stale(r) => Some(r),
        }
    }
}

/// The processed-match ledger over a [`LedgerStore`].
pub struct ProcessedLedger<S> {
    store: Arc<S>,
}

impl<S> Clone for ProcessedLedger<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: LedgerStore> ProcessedLedger<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Compare the recorded fingerprint of `match_id` with `fingerprint`.
    pub fn is_processed(
        &self,
        match_id: &MatchId,
        fingerprint: &Fingerprint,
    ) -> LedgerResult<ProcessedState> {
        Ok(match self.store.get_record(match_id)? {
            None => ProcessedState::Absent,
            Some(record) if record.fingerprint == *fingerprint => ProcessedState::Current(record),
            Some(record) => ProcessedState::Stale(record),
        })
    }

    /// Record that `match_id` is applied with `fingerprint`.
    ///
    /// Callers write this only after the match's statistics are durable.
    pub fn mark_processed(
        &self,
        match_id: &MatchId,
        fingerprint: Fingerprint,
        at: DateTime<Utc>,
    ) -> LedgerResult<ProcessedMatchRecord> {
        let record = ProcessedMatchRecord {
            match_id: match_id.clone(),
            fingerprint,
            processed_at: at,
        };
        self.store.put_record(&record)?;
        debug!(match_id = %match_id, fingerprint = %fingerprint.short_hex(), "marked processed");
        Ok(record)
    }

    pub fn record(&self, match_id: &MatchId) -> LedgerResult<Option<ProcessedMatchRecord>> {
        Ok(self.store.get_record(match_id)?)
    }

    /// Drop the mark and retained scorecard of one match, after its
    /// contribution has been retracted from the statistics.
    pub fn forget(&self, match_id: &MatchId) -> LedgerResult<bool> {
        let existed = self.store.remove_record(match_id)?;
        self.store.remove_snapshot(match_id)?;
        debug!(match_id = %match_id, existed, "forgot processed match");
        Ok(existed)
    }

    pub fn records(&self) -> LedgerResult<Vec<ProcessedMatchRecord>> {
        Ok(self.store.list_records()?)
    }

    /// Retain the scorecard whose contribution is about to be applied.
    pub fn retain_snapshot(&self, scorecard: &Match, fingerprint: Fingerprint) -> LedgerResult<()> {
        self.store.put_snapshot(&ScorecardSnapshot {
            match_id: scorecard.id.clone(),
            fingerprint,
            scorecard: scorecard.clone(),
        })?;
        Ok(())
    }

    pub fn snapshot(&self, match_id: &MatchId) -> LedgerResult<Option<ScorecardSnapshot>> {
        Ok(self.store.get_snapshot(match_id)?)
    }

    /// The scorecard that produced `record`'s contribution.
    ///
    /// Fails with [`LedgerError::Inconsistent`] when no snapshot is retained
    /// or the retained one hashes to something else.
    pub fn applied_scorecard(&self, record: &ProcessedMatchRecord) -> LedgerResult<Match> {
        let snapshot = self
            .store
            .get_snapshot(&record.match_id)?
            .ok_or_else(|| LedgerError::Inconsistent {
                match_id: record.match_id.clone(),
                reason: "no retained scorecard".into(),
            })?;
        if snapshot.fingerprint != record.fingerprint
            || snapshot.scorecard.fingerprint()? != record.fingerprint
        {
            return Err(LedgerError::Inconsistent {
                match_id: record.match_id.clone(),
                reason: format!(
                    "retained scorecard does not hash to {}",
                    record.fingerprint.short_hex()
                ),
            });
        }
        Ok(snapshot.scorecard)
    }

    /// Journal `intent` ahead of the writes it covers.
    pub fn begin(&self, intent: Intent, owner: &str, at: DateTime<Utc>) -> LedgerResult<()> {
        self.store.put_intent(&JournalEntry {
            intent,
            owner: owner.to_string(),
            started_at: at,
        })?;
        Ok(())
    }

    /// Drop `intent` from the journal once its writes are durable.
    pub fn complete(&self, intent: &Intent) -> LedgerResult<bool> {
        Ok(self.store.remove_intent(intent)?)
    }

    /// Intents left behind by runs that stopped part-way.
    pub fn pending_intents(&self) -> LedgerResult<Vec<JournalEntry>> {
        Ok(self.store.list_intents()?)
    }

    /// Forget every ledger mark and retained scorecard. The journal is
    /// left alone.
    pub fn clear(&self) -> LedgerResult<()> {
        self.store.clear_records()?;
        self.store.clear_snapshots()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone};
    use scorebook_store::InMemoryStore;
    use scorebook_types::{Innings, MatchStatus, Overs};

    use super::*;

    fn scorecard(lions_runs: u32) -> Match {
        let mut m = Match::new("m1", "lions", "tigers", NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
        m.status = MatchStatus::Completed;
        m.innings = vec![
            Innings::new("lions", lions_runs, 7, Overs::from_balls(120)),
            Innings::new("tigers", 100, 10, Overs::from_balls(100)),
        ];
        m
    }

    fn at() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    fn ledger() -> ProcessedLedger<InMemoryStore> {
        ProcessedLedger::new(Arc::new(InMemoryStore::new()))
    }

    // -----------------------------------------------------------------------
    // Status
    // -----------------------------------------------------------------------

    #[test]
    fn status_follows_fingerprint() {
        let ledger = ledger();
        let original = scorecard(150);
        let fp = original.fingerprint().unwrap();
        assert_eq!(ledger.is_processed(&original.id, &fp).unwrap(), ProcessedState::Absent);

        let record = ledger.mark_processed(&original.id, fp, at()).unwrap();
        assert_eq!(
            ledger.is_processed(&original.id, &fp).unwrap(),
            ProcessedState::Current(record.clone())
        );

        let corrected = scorecard(151).fingerprint().unwrap();
        assert_eq!(
            ledger.is_processed(&original.id, &corrected).unwrap(),
            ProcessedState::Stale(record)
        );
    }

    // -----------------------------------------------------------------------
    // Snapshots
    // -----------------------------------------------------------------------

    #[test]
    fn applied_scorecard_returns_retained_snapshot() {
        let ledger = ledger();
        let m = scorecard(150);
        let fp = m.fingerprint().unwrap();
        ledger.retain_snapshot(&m, fp).unwrap();
        let record = ledger.mark_processed(&m.id, fp, at()).unwrap();
        assert_eq!(ledger.applied_scorecard(&record).unwrap(), m);
    }

    #[test]
    fn missing_snapshot_is_inconsistent() {
        let ledger = ledger();
        let m = scorecard(150);
        let record = ledger
            .mark_processed(&m.id, m.fingerprint().unwrap(), at())
            .unwrap();
        assert!(matches!(
            ledger.applied_scorecard(&record),
            Err(LedgerError::Inconsistent { .. })
        ));
    }

    #[test]
    fn snapshot_of_other_content_is_inconsistent() {
        let ledger = ledger();
        let m = scorecard(150);
        let newer = scorecard(170);
        ledger
            .retain_snapshot(&newer, newer.fingerprint().unwrap())
            .unwrap();
        let record = ledger
            .mark_processed(&m.id, m.fingerprint().unwrap(), at())
            .unwrap();
        assert!(matches!(
            ledger.applied_scorecard(&record),
            Err(LedgerError::Inconsistent { .. })
        ));
    }

    // -----------------------------------------------------------------------
    // Journal and clear
    // -----------------------------------------------------------------------

    #[test]
    fn intents_are_pending_until_completed() {
        let ledger = ledger();
        let intent = Intent::Apply {
            match_id: "m1".into(),
        };
        ledger.begin(intent.clone(), "me", at()).unwrap();
        assert_eq!(ledger.pending_intents().unwrap().len(), 1);
        assert!(ledger.complete(&intent).unwrap());
        assert!(ledger.pending_intents().unwrap().is_empty());
    }

    #[test]
    fn clear_keeps_the_journal() {
        let ledger = ledger();
        let m = scorecard(150);
        let fp = m.fingerprint().unwrap();
        ledger.retain_snapshot(&m, fp).unwrap();
        ledger.mark_processed(&m.id, fp, at()).unwrap();
        ledger.begin(Intent::Rebuild, "me", at()).unwrap();

        ledger.clear().unwrap();
        assert!(ledger.records().unwrap().is_empty());
        assert!(ledger.snapshot(&m.id).unwrap().is_none());
        assert_eq!(ledger.pending_intents().unwrap().len(), 1);
    }

    #[test]
    fn forget_drops_mark_and_snapshot_of_one_match() {
        let ledger = ledger();
        let m = scorecard(150);
        let fp = m.fingerprint().unwrap();
        ledger.retain_snapshot(&m, fp).unwrap();
        ledger.mark_processed(&m.id, fp, at()).unwrap();

        assert!(ledger.forget(&m.id).unwrap());
        assert!(ledger.record(&m.id).unwrap().is_none());
        assert!(ledger.snapshot(&m.id).unwrap().is_none());
        assert_eq!(ledger.is_processed(&m.id, &fp).unwrap(), ProcessedState::Absent);
        assert!(!ledger.forget(&m.id).unwrap());
    }
}

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, info, warn};

use scorebook_ledger::{AuditReport, LedgerAuditor, LedgerError, ProcessedLedger, ProcessedState};
use scorebook_stats::{
    accumulate, AggregatorChanges, MatchDeltas, PlayerKey, PlayerStatLine, RowChange,
    StandingsAggregator, StandingsTable,
};
use scorebook_store::{
    Intent, LeaseStore, LedgerStore, MatchStore, ProcessedMatchRecord, StatsStore, StoreError,
};
use scorebook_types::{Fingerprint, Match, MatchId, MatchStatus};

use crate::clock::{Clock, SystemClock};
use crate::config::ReconcileConfig;
use crate::error::{ReconcileError, ReconcileResult};
use crate::lease::LeaseGuard;
use crate::summary::{RebuildReason, RunMode, RunSummary};

/// Why a run stopped following its plan.
enum Halt {
    Storage(StoreError),
    LeaseLost,
    Rebuild(RebuildReason),
}

impl From<StoreError> for Halt {
    fn from(e: StoreError) -> Self {
        Self::Storage(e)
    }
}

impl From<LedgerError> for Halt {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::Store(e) => Self::Storage(e),
            LedgerError::Inconsistent { match_id, reason } => {
                Self::Rebuild(RebuildReason::LedgerInconsistency { match_id, reason })
            }
            LedgerError::Fingerprint(e) => Self::Storage(StoreError::Serialization(e.to_string())),
        }
    }
}

/// One unit of incremental work.
struct Planned {
    scorecard: Match,
    /// Contribution of the retained scorecard, to be retracted first.
    previous: Option<MatchDeltas>,
    /// `None` when the current scorecard is malformed.
    deltas: Option<MatchDeltas>,
}

/// The reconciliation driver over a store implementing every collection.
pub struct Reconciler<S> {
    store: Arc<S>,
    ledger: ProcessedLedger<S>,
    config: ReconcileConfig,
    clock: Arc<dyn Clock>,
}

impl<S> Reconciler<S>
where
    S: MatchStore + StatsStore + LedgerStore + LeaseStore,
{
    pub fn new(store: Arc<S>, config: ReconcileConfig) -> ReconcileResult<Self> {
        config.validate()?;
        Ok(Self {
            ledger: ProcessedLedger::new(Arc::clone(&store)),
            store,
            config,
            clock: Arc::new(SystemClock),
        })
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &ReconcileConfig {
        &self.config
    }

    pub fn ledger(&self) -> &ProcessedLedger<S> {
        &self.ledger
    }

    /// Fold in new and corrected completed matches, skipping the rest.
    ///
    /// Falls back to a full rebuild when the ledger cannot prove what the
    /// statistics contain.
    pub fn reconcile_incremental(&self) -> ReconcileResult<RunSummary> {
        self.run(RunMode::Incremental)
    }

    /// Clear every derived table and rebuild it from all completed matches.
    pub fn reconcile_full(&self) -> ReconcileResult<RunSummary> {
        self.run(RunMode::Full)
    }

    /// The ranked standings table as currently persisted.
    pub fn standings_table(&self) -> ReconcileResult<StandingsTable> {
        let rows = self.store.list_standings().map_err(|source| storage(source, RunMode::Full))?;
        Ok(StandingsTable::build(rows.iter(), &self.config.points))
    }

    /// Persisted player lines in key order, optionally filtered.
    pub fn player_lines(
        &self,
        filter: impl Fn(&PlayerKey) -> bool,
    ) -> ReconcileResult<Vec<PlayerStatLine>> {
        let rows = self
            .store
            .list_player_lines()
            .map_err(|source| storage(source, RunMode::Full))?;
        Ok(rows.into_iter().filter(|row| filter(&row.key)).collect())
    }

    /// Read-only consistency report; takes no lease and writes nothing.
    pub fn audit(&self) -> ReconcileResult<AuditReport> {
        LedgerAuditor::audit(self.store.as_ref(), &self.ledger).map_err(|e| match e {
            LedgerError::Store(source) => storage(source, RunMode::Incremental),
            other => storage(StoreError::Serialization(other.to_string()), RunMode::Incremental),
        })
    }

    fn run(&self, mode: RunMode) -> ReconcileResult<RunSummary> {
        let lease = match LeaseGuard::acquire(
            Arc::clone(&self.store),
            Arc::clone(&self.clock),
            &self.config.owner,
            self.config.lease_ttl(),
        ) {
            Ok(Ok(lease)) => lease,
            Ok(Err(refused)) => return Err(refused),
            Err(source) => return Err(storage(source, mode)),
        };
        info!(?mode, owner = %lease.owner(), run_id = %lease.run_id(), "reconciliation started");

        let mut summary = RunSummary::new(mode);
        let outcome = match mode {
            RunMode::Incremental => self.incremental(&lease, &mut summary),
            RunMode::Full => {
                summary.rebuild = Some(RebuildReason::Requested);
                self.rebuild(&lease, &mut summary)
            }
        };
        let outcome = match outcome {
            Err(Halt::Rebuild(reason)) => {
                warn!(%reason, "cannot reconcile incrementally, rebuilding");
                summary.restart(reason);
                self.rebuild(&lease, &mut summary)
            }
            other => other,
        };
        let released = lease.release();

        match (outcome, released) {
            (Ok(()), Ok(())) => {
                info!(%summary, "reconciliation finished");
                Ok(summary)
            }
            (Ok(()), Err(source)) | (Err(Halt::Storage(source)), _) => {
                warn!(error = %source, %summary, "reconciliation aborted by storage failure");
                Err(ReconcileError::StorageUnavailable {
                    source,
                    summary: Box::new(summary),
                })
            }
            (Err(Halt::LeaseLost), _) => {
                warn!(%summary, "reconciliation lease lost");
                Err(ReconcileError::LeaseLost {
                    summary: Box::new(summary),
                })
            }
            (Err(Halt::Rebuild(reason)), _) => Err(ReconcileError::StorageUnavailable {
                source: StoreError::Corrupt {
                    collection: "ledger".into(),
                    reason: reason.to_string(),
                },
                summary: Box::new(summary),
            }),
        }
    }

    // ---- Incremental ----

    fn incremental(&self, lease: &LeaseGuard<S>, summary: &mut RunSummary) -> Result<(), Halt> {
        let pending = self.ledger.pending_intents()?;
        if !pending.is_empty() {
            return Err(Halt::Rebuild(RebuildReason::InterruptedRun {
                intents: pending.iter().map(|e| e.intent.key()).collect(),
            }));
        }

        let completed = by_date(self.store.scan_completed()?);
        summary.matches_scanned = completed.len();

        let live: BTreeSet<&MatchId> = completed.iter().map(|m| &m.id).collect();
        let orphaned: Vec<MatchId> = self
            .ledger
            .records()?
            .into_iter()
            .map(|r| r.match_id)
            .filter(|id| !live.contains(id))
            .collect();
        if !orphaned.is_empty() {
            return Err(Halt::Rebuild(RebuildReason::OrphanedEntries {
                match_ids: orphaned,
            }));
        }

        // Classify everything before the first write.
        let mut plan = Vec::new();
        for scorecard in completed {
            let state = match scorecard.fingerprint() {
                Ok(fp) => self.ledger.is_processed(&scorecard.id, &fp)?,
                Err(_) => match self.ledger.record(&scorecard.id)? {
                    Some(record) => ProcessedState::Stale(record),
                    None => ProcessedState::Absent,
                },
            };
            let previous = match state {
                ProcessedState::Current(_) => {
                    debug!(match_id = %scorecard.id, "unchanged, skipping");
                    summary.matches_skipped += 1;
                    continue;
                }
                ProcessedState::Absent => None,
                ProcessedState::Stale(record) => Some(self.applied_deltas(&record)?),
            };
            let deltas = match accumulate(&scorecard) {
                Ok(deltas) => Some(deltas),
                Err(e) => {
                    warn!(match_id = %scorecard.id, error = %e, "skipping malformed scorecard");
                    summary.record_failure(&scorecard.id, e.to_string());
                    if previous.is_none() {
                        continue;
                    }
                    None
                }
            };
            plan.push(Planned {
                scorecard,
                previous,
                deltas,
            });
        }

        for planned in plan {
            self.fold_match(lease, summary, planned)?;
        }
        Ok(())
    }

    /// Recompute the contribution `record` stands for from its retained
    /// scorecard.
    fn applied_deltas(&self, record: &ProcessedMatchRecord) -> Result<MatchDeltas, Halt> {
        let retained = self.ledger.applied_scorecard(record)?;
        accumulate(&retained).map_err(|e| {
            Halt::Rebuild(RebuildReason::LedgerInconsistency {
                match_id: record.match_id.clone(),
                reason: format!("retained scorecard is unusable: {e}"),
            })
        })
    }

    /// Apply one planned match. A stale match whose new scorecard cannot be
    /// folded has its old contribution withdrawn and its ledger entry
    /// dropped, leaving it where a full rebuild would.
    fn fold_match(
        &self,
        lease: &LeaseGuard<S>,
        summary: &mut RunSummary,
        planned: Planned,
    ) -> Result<(), Halt> {
        let Planned {
            scorecard,
            previous,
            deltas,
        } = planned;
        let id = &scorecard.id;

        let mut aggregator = StandingsAggregator::new();
        self.seed(&mut aggregator, previous.iter().chain(deltas.iter()))?;
        if let Some(previous) = &previous {
            aggregator.retract(previous).map_err(|e| {
                Halt::Rebuild(RebuildReason::LedgerInconsistency {
                    match_id: id.clone(),
                    reason: e.to_string(),
                })
            })?;
        }
        let applied = match deltas {
            Some(deltas) => match aggregator.apply(&deltas) {
                Ok(()) => Some(deltas),
                Err(e) => {
                    warn!(match_id = %id, error = %e, "cannot fold match");
                    summary.record_failure(id, e.to_string());
                    None
                }
            },
            None => None,
        };
        if applied.is_none() && previous.is_none() {
            return Ok(());
        }
        let changes = aggregator.take_changes();

        let intent = Intent::Apply {
            match_id: id.clone(),
        };
        self.ledger.begin(intent.clone(), lease.owner(), self.clock.now())?;
        self.write_changes(changes)?;
        match &applied {
            Some(deltas) => self.mark(&scorecard, deltas.fingerprint)?,
            None => {
                self.ledger.forget(id)?;
            }
        }
        self.ledger.complete(&intent)?;

        match applied {
            Some(deltas) => {
                summary.matches_processed += 1;
                if previous.is_some() {
                    summary.matches_reprocessed += 1;
                }
                debug!(
                    match_id = %id,
                    fingerprint = %deltas.fingerprint.short_hex(),
                    reprocessed = previous.is_some(),
                    "folded match"
                );
            }
            None => info!(match_id = %id, "withdrew contribution of unusable correction"),
        }
        self.renew(lease)
    }

    /// Load the persisted rows the given deltas touch.
    fn seed<'a>(
        &self,
        aggregator: &mut StandingsAggregator,
        deltas: impl IntoIterator<Item = &'a MatchDeltas>,
    ) -> Result<(), Halt> {
        let mut teams = BTreeSet::new();
        let mut players = BTreeSet::new();
        for d in deltas {
            teams.extend(d.teams.iter().map(|t| t.team.clone()));
            players.extend(d.players.iter().map(|p| p.key.clone()));
        }
        for team in &teams {
            if let Some(row) = self.store.get_standing(team)? {
                aggregator.seed_standing(row);
            }
        }
        for key in &players {
            if let Some(row) = self.store.get_player_line(key)? {
                aggregator.seed_player(row);
            }
        }
        Ok(())
    }

    // ---- Full rebuild ----

    fn rebuild(&self, lease: &LeaseGuard<S>, summary: &mut RunSummary) -> Result<(), Halt> {
        let leftover = self.ledger.pending_intents()?;
        self.ledger
            .begin(Intent::Rebuild, lease.owner(), self.clock.now())?;
        self.store.clear_stats()?;
        self.ledger.clear()?;

        let completed = by_date(self.store.scan_completed()?);
        summary.matches_scanned = completed.len();

        let mut aggregator = StandingsAggregator::new();
        let mut folded = Vec::with_capacity(completed.len());
        for scorecard in completed {
            let result = accumulate(&scorecard)
                .and_then(|deltas| aggregator.apply(&deltas).map(|()| deltas.fingerprint));
            match result {
                Ok(fingerprint) => folded.push((scorecard, fingerprint)),
                Err(e) => {
                    warn!(match_id = %scorecard.id, error = %e, "skipping malformed scorecard");
                    summary.record_failure(&scorecard.id, e.to_string());
                }
            }
        }

        self.write_changes(aggregator.take_changes())?;
        self.renew(lease)?;
        for (scorecard, fingerprint) in &folded {
            self.mark(scorecard, *fingerprint)?;
            summary.matches_processed += 1;
            self.renew(lease)?;
        }

        for entry in leftover {
            self.ledger.complete(&entry.intent)?;
        }
        self.ledger.complete(&Intent::Rebuild)?;
        info!(matches = folded.len(), "rebuilt derived statistics");
        Ok(())
    }

    // ---- Shared steps ----

    fn write_changes(&self, changes: AggregatorChanges) -> Result<(), Halt> {
        for change in changes.standings {
            match change {
                RowChange::Upsert(row) => self.store.put_standing(&row)?,
                RowChange::Delete(team) => {
                    self.store.delete_standing(&team)?;
                }
            }
        }
        for change in changes.players {
            match change {
                RowChange::Upsert(row) => self.store.put_player_line(&row)?,
                RowChange::Delete(key) => {
                    self.store.delete_player_line(&key)?;
                }
            }
        }
        Ok(())
    }

    /// Record a match as applied, after its statistics are written.
    fn mark(&self, scorecard: &Match, fingerprint: Fingerprint) -> Result<(), Halt> {
        if self.config.retain_snapshots {
            self.ledger.retain_snapshot(scorecard, fingerprint)?;
        }
        self.ledger
            .mark_processed(&scorecard.id, fingerprint, self.clock.now())?;
        if self.config.mark_processed_status && scorecard.status == MatchStatus::Completed {
            self.store.set_status(&scorecard.id, MatchStatus::Processed)?;
        }
        Ok(())
    }

    fn renew(&self, lease: &LeaseGuard<S>) -> Result<(), Halt> {
        if lease.renew()? {
            Ok(())
        } else {
            Err(Halt::LeaseLost)
        }
    }
}

/// Ascending (date, match id).
fn by_date(mut matches: Vec<Match>) -> Vec<Match> {
    matches.sort_by(|a, b| (a.date, &a.id).cmp(&(b.date, &b.id)));
    matches
}

fn storage(source: StoreError, mode: RunMode) -> ReconcileError {
    ReconcileError::StorageUnavailable {
        source,
        summary: Box::new(RunSummary::new(mode)),
    }
}

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, RwLock};

use chrono::{DateTime, Utc};

use scorebook_stats::{PlayerKey, PlayerStatLine, TeamStanding};
use scorebook_types::{Match, MatchId, MatchStatus, TeamId};

use crate::error::{StoreError, StoreResult};
use crate::records::{Intent, JournalEntry, Lease, LeaseGrant, ProcessedMatchRecord, ScorecardSnapshot};
use crate::traits::{LeaseStore, LedgerStore, MatchStore, StatsStore};

#[derive(Default)]
struct Collections {
    matches: BTreeMap<MatchId, Match>,
    standings: BTreeMap<TeamId, TeamStanding>,
    players: BTreeMap<PlayerKey, PlayerStatLine>,
    records: BTreeMap<MatchId, ProcessedMatchRecord>,
    snapshots: BTreeMap<MatchId, ScorecardSnapshot>,
    journal: BTreeMap<String, JournalEntry>,
    lease: Option<Lease>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Collection {
    Matches,
    Standings,
    Players,
    Records,
    Snapshots,
    Journal,
    Lease,
}

impl Collection {
    /// Collections the engine owns, as opposed to match documents and the
    /// lease record.
    fn is_derived(self) -> bool {
        !matches!(self, Self::Matches | Self::Lease)
    }
}

/// Successful writes per collection since creation (or the last reset).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WriteCounts {
    pub matches: u64,
    pub standings: u64,
    pub players: u64,
    pub records: u64,
    pub snapshots: u64,
    pub journal: u64,
    pub lease: u64,
}

impl WriteCounts {
    /// Writes to statistics, ledger, snapshot, and journal collections.
    pub fn derived(&self) -> u64 {
        self.standings + self.players + self.records + self.snapshots + self.journal
    }
}

#[derive(Default)]
struct Counters {
    matches: AtomicU64,
    standings: AtomicU64,
    players: AtomicU64,
    records: AtomicU64,
    snapshots: AtomicU64,
    journal: AtomicU64,
    lease: AtomicU64,
}

impl Counters {
    fn bump(&self, collection: Collection) {
        let counter = match collection {
            Collection::Matches => &self.matches,
            Collection::Standings => &self.standings,
            Collection::Players => &self.players,
            Collection::Records => &self.records,
            Collection::Snapshots => &self.snapshots,
            Collection::Journal => &self.journal,
            Collection::Lease => &self.lease,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> WriteCounts {
        WriteCounts {
            matches: self.matches.load(Ordering::Relaxed),
            standings: self.standings.load(Ordering::Relaxed),
            players: self.players.load(Ordering::Relaxed),
            records: self.records.load(Ordering::Relaxed),
            snapshots: self.snapshots.load(Ordering::Relaxed),
            journal: self.journal.load(Ordering::Relaxed),
            lease: self.lease.load(Ordering::Relaxed),
        }
    }
}

#[derive(Default)]
struct Faults {
    unavailable: bool,
    derived_write_budget: Option<u64>,
}

/// In-memory backend implementing every storage trait.
///
/// Intended for tests and embedding. All collections live behind one
/// `RwLock`. Besides plain storage it counts successful writes per
/// collection and can inject outages, which is how the engine's
/// "no writes on a quiet rerun" and "abort on storage failure" behaviour is
/// exercised.
pub struct InMemoryStore {
    inner: RwLock<Collections>,
    counters: Counters,
    faults: Mutex<Faults>,
}

impl InMemoryStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Collections::default()),
            counters: Counters::default(),
            faults: Mutex::new(Faults::default()),
        }
    }

    /// Insert or replace a match document.
    pub fn insert_match(&self, m: Match) -> StoreResult<()> {
        self.write(Collection::Matches, |c| {
            c.matches.insert(m.id.clone(), m);
        })
    }

    /// Remove a match document. Returns `true` if it existed.
    pub fn remove_match(&self, id: &MatchId) -> StoreResult<bool> {
        self.write(Collection::Matches, |c| c.matches.remove(id).is_some())
    }

    pub fn write_counts(&self) -> WriteCounts {
        self.counters.snapshot()
    }

    /// Make every subsequent operation fail with [`StoreError::Unavailable`]
    /// (or succeed again with `false`).
    pub fn set_unavailable(&self, unavailable: bool) {
        if let Ok(mut faults) = self.faults.lock() {
            faults.unavailable = unavailable;
        }
    }

    /// Allow `n` more writes to derived collections, then fail every further
    /// one. `None` lifts the limit.
    pub fn fail_derived_writes_after(&self, n: Option<u64>) {
        if let Ok(mut faults) = self.faults.lock() {
            faults.derived_write_budget = n;
        }
    }

    fn check(&self, collection: Option<Collection>) -> StoreResult<()> {
        let mut faults = self
            .faults
            .lock()
            .map_err(|_| StoreError::Unavailable("fault state lock poisoned".into()))?;
        if faults.unavailable {
            return Err(StoreError::Unavailable("store marked unavailable".into()));
        }
        if let Some(collection) = collection.filter(|c| c.is_derived()) {
            if let Some(budget) = faults.derived_write_budget.as_mut() {
                if *budget == 0 {
                    return Err(StoreError::Unavailable(format!(
                        "injected write failure on {collection:?}"
                    )));
                }
                *budget -= 1;
            }
        }
        Ok(())
    }

    fn read<R>(&self, f: impl FnOnce(&Collections) -> R) -> StoreResult<R> {
        self.check(None)?;
        let inner = self
            .inner
            .read()
            .map_err(|_| StoreError::Unavailable("store read lock poisoned".into()))?;
        Ok(f(&inner))
    }

    fn write<R>(&self, collection: Collection, f: impl FnOnce(&mut Collections) -> R) -> StoreResult<R> {
        self.check(Some(collection))?;
        let mut inner = self
            .inner
            .write()
            .map_err(|_| StoreError::Unavailable("store write lock poisoned".into()))?;
        let result = f(&mut inner);
        self.counters.bump(collection);
        Ok(result)
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryStore")
            .field("write_counts", &self.write_counts())
            .finish()
    }
}

impl MatchStore for InMemoryStore {
    fn get_match(&self, id: &MatchId) -> StoreResult<Option<Match>> {
        self.read(|c| c.matches.get(id).cloned())
    }

    fn scan_by_status(&self, status: MatchStatus) -> StoreResult<Vec<Match>> {
        self.read(|c| {
            c.matches
                .values()
                .filter(|m| m.status == status)
                .cloned()
                .collect()
        })
    }

    fn set_status(&self, id: &MatchId, status: MatchStatus) -> StoreResult<bool> {
        self.write(Collection::Matches, |c| match c.matches.get_mut(id) {
            Some(m) => {
                m.status = status;
                true
            }
            None => false,
        })
    }
}

impl StatsStore for InMemoryStore {
    fn get_standing(&self, team: &TeamId) -> StoreResult<Option<TeamStanding>> {
        self.read(|c| c.standings.get(team).cloned())
    }

    fn put_standing(&self, row: &TeamStanding) -> StoreResult<()> {
        self.write(Collection::Standings, |c| {
            c.standings.insert(row.team.clone(), row.clone());
        })
    }

    fn delete_standing(&self, team: &TeamId) -> StoreResult<bool> {
        self.write(Collection::Standings, |c| c.standings.remove(team).is_some())
    }

    fn list_standings(&self) -> StoreResult<Vec<TeamStanding>> {
        self.read(|c| c.standings.values().cloned().collect())
    }

    fn get_player_line(&self, key: &PlayerKey) -> StoreResult<Option<PlayerStatLine>> {
        self.read(|c| c.players.get(key).cloned())
    }

    fn put_player_line(&self, row: &PlayerStatLine) -> StoreResult<()> {
        self.write(Collection::Players, |c| {
            c.players.insert(row.key.clone(), row.clone());
        })
    }

    fn delete_player_line(&self, key: &PlayerKey) -> StoreResult<bool> {
        self.write(Collection::Players, |c| c.players.remove(key).is_some())
    }

    fn list_player_lines(&self) -> StoreResult<Vec<PlayerStatLine>> {
        self.read(|c| c.players.values().cloned().collect())
    }

    fn clear_stats(&self) -> StoreResult<()> {
        self.write(Collection::Standings, |c| {
            c.standings.clear();
            c.players.clear();
        })
    }
}

impl LedgerStore for InMemoryStore {
    fn get_record(&self, id: &MatchId) -> StoreResult<Option<ProcessedMatchRecord>> {
        self.read(|c| c.records.get(id).cloned())
    }

    fn put_record(&self, record: &ProcessedMatchRecord) -> StoreResult<()> {
        self.write(Collection::Records, |c| {
            c.records.insert(record.match_id.clone(), record.clone());
        })
    }

    fn list_records(&self) -> StoreResult<Vec<ProcessedMatchRecord>> {
        self.read(|c| c.records.values().cloned().collect())
    }

    fn remove_record(&self, id: &MatchId) -> StoreResult<bool> {
        self.write(Collection::Records, |c| c.records.remove(id).is_some())
    }

    fn clear_records(&self) -> StoreResult<()> {
        self.write(Collection::Records, |c| c.records.clear())
    }

    fn get_snapshot(&self, id: &MatchId) -> StoreResult<Option<ScorecardSnapshot>> {
        self.read(|c| c.snapshots.get(id).cloned())
    }

    fn put_snapshot(&self, snapshot: &ScorecardSnapshot) -> StoreResult<()> {
        self.write(Collection::Snapshots, |c| {
            c.snapshots
                .insert(snapshot.match_id.clone(), snapshot.clone());
        })
    }

    fn remove_snapshot(&self, id: &MatchId) -> StoreResult<bool> {
        self.write(Collection::Snapshots, |c| c.snapshots.remove(id).is_some())
    }

    fn clear_snapshots(&self) -> StoreResult<()> {
        self.write(Collection::Snapshots, |c| c.snapshots.clear())
    }

    fn put_intent(&self, entry: &JournalEntry) -> StoreResult<()> {
        self.write(Collection::Journal, |c| {
            c.journal.insert(entry.intent.key(), entry.clone());
        })
    }

    fn remove_intent(&self, intent: &Intent) -> StoreResult<bool> {
        self.write(Collection::Journal, |c| {
            c.journal.remove(&intent.key()).is_some()
        })
    }

    fn list_intents(&self) -> StoreResult<Vec<JournalEntry>> {
        self.read(|c| c.journal.values().cloned().collect())
    }
}

impl LeaseStore for InMemoryStore {
    fn try_acquire(
        &self,
        owner: &str,
        run_id: &str,
        now: DateTime<Utc>,
        ttl: chrono::Duration,
    ) -> StoreResult<LeaseGrant> {
        self.write(Collection::Lease, |c| {
            let grant = LeaseGrant::decide(c.lease.as_ref(), owner, run_id, now, ttl);
            if let Some(lease) = grant.granted() {
                c.lease = Some(lease.clone());
            }
            grant
        })
    }

    fn renew(&self, run_id: &str, now: DateTime<Utc>, ttl: chrono::Duration) -> StoreResult<bool> {
        self.write(Collection::Lease, |c| match c.lease.as_mut() {
            Some(lease) if lease.run_id == run_id => {
                lease.expires_at = now + ttl;
                true
            }
            _ => false,
        })
    }

    fn release(&self, run_id: &str) -> StoreResult<bool> {
        self.write(Collection::Lease, |c| match &c.lease {
            Some(lease) if lease.run_id == run_id => {
                c.lease = None;
                true
            }
            _ => false,
        })
    }

    fn current(&self) -> StoreResult<Option<Lease>> {
        self.read(|c| c.lease.clone())
    }
}

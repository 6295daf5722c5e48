use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use scorebook_stats::{PlayerKey, PlayerStatLine, TeamStanding};
use scorebook_types::{Match, MatchId, MatchStatus, TeamId};

use crate::error::{StoreError, StoreResult};
use crate::records::{Intent, JournalEntry, Lease, LeaseGrant, ProcessedMatchRecord, ScorecardSnapshot};
use crate::traits::{LeaseStore, LedgerStore, MatchStore, StatsStore};

const MATCHES: &str = "matches.json";
const STANDINGS: &str = "standings.json";
const PLAYERS: &str = "players.json";
const LEDGER: &str = "ledger.json";
const SNAPSHOTS: &str = "snapshots.json";
const JOURNAL: &str = "journal.json";
const LEASE: &str = "lease.json";
const LEASE_LOCK: &str = "lease.lock";

/// A lock file older than this is treated as left behind by a dead process.
const LOCK_STALE_AFTER: Duration = Duration::from_secs(30);
const LOCK_RETRY_DELAY: Duration = Duration::from_millis(20);
const LOCK_MAX_ATTEMPTS: u32 = 250;

/// Directory-backed store holding one JSON document per collection.
///
/// Every write loads the collection, modifies it, and atomically replaces
/// the file (temp file in the same directory, then rename), so a crash never
/// leaves a half-written collection. Writers within one process are
/// serialized by a mutex; lease mutations across processes are serialized by
/// an exclusive `lease.lock` file.
pub struct FsStore {
    root: PathBuf,
    guard: Mutex<()>,
}

impl FsStore {
    /// Open (or create) a store rooted at `root`.
    pub fn open(root: impl AsRef<Path>) -> StoreResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        debug!(root = %root.display(), "opened file store");
        Ok(Self {
            root,
            guard: Mutex::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Insert or replace match documents. Returns how many were written.
    pub fn import_matches(&self, matches: impl IntoIterator<Item = Match>) -> StoreResult<usize> {
        self.update(MATCHES, |all: &mut BTreeMap<MatchId, Match>| {
            let mut count = 0;
            for m in matches {
                all.insert(m.id.clone(), m);
                count += 1;
            }
            count
        })
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, ()>> {
        self.guard
            .lock()
            .map_err(|_| StoreError::Unavailable("file store lock poisoned".into()))
    }

    fn load<T: DeserializeOwned + Default>(&self, name: &str) -> StoreResult<T> {
        let path = self.root.join(name);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(T::default()),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_slice(&bytes).map_err(|e| StoreError::Corrupt {
            collection: name.to_string(),
            reason: e.to_string(),
        })
    }

    fn save<T: Serialize>(&self, name: &str, value: &T) -> StoreResult<()> {
        let bytes = serde_json::to_vec_pretty(value)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        let mut tmp = tempfile::NamedTempFile::new_in(&self.root)?;
        tmp.write_all(&bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(self.root.join(name)).map_err(|e| e.error)?;
        Ok(())
    }

    fn read<T, R>(&self, name: &str, f: impl FnOnce(T) -> R) -> StoreResult<R>
    where
        T: DeserializeOwned + Default,
    {
        let _guard = self.lock()?;
        Ok(f(self.load(name)?))
    }

    fn update<T, R>(&self, name: &str, f: impl FnOnce(&mut T) -> R) -> StoreResult<R>
    where
        T: Serialize + DeserializeOwned + Default,
    {
        let _guard = self.lock()?;
        let mut value: T = self.load(name)?;
        let result = f(&mut value);
        self.save(name, &value)?;
        Ok(result)
    }

    fn load_players(&self) -> StoreResult<BTreeMap<PlayerKey, PlayerStatLine>> {
        let rows: Vec<PlayerStatLine> = self.load(PLAYERS)?;
        Ok(rows.into_iter().map(|r| (r.key.clone(), r)).collect())
    }

    fn save_players(&self, rows: &BTreeMap<PlayerKey, PlayerStatLine>) -> StoreResult<()> {
        let rows: Vec<&PlayerStatLine> = rows.values().collect();
        self.save(PLAYERS, &rows)
    }

    fn update_players<R>(
        &self,
        f: impl FnOnce(&mut BTreeMap<PlayerKey, PlayerStatLine>) -> R,
    ) -> StoreResult<R> {
        let _guard = self.lock()?;
        let mut rows = self.load_players()?;
        let result = f(&mut rows);
        self.save_players(&rows)?;
        Ok(result)
    }

    /// Run `f` on the lease record while holding the cross-process lock file.
    fn with_lease<R>(&self, f: impl FnOnce(&mut Option<Lease>) -> R) -> StoreResult<R> {
        let _guard = self.lock()?;
        let _lock = LockFile::acquire(self.root.join(LEASE_LOCK))?;
        let mut lease: Option<Lease> = self.load(LEASE)?;
        let before = lease.clone();
        let result = f(&mut lease);
        if lease != before {
            self.save(LEASE, &lease)?;
        }
        Ok(result)
    }
}

impl std::fmt::Debug for FsStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FsStore").field("root", &self.root).finish()
    }
}

static LOCK_SEQ: AtomicU64 = AtomicU64::new(0);

/// Exclusive lock file, removed on drop. Its contents identify the holder.
struct LockFile {
    path: PathBuf,
    token: String,
}

impl LockFile {
    fn acquire(path: PathBuf) -> StoreResult<Self> {
        let token = lock_token();
        for _ in 0..LOCK_MAX_ATTEMPTS {
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    file.write_all(token.as_bytes())?;
                    return Ok(Self { path, token });
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    if let Some(seen) = Self::abandoned(&path) {
                        if Self::break_abandoned(&path, &seen, &token)? {
                            warn!(path = %path.display(), holder = %seen, "broke abandoned lease lock");
                        }
                        continue;
                    }
                    thread::sleep(LOCK_RETRY_DELAY);
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(StoreError::Unavailable(format!(
            "lease lock {} is busy",
            path.display()
        )))
    }

    /// The holder token of a lock file older than [`LOCK_STALE_AFTER`].
    fn abandoned(path: &Path) -> Option<String> {
        let age = fs::metadata(path)
            .and_then(|meta| meta.modified())
            .ok()
            .and_then(|modified| SystemTime::now().duration_since(modified).ok())?;
        if age <= LOCK_STALE_AFTER {
            return None;
        }
        fs::read_to_string(path).ok()
    }

    /// Move the lock aside and delete it if it is still the one holding
    /// `seen`. A fresh lock that replaced it in the meantime is put back.
    /// Returns `true` if the abandoned lock was removed.
    fn break_abandoned(path: &Path, seen: &str, token: &str) -> StoreResult<bool> {
        let aside = path.with_extension(format!("lock.broken-{}", token.replace(' ', "-")));
        match fs::rename(path, &aside) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(e.into()),
        }
        let taken = fs::read_to_string(&aside).unwrap_or_default();
        if taken == seen {
            fs::remove_file(&aside)?;
            return Ok(true);
        }
        debug!(path = %path.display(), "lease lock changed hands while breaking it, restoring");
        let restored = match fs::hard_link(&aside, path) {
            Ok(()) => Ok(false),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(e.into()),
        };
        fs::remove_file(&aside)?;
        restored
    }
}

impl Drop for LockFile {
    fn drop(&mut self) {
        match fs::read_to_string(&self.path) {
            Ok(holder) if holder == self.token => {
                if let Err(e) = fs::remove_file(&self.path) {
                    warn!(path = %self.path.display(), error = %e, "failed to remove lease lock");
                }
            }
            Ok(holder) => {
                warn!(path = %self.path.display(), %holder, "lease lock was taken over, leaving it");
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "lease lock vanished before release");
            }
        }
    }
}

fn lock_token() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    format!(
        "{} {} {}",
        std::process::id(),
        nanos,
        LOCK_SEQ.fetch_add(1, Ordering::Relaxed)
    )
}

impl MatchStore for FsStore {
    fn get_match(&self, id: &MatchId) -> StoreResult<Option<Match>> {
        self.read(MATCHES, |mut all: BTreeMap<MatchId, Match>| all.remove(id))
    }

    fn scan_by_status(&self, status: MatchStatus) -> StoreResult<Vec<Match>> {
        self.read(MATCHES, |all: BTreeMap<MatchId, Match>| {
            all.into_values().filter(|m| m.status == status).collect()
        })
    }

    fn set_status(&self, id: &MatchId, status: MatchStatus) -> StoreResult<bool> {
        self.update(MATCHES, |all: &mut BTreeMap<MatchId, Match>| {
            match all.get_mut(id) {
                Some(m) => {
                    m.status = status;
                    true
                }
                None => false,
            }
        })
    }
}

impl StatsStore for FsStore {
    fn get_standing(&self, team: &TeamId) -> StoreResult<Option<TeamStanding>> {
        self.read(STANDINGS, |mut all: BTreeMap<TeamId, TeamStanding>| {
            all.remove(team)
        })
    }

    fn put_standing(&self, row: &TeamStanding) -> StoreResult<()> {
        self.update(STANDINGS, |all: &mut BTreeMap<TeamId, TeamStanding>| {
            all.insert(row.team.clone(), row.clone());
        })
    }

    fn delete_standing(&self, team: &TeamId) -> StoreResult<bool> {
        self.update(STANDINGS, |all: &mut BTreeMap<TeamId, TeamStanding>| {
            all.remove(team).is_some()
        })
    }

    fn list_standings(&self) -> StoreResult<Vec<TeamStanding>> {
        self.read(STANDINGS, |all: BTreeMap<TeamId, TeamStanding>| {
            all.into_values().collect()
        })
    }

    fn get_player_line(&self, key: &PlayerKey) -> StoreResult<Option<PlayerStatLine>> {
        let _guard = self.lock()?;
        Ok(self.load_players()?.remove(key))
    }

    fn put_player_line(&self, row: &PlayerStatLine) -> StoreResult<()> {
        self.update_players(|all| {
            all.insert(row.key.clone(), row.clone());
        })
    }

    fn delete_player_line(&self, key: &PlayerKey) -> StoreResult<bool> {
        self.update_players(|all| all.remove(key).is_some())
    }

    fn list_player_lines(&self) -> StoreResult<Vec<PlayerStatLine>> {
        let _guard = self.lock()?;
        Ok(self.load_players()?.into_values().collect())
    }

    fn clear_stats(&self) -> StoreResult<()> {
        let _guard = self.lock()?;
        self.save(STANDINGS, &BTreeMap::<TeamId, TeamStanding>::new())?;
        self.save_players(&BTreeMap::new())
    }
}

impl LedgerStore for FsStore {
    fn get_record(&self, id: &MatchId) -> StoreResult<Option<ProcessedMatchRecord>> {
        self.read(LEDGER, |mut all: BTreeMap<MatchId, ProcessedMatchRecord>| {
            all.remove(id)
        })
    }

    fn put_record(&self, record: &ProcessedMatchRecord) -> StoreResult<()> {
        self.update(LEDGER, |all: &mut BTreeMap<MatchId, ProcessedMatchRecord>| {
            all.insert(record.match_id.clone(), record.clone());
        })
    }

    fn list_records(&self) -> StoreResult<Vec<ProcessedMatchRecord>> {
        self.read(LEDGER, |all: BTreeMap<MatchId, ProcessedMatchRecord>| {
            all.into_values().collect()
        })
    }

    fn remove_record(&self, id: &MatchId) -> StoreResult<bool> {
        self.update(LEDGER, |all: &mut BTreeMap<MatchId, ProcessedMatchRecord>| {
            all.remove(id).is_some()
        })
    }

    fn clear_records(&self) -> StoreResult<()> {
        let _guard = self.lock()?;
        self.save(LEDGER, &BTreeMap::<MatchId, ProcessedMatchRecord>::new())
    }

    fn get_snapshot(&self, id: &MatchId) -> StoreResult<Option<ScorecardSnapshot>> {
        self.read(SNAPSHOTS, |mut all: BTreeMap<MatchId, ScorecardSnapshot>| {
            all.remove(id)
        })
    }

    fn put_snapshot(&self, snapshot: &ScorecardSnapshot) -> StoreResult<()> {
        self.update(SNAPSHOTS, |all: &mut BTreeMap<MatchId, ScorecardSnapshot>| {
            all.insert(snapshot.match_id.clone(), snapshot.clone());
        })
    }

    fn remove_snapshot(&self, id: &MatchId) -> StoreResult<bool> {
        self.update(SNAPSHOTS, |all: &mut BTreeMap<MatchId, ScorecardSnapshot>| {
            all.remove(id).is_some()
        })
    }

    fn clear_snapshots(&self) -> StoreResult<()> {
        let _guard = self.lock()?;
        self.save(SNAPSHOTS, &BTreeMap::<MatchId, ScorecardSnapshot>::new())
    }

    fn put_intent(&self, entry: &JournalEntry) -> StoreResult<()> {
        self.update(JOURNAL, |all: &mut BTreeMap<String, JournalEntry>| {
            all.insert(entry.intent.key(), entry.clone());
        })
    }

    fn remove_intent(&self, intent: &Intent) -> StoreResult<bool> {
        self.update(JOURNAL, |all: &mut BTreeMap<String, JournalEntry>| {
            all.remove(&intent.key()).is_some()
        })
    }

    fn list_intents(&self) -> StoreResult<Vec<JournalEntry>> {
        self.read(JOURNAL, |all: BTreeMap<String, JournalEntry>| {
            all.into_values().collect()
        })
    }
}

impl LeaseStore for FsStore {
    fn try_acquire(
        &self,
        owner: &str,
        run_id: &str,
        now: DateTime<Utc>,
        ttl: chrono::Duration,
    ) -> StoreResult<LeaseGrant> {
        self.with_lease(|lease| {
            let grant = LeaseGrant::decide(lease.as_ref(), owner, run_id, now, ttl);
            if let Some(granted) = grant.granted() {
                *lease = Some(granted.clone());
            }
            grant
        })
    }

    fn renew(&self, run_id: &str, now: DateTime<Utc>, ttl: chrono::Duration) -> StoreResult<bool> {
        self.with_lease(|lease| match lease.as_mut() {
            Some(held) if held.run_id == run_id => {
                held.expires_at = now + ttl;
                true
            }
            _ => false,
        })
    }

    fn release(&self, run_id: &str) -> StoreResult<bool> {
        self.with_lease(|lease| match lease {
            Some(held) if held.run_id == run_id => {
                *lease = None;
                true
            }
            _ => false,
        })
    }

    fn current(&self) -> StoreResult<Option<Lease>> {
        self.read(LEASE, |lease: Option<Lease>| lease)
    }
}

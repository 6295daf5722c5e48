use chrono::{Duration, NaiveDate, TimeZone, Utc};
use tempfile::TempDir;

use scorebook_stats::{PlayerKey, PlayerStatLine, TeamStanding};
use scorebook_store::{
    FsStore, Intent, JournalEntry, LeaseGrant, LeaseStore, LedgerStore, MatchStore,
    ProcessedMatchRecord, ScorecardSnapshot, StatsStore,
};
use scorebook_types::{Innings, Match, MatchStatus, Overs};

fn completed(id: &str) -> Match {
    let mut m = Match::new(id, "lions", "tigers", NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
    m.status = MatchStatus::Completed;
    m.innings = vec![
        Innings::new("lions", 160, 7, Overs::from_balls(120)),
        Innings::new("tigers", 150, 9, Overs::from_balls(120)),
    ];
    m
}

fn open() -> (TempDir, FsStore) {
    let dir = TempDir::new().unwrap();
    let store = FsStore::open(dir.path()).unwrap();
    (dir, store)
}

#[test]
fn collections_survive_reopen() {
    let (dir, store) = open();
    let m = completed("m1");
    store.import_matches(vec![m.clone()]).unwrap();

    let mut standing = TeamStanding::new("lions".into());
    standing.matches_played = 1;
    standing.wins = 1;
    store.put_standing(&standing).unwrap();

    let key = PlayerKey::new("2024".into(), "lions".into(), "ava".into());
    let mut line = PlayerStatLine::new(key.clone());
    line.totals.runs = 42;
    store.put_player_line(&line).unwrap();

    let record = ProcessedMatchRecord {
        match_id: m.id.clone(),
        fingerprint: m.fingerprint().unwrap(),
        processed_at: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
    };
    store.put_record(&record).unwrap();
    store
        .put_snapshot(&ScorecardSnapshot {
            match_id: m.id.clone(),
            fingerprint: m.fingerprint().unwrap(),
            scorecard: m.clone(),
        })
        .unwrap();
    drop(store);

    let store = FsStore::open(dir.path()).unwrap();
    assert_eq!(store.get_match(&m.id).unwrap(), Some(m.clone()));
    assert_eq!(store.get_standing(&"lions".into()).unwrap(), Some(standing));
    assert_eq!(store.get_player_line(&key).unwrap(), Some(line));
    assert_eq!(store.list_records().unwrap(), vec![record]);
    assert_eq!(
        store.get_snapshot(&m.id).unwrap().map(|s| s.scorecard),
        Some(m)
    );
}

#[test]
fn import_replaces_by_id_and_status_scan_filters() {
    let (_dir, store) = open();
    let mut scheduled = completed("m2");
    scheduled.status = MatchStatus::Scheduled;
    assert_eq!(
        store
            .import_matches(vec![completed("m1"), scheduled.clone()])
            .unwrap(),
        2
    );
    scheduled.status = MatchStatus::Completed;
    store.import_matches(vec![scheduled]).unwrap();

    let ids: Vec<_> = store
        .scan_completed()
        .unwrap()
        .into_iter()
        .map(|m| m.id.to_string())
        .collect();
    assert_eq!(ids, vec!["m1", "m2"]);

    assert!(store.set_status(&"m1".into(), MatchStatus::Processed).unwrap());
    assert_eq!(store.scan_by_status(MatchStatus::Processed).unwrap().len(), 1);
    assert_eq!(store.scan_completed().unwrap().len(), 2);
}

#[test]
fn clears_leave_matches_alone() {
    let (_dir, store) = open();
    store.import_matches(vec![completed("m1")]).unwrap();
    store.put_standing(&TeamStanding::new("lions".into())).unwrap();
    store
        .put_record(&ProcessedMatchRecord {
            match_id: "m1".into(),
            fingerprint: completed("m1").fingerprint().unwrap(),
            processed_at: Utc.timestamp_opt(0, 0).unwrap(),
        })
        .unwrap();

    store.clear_stats().unwrap();
    store.clear_records().unwrap();
    store.clear_snapshots().unwrap();

    assert!(store.list_standings().unwrap().is_empty());
    assert!(store.list_records().unwrap().is_empty());
    assert_eq!(store.scan_completed().unwrap().len(), 1);
}

#[test]
fn journal_round_trips_through_disk() {
    let (dir, store) = open();
    let entry = JournalEntry {
        intent: Intent::Rebuild,
        owner: "host-1".into(),
        started_at: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
    };
    store.put_intent(&entry).unwrap();
    drop(store);

    let store = FsStore::open(dir.path()).unwrap();
    assert_eq!(store.list_intents().unwrap(), vec![entry]);
    assert!(store.remove_intent(&Intent::Rebuild).unwrap());
    assert!(store.list_intents().unwrap().is_empty());
}

#[test]
fn lease_is_exclusive_across_handles() {
    let dir = TempDir::new().unwrap();
    let first = FsStore::open(dir.path()).unwrap();
    let second = FsStore::open(dir.path()).unwrap();
    let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
    let ttl = Duration::seconds(60);

    assert!(first.try_acquire("one", "r1", now, ttl).unwrap().granted().is_some());
    match second.try_acquire("two", "r2", now, ttl).unwrap() {
        LeaseGrant::Held(lease) => assert_eq!(lease.owner, "one"),
        other => panic!("expected held lease, got {other:?}"),
    }
    assert!(!dir.path().join("lease.lock").exists());

    assert!(!second.release("r2").unwrap());
    assert!(first.release("r1").unwrap());
    assert!(second.try_acquire("two", "r2", now, ttl).unwrap().granted().is_some());
    assert_eq!(first.current().unwrap().map(|l| l.owner), Some("two".to_string()));
}

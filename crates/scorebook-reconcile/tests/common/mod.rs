//! Match fixtures shared by the driver tests.
#![allow(dead_code)]

use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use scorebook_reconcile::ReconcileConfig;
use scorebook_types::{
    BattingEntry, BowlingEntry, FieldingEntry, Innings, Match, MatchStatus, Overs,
    ResultDescriptor,
};

pub fn start() -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000, 0).unwrap()
}

pub fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 4, day).unwrap()
}

pub fn batter(player: &str, runs: u32, balls: u32) -> BattingEntry {
    BattingEntry {
        player: player.into(),
        runs,
        balls,
        not_out: false,
        fours: 0,
        sixes: 0,
    }
}

pub fn bowler(player: &str, balls: u32, runs: u32, wickets: u32) -> BowlingEntry {
    BowlingEntry {
        player: player.into(),
        overs: Overs::from_balls(balls),
        runs_conceded: runs,
        wickets,
        maidens: 0,
    }
}

/// `a` scores `a_runs` in 20 overs; `b` replies with `b_runs` in `b_balls`.
pub fn played(id: &str, day: u32, a: &str, b: &str, a_runs: u32, b_runs: u32, b_balls: u32) -> Match {
    let mut m = Match::new(id, a, b, date(day));
    m.status = MatchStatus::Completed;

    let mut first = Innings::new(a, a_runs, 8, Overs::from_balls(120));
    first.batting = vec![
        batter(&format!("{a}-opener"), a_runs / 2, 40),
        batter(&format!("{a}-finisher"), a_runs / 4, 20),
    ];
    first.bowling = vec![bowler(&format!("{b}-quick"), 24, 30, 3)];
    first.fielding = vec![FieldingEntry {
        player: format!("{b}-keeper").into(),
        catches: 2,
        stumpings: 0,
        run_outs: 0,
    }];

    let mut second = Innings::new(b, b_runs, 10, Overs::from_balls(b_balls));
    second.batting = vec![batter(&format!("{b}-opener"), b_runs / 2, 30)];
    second.bowling = vec![bowler(&format!("{a}-spinner"), 24, 20, 2)];

    m.innings = vec![first, second];
    m.result = Some(if a_runs > b_runs {
        ResultDescriptor::Won { winner: a.into() }
    } else if b_runs > a_runs {
        ResultDescriptor::Won { winner: b.into() }
    } else {
        ResultDescriptor::Tied
    });
    m
}

pub fn league() -> Vec<Match> {
    vec![
        played("m1", 2, "lions", "tigers", 150, 120, 112),
        played("m2", 5, "tigers", "eagles", 170, 171, 117),
        played("m3", 9, "eagles", "lions", 140, 140, 120),
    ]
}

pub fn config(owner: &str) -> ReconcileConfig {
    ReconcileConfig {
        owner: owner.into(),
        lease_ttl_secs: 60,
        ..ReconcileConfig::default()
    }
}

use std::collections::{BTreeMap, BTreeSet};

use scorebook_types::{Match, PlayerId, ResultDescriptor, Season, TeamId};

use crate::delta::{MatchDeltas, Outcome, PlayerDelta, TeamDelta};
use crate::error::StatsError;
use crate::player::{PlayerCounters, PlayerKey};

const MAX_WICKETS: u32 = 10;

/// Per-side totals summed over every innings the side batted.
#[derive(Default)]
struct SideTotals {
    innings: u32,
    runs: u64,
    balls: u64,
}

/// Turn one completed match into its statistics deltas.
///
/// Pure and deterministic: the output depends only on the fields covered by
/// the match fingerprint, so recomputing the deltas of a retained scorecard
/// reproduces exactly what was applied when it was first processed.
///
/// Fails with [`StatsError::MalformedScorecard`] when a total is missing, an
/// innings claims runs off zero balls, an innings or result names a team not
/// in the match, or the figures are otherwise impossible.
pub fn accumulate(m: &Match) -> Result<MatchDeltas, StatsError> {
    let malformed = |reason: String| StatsError::malformed(&m.id, reason);

    if !m.is_completed() {
        return Err(malformed(format!("status {:?} is not completed", m.status)));
    }
    if m.team_a == m.team_b {
        return Err(malformed(format!("team {} cannot play itself", m.team_a)));
    }
    if m.innings.is_empty() {
        return Err(malformed("completed match has no innings".into()));
    }

    let fingerprint = m
        .fingerprint()
        .map_err(|e| malformed(format!("cannot fingerprint scorecard: {e}")))?;
    let season = m.effective_season();

    let mut totals: BTreeMap<&TeamId, SideTotals> = BTreeMap::new();
    totals.insert(&m.team_a, SideTotals::default());
    totals.insert(&m.team_b, SideTotals::default());

    let mut players: BTreeMap<PlayerKey, PlayerCounters> = BTreeMap::new();

    for (index, innings) in m.innings.iter().enumerate() {
        let n = index + 1;
        let fielding_team = m.opponent_of(&innings.batting_team).ok_or_else(|| {
            malformed(format!(
                "innings {n} batting team {} is not in this match",
                innings.batting_team
            ))
        })?;
        let runs = innings
            .runs
            .ok_or_else(|| malformed(format!("innings {n} is missing runs")))?;
        let overs = innings
            .overs
            .ok_or_else(|| malformed(format!("innings {n} is missing overs")))?;
        if overs.is_zero() && runs > 0 {
            return Err(malformed(format!(
                "innings {n} scored {runs} runs off zero overs"
            )));
        }
        if let Some(wickets) = innings.wickets {
            if wickets > MAX_WICKETS {
                return Err(malformed(format!("innings {n} lost {wickets} wickets")));
            }
        }

        let batted_runs: u64 = innings.batting.iter().map(|b| u64::from(b.runs)).sum();
        if batted_runs > u64::from(runs) {
            return Err(malformed(format!(
                "innings {n} batters scored {batted_runs} of a {runs} total"
            )));
        }

        let side = totals
            .get_mut(&innings.batting_team)
            .ok_or_else(|| malformed(format!("innings {n} has no side")))?;
        side.innings += 1;
        side.runs += u64::from(runs);
        side.balls += u64::from(overs.balls());

        for entry in &innings.batting {
            let c = counter(&mut players, &season, &innings.batting_team, &entry.player);
            c.innings += 1;
            c.not_outs += u64::from(entry.not_out);
            c.runs += u64::from(entry.runs);
            c.balls_faced += u64::from(entry.balls);
            c.fours += u64::from(entry.fours);
            c.sixes += u64::from(entry.sixes);
            match entry.runs {
                100.. => c.hundreds += 1,
                50..=99 => c.fifties += 1,
                _ => {}
            }
        }

        for entry in &innings.bowling {
            if entry.wickets > MAX_WICKETS {
                return Err(malformed(format!(
                    "innings {n} bowler {} took {} wickets",
                    entry.player, entry.wickets
                )));
            }
            let c = counter(&mut players, &season, fielding_team, &entry.player);
            c.balls_bowled += u64::from(entry.overs.balls());
            c.runs_conceded += u64::from(entry.runs_conceded);
            c.wickets += u64::from(entry.wickets);
            c.maidens += u64::from(entry.maidens);
        }

        for entry in &innings.fielding {
            let c = counter(&mut players, &season, fielding_team, &entry.player);
            c.catches += u64::from(entry.catches);
            c.stumpings += u64::from(entry.stumpings);
            c.run_outs += u64::from(entry.run_outs);
        }
    }

    for lineup in &m.lineups {
        if m.opponent_of(&lineup.team).is_none() {
            return Err(malformed(format!(
                "lineup team {} is not in this match",
                lineup.team
            )));
        }
        let unique: BTreeSet<_> = lineup.players.iter().collect();
        for player in unique {
            counter(&mut players, &season, &lineup.team, player);
        }
    }

    for c in players.values_mut() {
        c.matches = 1;
    }

    let a = &totals[&m.team_a];
    let b = &totals[&m.team_b];
    let outcome_a = match &m.result {
        Some(ResultDescriptor::Won { winner }) if *winner == m.team_a => Outcome::Win,
        Some(ResultDescriptor::Won { winner }) if *winner == m.team_b => Outcome::Loss,
        Some(ResultDescriptor::Won { winner }) => {
            return Err(malformed(format!("winner {winner} is not in this match")));
        }
        Some(ResultDescriptor::Tied | ResultDescriptor::Drawn | ResultDescriptor::NoResult) => {
            Outcome::Draw
        }
        None => {
            if a.innings == 0 || b.innings == 0 {
                return Err(malformed(
                    "no result recorded and only one side batted".into(),
                ));
            }
            match a.runs.cmp(&b.runs) {
                std::cmp::Ordering::Greater => Outcome::Win,
                std::cmp::Ordering::Less => Outcome::Loss,
                std::cmp::Ordering::Equal => Outcome::Draw,
            }
        }
    };

    let teams = [
        TeamDelta {
            team: m.team_a.clone(),
            outcome: outcome_a,
            runs_scored: a.runs,
            balls_faced: a.balls,
            runs_conceded: b.runs,
            balls_bowled: b.balls,
        },
        TeamDelta {
            team: m.team_b.clone(),
            outcome: outcome_a.reversed(),
            runs_scored: b.runs,
            balls_faced: b.balls,
            runs_conceded: a.runs,
            balls_bowled: a.balls,
        },
    ];

    let players = players
        .into_iter()
        .map(|(key, counters)| PlayerDelta { key, counters })
        .collect();

    Ok(MatchDeltas {
        match_id: m.id.clone(),
        fingerprint,
        season,
        teams,
        players,
    })
}

fn counter<'a>(
    players: &'a mut BTreeMap<PlayerKey, PlayerCounters>,
    season: &Season,
    team: &TeamId,
    player: &PlayerId,
) -> &'a mut PlayerCounters {
    players
        .entry(PlayerKey::new(season.clone(), team.clone(), player.clone()))
        .or_default()
}

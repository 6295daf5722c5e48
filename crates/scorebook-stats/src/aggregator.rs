use std::collections::{BTreeMap, BTreeSet};

use tracing::trace;

use scorebook_types::TeamId;

use crate::config::PointsConfig;
use crate::delta::MatchDeltas;
use crate::error::StatsError;
use crate::player::{PlayerKey, PlayerStatLine};
use crate::standing::TeamStanding;
use crate::table::StandingsTable;

/// A pending write produced by the aggregator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RowChange<K, V> {
    Upsert(V),
    /// The row lost its last contribution.
    Delete(K),
}

/// Rows touched since the last [`StandingsAggregator::take_changes`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AggregatorChanges {
    pub standings: Vec<RowChange<TeamId, TeamStanding>>,
    pub players: Vec<RowChange<PlayerKey, PlayerStatLine>>,
}

impl AggregatorChanges {
    pub fn is_empty(&self) -> bool {
        self.standings.is_empty() && self.players.is_empty()
    }

    pub fn len(&self) -> usize {
        self.standings.len() + self.players.len()
    }
}

#[derive(Clone, Copy)]
enum Direction {
    Apply,
    Retract,
}

/// Owned working set of standings and player rows.
///
/// The driver seeds it with the persisted rows a match touches (or nothing,
/// for a rebuild), folds deltas in and out, then drains the changed rows
/// for persistence. Rows are created lazily on first contribution and
/// dropped again when a retraction leaves them empty, so an incremental
/// history and a rebuild from scratch converge on the same set of rows.
#[derive(Clone, Debug, Default)]
pub struct StandingsAggregator {
    standings: BTreeMap<TeamId, TeamStanding>,
    players: BTreeMap<PlayerKey, PlayerStatLine>,
    dirty_teams: BTreeSet<TeamId>,
    dirty_players: BTreeSet<PlayerKey>,
}

impl StandingsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a persisted row without marking it changed.
    pub fn seed_standing(&mut self, row: TeamStanding) {
        self.standings.insert(row.team.clone(), row);
    }

    /// Load a persisted row without marking it changed.
    pub fn seed_player(&mut self, row: PlayerStatLine) {
        self.players.insert(row.key.clone(), row);
    }

    /// Fold a match in. On error nothing changes.
    pub fn apply(&mut self, deltas: &MatchDeltas) -> Result<(), StatsError> {
        self.fold(deltas, Direction::Apply)
    }

    /// Fold a match out. Exact inverse of [`Self::apply`]; on error nothing
    /// changes.
    pub fn retract(&mut self, deltas: &MatchDeltas) -> Result<(), StatsError> {
        self.fold(deltas, Direction::Retract)
    }

    fn fold(&mut self, deltas: &MatchDeltas, direction: Direction) -> Result<(), StatsError> {
        let mut teams = Vec::with_capacity(deltas.teams.len());
        for delta in &deltas.teams {
            let mut row = self
                .standings
                .get(&delta.team)
                .cloned()
                .unwrap_or_else(|| TeamStanding::new(delta.team.clone()));
            match direction {
                Direction::Apply => row.apply(delta)?,
                Direction::Retract => row.retract(delta)?,
            }
            teams.push(row);
        }

        let mut players = Vec::with_capacity(deltas.players.len());
        for delta in &deltas.players {
            let mut row = self
                .players
                .get(&delta.key)
                .cloned()
                .unwrap_or_else(|| PlayerStatLine::new(delta.key.clone()));
            match direction {
                Direction::Apply => row.apply(delta)?,
                Direction::Retract => row.retract(delta)?,
            }
            players.push(row);
        }

        for row in teams {
            self.dirty_teams.insert(row.team.clone());
            if row.is_empty() {
                self.standings.remove(&row.team);
            } else {
                self.standings.insert(row.team.clone(), row);
            }
        }
        for row in players {
            self.dirty_players.insert(row.key.clone());
            if row.is_empty() {
                self.players.remove(&row.key);
            } else {
                self.players.insert(row.key.clone(), row);
            }
        }

        trace!(
            match_id = %deltas.match_id,
            players = deltas.players.len(),
            "folded match deltas"
        );
        Ok(())
    }

    pub fn standing(&self, team: &TeamId) -> Option<&TeamStanding> {
        self.standings.get(team)
    }

    pub fn player(&self, key: &PlayerKey) -> Option<&PlayerStatLine> {
        self.players.get(key)
    }

    /// All standings, ordered by team id.
    pub fn standings(&self) -> impl Iterator<Item = &TeamStanding> {
        self.standings.values()
    }

    /// All player lines, ordered by key.
    pub fn players(&self) -> impl Iterator<Item = &PlayerStatLine> {
        self.players.values()
    }

    /// Drain the set of rows changed since the last call, in key order.
    pub fn take_changes(&mut self) -> AggregatorChanges {
        let standings = std::mem::take(&mut self.dirty_teams)
            .into_iter()
            .map(|team| match self.standings.get(&team) {
                Some(row) => RowChange::Upsert(row.clone()),
                None => RowChange::Delete(team),
            })
            .collect();
        let players = std::mem::take(&mut self.dirty_players)
            .into_iter()
            .map(|key| match self.players.get(&key) {
                Some(row) => RowChange::Upsert(row.clone()),
                None => RowChange::Delete(key),
            })
            .collect();
        AggregatorChanges { standings, players }
    }

    pub fn table(&self, config: &PointsConfig) -> StandingsTable {
        StandingsTable::build(self.standings.values(), config)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use scorebook_types::{BattingEntry, Innings, Match, MatchStatus};

    use crate::accumulator::accumulate;

    use super::*;

    fn played(id: &str, a: &str, b: &str, a_runs: u32, b_runs: u32) -> MatchDeltas {
        let mut m = Match::new(id, a, b, NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
        m.status = MatchStatus::Completed;
        let mut first = Innings::new(a, a_runs, 6, "20".parse().unwrap());
        first.batting = vec![BattingEntry {
            player: format!("{a}.bat").into(),
            runs: a_runs / 2,
            balls: 30,
            not_out: false,
            fours: 0,
            sixes: 0,
        }];
        m.innings = vec![first, Innings::new(b, b_runs, 9, "20".parse().unwrap())];
        m.result = None;
        accumulate(&m).unwrap()
    }

    #[test]
    fn apply_creates_rows_lazily_and_reports_upserts() {
        let mut agg = StandingsAggregator::new();
        agg.apply(&played("m1", "a", "b", 160, 140)).unwrap();

        assert_eq!(agg.standing(&"a".into()).unwrap().wins, 1);
        assert_eq!(agg.standing(&"b".into()).unwrap().losses, 1);

        let changes = agg.take_changes();
        assert_eq!(changes.standings.len(), 2);
        assert_eq!(changes.players.len(), 1);
        assert!(changes
            .standings
            .iter()
            .all(|c| matches!(c, RowChange::Upsert(_))));
        assert!(agg.take_changes().is_empty());
    }

    #[test]
    fn retracting_the_only_match_deletes_rows() {
        let mut agg = StandingsAggregator::new();
        let deltas = played("m1", "a", "b", 160, 140);
        agg.apply(&deltas).unwrap();
        agg.take_changes();

        agg.retract(&deltas).unwrap();
        assert_eq!(agg.standings().count(), 0);
        assert_eq!(agg.players().count(), 0);
        let changes = agg.take_changes();
        assert_eq!(
            changes.standings,
            vec![
                RowChange::Delete(TeamId::from("a")),
                RowChange::Delete(TeamId::from("b"))
            ]
        );
    }

    #[test]
    fn failed_retract_leaves_everything_untouched() {
        let mut agg = StandingsAggregator::new();
        agg.apply(&played("m1", "a", "b", 160, 140)).unwrap();
        agg.take_changes();
        let before: Vec<_> = agg.standings().cloned().collect();

        // b never beat a, so retracting that result must underflow.
        let bogus = played("m2", "b", "a", 170, 100);
        assert!(agg.retract(&bogus).is_err());
        assert_eq!(agg.standings().cloned().collect::<Vec<_>>(), before);
        assert!(agg.take_changes().is_empty());
    }

    #[test]
    fn seeded_rows_are_not_reported_until_touched() {
        let mut seeded = StandingsAggregator::new();
        seeded.apply(&played("m1", "a", "b", 160, 140)).unwrap();
        let rows: Vec<_> = seeded.standings().cloned().collect();

        let mut agg = StandingsAggregator::new();
        for row in rows {
            agg.seed_standing(row);
        }
        assert!(agg.take_changes().is_empty());
        agg.apply(&played("m2", "a", "c", 120, 121)).unwrap();
        let changes = agg.take_changes();
        let touched: Vec<_> = changes
            .standings
            .iter()
            .map(|c| match c {
                RowChange::Upsert(row) => row.team.to_string(),
                RowChange::Delete(team) => team.to_string(),
            })
            .collect();
        assert_eq!(touched, vec!["a", "c"]);
        assert_eq!(agg.standing(&"a".into()).unwrap().matches_played, 2);
    }

    #[test]
    fn table_ranks_by_points() {
        let mut agg = StandingsAggregator::new();
        agg.apply(&played("m1", "a", "b", 100, 140)).unwrap();
        agg.apply(&played("m2", "c", "a", 150, 120)).unwrap();
        let table = agg.table(&PointsConfig::default());
        let order: Vec<_> = table.rows.iter().map(|r| r.team.to_string()).collect();
        assert_eq!(order[2], "a");
        assert_eq!(table.rows[2].points, 0);
    }
}

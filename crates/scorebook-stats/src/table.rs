use std::cmp::Ordering;

use serde::Serialize;

use scorebook_types::{Overs, TeamId};

use crate::config::PointsConfig;
use crate::standing::TeamStanding;

/// One ranked line of the league table, with derived columns filled in.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StandingRow {
    pub position: usize,
    pub team: TeamId,
    pub matches_played: u32,
    pub wins: u32,
    pub losses: u32,
    pub draws: u32,
    pub points: u64,
    pub net_run_rate: f64,
    pub runs_scored: u64,
    pub overs_faced: Overs,
    pub runs_conceded: u64,
    pub overs_bowled: Overs,
}

/// League table ranked by points, then net run rate, then wins, then team id.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct StandingsTable {
    pub rows: Vec<StandingRow>,
}

impl StandingsTable {
    pub fn build<'a>(
        standings: impl IntoIterator<Item = &'a TeamStanding>,
        config: &PointsConfig,
    ) -> Self {
        let mut rows: Vec<StandingRow> = standings
            .into_iter()
            .map(|s| StandingRow {
                position: 0,
                team: s.team.clone(),
                matches_played: s.matches_played,
                wins: s.wins,
                losses: s.losses,
                draws: s.draws,
                points: s.points(config),
                net_run_rate: s.net_run_rate(),
                runs_scored: s.runs_scored,
                overs_faced: s.overs_faced(),
                runs_conceded: s.runs_conceded,
                overs_bowled: s.overs_bowled(),
            })
            .collect();

        rows.sort_by(rank);
        for (index, row) in rows.iter_mut().enumerate() {
            row.position = index + 1;
        }
        Self { rows }
    }

    pub fn get(&self, team: &TeamId) -> Option<&StandingRow> {
        self.rows.iter().find(|r| r.team == *team)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn rank(a: &StandingRow, b: &StandingRow) -> Ordering {
    b.points
        .cmp(&a.points)
        .then_with(|| b.net_run_rate.total_cmp(&a.net_run_rate))
        .then_with(|| b.wins.cmp(&a.wins))
        .then_with(|| a.team.cmp(&b.team))
}

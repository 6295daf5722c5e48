use serde::{Deserialize, Serialize};

use scorebook_types::{Overs, TeamId};

use crate::config::PointsConfig;
use crate::delta::{Outcome, TeamDelta};
use crate::error::StatsError;

/// Scoring rate in runs per over.
///
/// Zero balls yields `0.0`: a side that has not faced (or bowled) a ball
/// contributes nothing to net run rate rather than dividing by zero.
pub fn run_rate(runs: u64, balls: u64) -> f64 {
    if balls == 0 {
        return 0.0;
    }
    let overs = balls as f64 / f64::from(scorebook_types::overs::BALLS_PER_OVER);
    runs as f64 / overs
}

/// `(runs_scored / overs_faced) - (runs_conceded / overs_bowled)` with the
/// zero-over convention of [`run_rate`] applied to each side independently.
pub fn net_run_rate(runs_scored: u64, balls_faced: u64, runs_conceded: u64, balls_bowled: u64) -> f64 {
    run_rate(runs_scored, balls_faced) - run_rate(runs_conceded, balls_bowled)
}

/// Cumulative league record of one team.
///
/// Only integer counters are stored. Points and net run rate are functions
/// of these counters, computed on read.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamStanding {
    pub team: TeamId,
    pub matches_played: u32,
    pub wins: u32,
    pub losses: u32,
    pub draws: u32,
    pub runs_scored: u64,
    pub balls_faced: u64,
    pub runs_conceded: u64,
    pub balls_bowled: u64,
}

impl TeamStanding {
    pub fn new(team: TeamId) -> Self {
        Self {
            team,
            matches_played: 0,
            wins: 0,
            losses: 0,
            draws: 0,
            runs_scored: 0,
            balls_faced: 0,
            runs_conceded: 0,
            balls_bowled: 0,
        }
    }

    /// Fold one match into the row. Leaves the row untouched on error.
    pub fn apply(&mut self, delta: &TeamDelta) -> Result<(), StatsError> {
        let key = self.team.as_str();
        let inc = |value: u32, field| {
            value.checked_add(1).ok_or_else(|| StatsError::Overflow {
                key: key.to_string(),
                field,
            })
        };
        let add = |value: u64, by: u64, field| {
            value.checked_add(by).ok_or_else(|| StatsError::Overflow {
                key: key.to_string(),
                field,
            })
        };

        let mut next = self.clone();
        next.matches_played = inc(self.matches_played, "matches_played")?;
        match delta.outcome {
            Outcome::Win => next.wins = inc(self.wins, "wins")?,
            Outcome::Loss => next.losses = inc(self.losses, "losses")?,
            Outcome::Draw => next.draws = inc(self.draws, "draws")?,
        }
        next.runs_scored = add(self.runs_scored, delta.runs_scored, "runs_scored")?;
        next.balls_faced = add(self.balls_faced, delta.balls_faced, "balls_faced")?;
        next.runs_conceded = add(self.runs_conceded, delta.runs_conceded, "runs_conceded")?;
        next.balls_bowled = add(self.balls_bowled, delta.balls_bowled, "balls_bowled")?;

        *self = next;
        Ok(())
    }

    /// Remove one match from the row. Exact inverse of [`Self::apply`].
    pub fn retract(&mut self, delta: &TeamDelta) -> Result<(), StatsError> {
        let key = self.team.as_str();
        let dec = |value: u32, field| {
            value.checked_sub(1).ok_or_else(|| StatsError::Underflow {
                key: key.to_string(),
                field,
            })
        };
        let sub = |value: u64, by: u64, field| {
            value.checked_sub(by).ok_or_else(|| StatsError::Underflow {
                key: key.to_string(),
                field,
            })
        };

        let mut next = self.clone();
        next.matches_played = dec(self.matches_played, "matches_played")?;
        match delta.outcome {
            Outcome::Win => next.wins = dec(self.wins, "wins")?,
            Outcome::Loss => next.losses = dec(self.losses, "losses")?,
            Outcome::Draw => next.draws = dec(self.draws, "draws")?,
        }
        next.runs_scored = sub(self.runs_scored, delta.runs_scored, "runs_scored")?;
        next.balls_faced = sub(self.balls_faced, delta.balls_faced, "balls_faced")?;
        next.runs_conceded = sub(self.runs_conceded, delta.runs_conceded, "runs_conceded")?;
        next.balls_bowled = sub(self.balls_bowled, delta.balls_bowled, "balls_bowled")?;

        *self = next;
        Ok(())
    }

    pub fn points(&self, config: &PointsConfig) -> u64 {
        config.points(self.wins, self.draws, self.losses)
    }

    pub fn net_run_rate(&self) -> f64 {
        net_run_rate(
            self.runs_scored,
            self.balls_faced,
            self.runs_conceded,
            self.balls_bowled,
        )
    }

    pub fn overs_faced(&self) -> Overs {
        Overs::from_balls(saturating_u32(self.balls_faced))
    }

    pub fn overs_bowled(&self) -> Overs {
        Overs::from_balls(saturating_u32(self.balls_bowled))
    }

    /// `matches_played == wins + losses + draws`.
    pub fn is_consistent(&self) -> bool {
        u64::from(self.matches_played)
            == u64::from(self.wins) + u64::from(self.losses) + u64::from(self.draws)
    }

    /// No contribution left; the row can be dropped.
    pub fn is_empty(&self) -> bool {
        self.matches_played == 0
            && self.wins == 0
            && self.losses == 0
            && self.draws == 0
            && self.runs_scored == 0
            && self.balls_faced == 0
            && self.runs_conceded == 0
            && self.balls_bowled == 0
    }
}

fn saturating_u32(value: u64) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delta(team: &str, outcome: Outcome) -> TeamDelta {
        TeamDelta {
            team: team.into(),
            outcome,
            runs_scored: 150,
            balls_faced: 120,
            runs_conceded: 120,
            balls_bowled: 112,
        }
    }

    #[test]
    fn apply_then_retract_is_identity() {
        let mut row = TeamStanding::new("lions".into());
        row.apply(&delta("lions", Outcome::Draw)).unwrap();
        let before = row.clone();

        let d = delta("lions", Outcome::Win);
        row.apply(&d).unwrap();
        assert_ne!(row, before);
        row.retract(&d).unwrap();
        assert_eq!(row, before);
    }

    #[test]
    fn retract_without_contribution_underflows_and_leaves_row() {
        let mut row = TeamStanding::new("lions".into());
        row.apply(&delta("lions", Outcome::Loss)).unwrap();
        let before = row.clone();

        let err = row.retract(&delta("lions", Outcome::Win)).unwrap_err();
        assert_eq!(
            err,
            StatsError::Underflow {
                key: "lions".into(),
                field: "wins"
            }
        );
        assert_eq!(row, before);
    }

    #[test]
    fn points_follow_counters() {
        let mut row = TeamStanding::new("lions".into());
        row.apply(&delta("lions", Outcome::Win)).unwrap();
        row.apply(&delta("lions", Outcome::Draw)).unwrap();
        row.apply(&delta("lions", Outcome::Loss)).unwrap();
        assert_eq!(row.points(&PointsConfig::default()), 3);
        assert!(row.is_consistent());

        let custom = PointsConfig {
            win: 4,
            draw: 2,
            loss: 1,
        };
        assert_eq!(row.points(&custom), 7);
    }

    // -----------------------------------------------------------------------
    // Net run rate
    // -----------------------------------------------------------------------

    #[test]
    fn run_rate_with_partial_overs() {
        // 120 runs in 18.4 overs.
        let rate = run_rate(120, 112);
        assert!((rate - 120.0 / (112.0 / 6.0)).abs() < 1e-12);
    }

    #[test]
    fn zero_overs_contribute_zero() {
        assert_eq!(run_rate(0, 0), 0.0);
        assert_eq!(run_rate(45, 0), 0.0);
        assert_eq!(net_run_rate(150, 120, 99, 0), 7.5);
        assert_eq!(net_run_rate(0, 0, 150, 120), -7.5);
    }

    #[test]
    fn net_run_rate_of_the_worked_example() {
        let mut row = TeamStanding::new("a".into());
        row.apply(&delta("a", Outcome::Win)).unwrap();
        let expected = 150.0 / 20.0 - 120.0 / (18.0 + 4.0 / 6.0);
        assert!((row.net_run_rate() - expected).abs() < 1e-9);
        assert_eq!(row.overs_bowled().to_string(), "18.4");
    }

    #[test]
    fn empty_row_detection() {
        let mut row = TeamStanding::new("a".into());
        assert!(row.is_empty());
        let d = delta("a", Outcome::Win);
        row.apply(&d).unwrap();
        assert!(!row.is_empty());
        row.retract(&d).unwrap();
        assert!(row.is_empty());
    }
}

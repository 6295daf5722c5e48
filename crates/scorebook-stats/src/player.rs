use std::fmt;

use serde::{Deserialize, Serialize};

use scorebook_types::{Overs, PlayerId, Season, TeamId};

use crate::delta::PlayerDelta;
use crate::error::StatsError;

/// Identity of a player statistics row: one per player per team per season.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerKey {
    pub season: Season,
    pub team: TeamId,
    pub player: PlayerId,
}

impl PlayerKey {
    pub fn new(season: Season, team: TeamId, player: PlayerId) -> Self {
        Self {
            season,
            team,
            player,
        }
    }
}

impl fmt::Display for PlayerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.season, self.team, self.player)
    }
}

macro_rules! player_counters {
    ($($(#[$meta:meta])* $field:ident),* $(,)?) => {
        /// Additive player counters. Every field is summed on apply and
        /// subtracted on retract; nothing here is a max or an average.
        #[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
        pub struct PlayerCounters {
            $(
                $(#[$meta])*
                #[serde(default)]
                pub $field: u64,
            )*
        }

        impl PlayerCounters {
            pub fn checked_add(&self, other: &Self, key: &PlayerKey) -> Result<Self, StatsError> {
                Ok(Self {
                    $(
                        $field: self.$field.checked_add(other.$field).ok_or_else(|| {
                            StatsError::Overflow {
                                key: key.to_string(),
                                field: stringify!($field),
                            }
                        })?,
                    )*
                })
            }

            pub fn checked_sub(&self, other: &Self, key: &PlayerKey) -> Result<Self, StatsError> {
                Ok(Self {
                    $(
                        $field: self.$field.checked_sub(other.$field).ok_or_else(|| {
                            StatsError::Underflow {
                                key: key.to_string(),
                                field: stringify!($field),
                            }
                        })?,
                    )*
                })
            }

            pub fn is_zero(&self) -> bool {
                $(self.$field == 0 &&)* true
            }
        }
    };
}

player_counters! {
    matches,
    /// Innings batted.
    innings,
    not_outs,
    runs,
    balls_faced,
    fours,
    sixes,
    fifties,
    hundreds,
    balls_bowled,
    runs_conceded,
    wickets,
    maidens,
    catches,
    stumpings,
    run_outs,
}

/// Cumulative statistics of one player for one team in one season.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerStatLine {
    #[serde(flatten)]
    pub key: PlayerKey,
    #[serde(flatten)]
    pub totals: PlayerCounters,
}

impl PlayerStatLine {
    pub fn new(key: PlayerKey) -> Self {
        Self {
            key,
            totals: PlayerCounters::default(),
        }
    }

    pub fn apply(&mut self, delta: &PlayerDelta) -> Result<(), StatsError> {
        self.totals = self.totals.checked_add(&delta.counters, &self.key)?;
        Ok(())
    }

    pub fn retract(&mut self, delta: &PlayerDelta) -> Result<(), StatsError> {
        self.totals = self.totals.checked_sub(&delta.counters, &self.key)?;
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.totals.is_zero()
    }

    pub fn overs_bowled(&self) -> Overs {
        Overs::from_balls(u32::try_from(self.totals.balls_bowled).unwrap_or(u32::MAX))
    }

    /// Runs per dismissal; `None` until the player has been dismissed.
    pub fn batting_average(&self) -> Option<f64> {
        let dismissals = self.totals.innings.saturating_sub(self.totals.not_outs);
        ratio(self.totals.runs, dismissals)
    }

    /// Runs per hundred balls faced.
    pub fn strike_rate(&self) -> Option<f64> {
        ratio(self.totals.runs * 100, self.totals.balls_faced)
    }

    /// Runs conceded per over bowled.
    pub fn economy(&self) -> Option<f64> {
        ratio(self.totals.runs_conceded * 6, self.totals.balls_bowled)
    }

    /// Runs conceded per wicket.
    pub fn bowling_average(&self) -> Option<f64> {
        ratio(self.totals.runs_conceded, self.totals.wickets)
    }
}

fn ratio(numerator: u64, denominator: u64) -> Option<f64> {
    (denominator > 0).then(|| numerator as f64 / denominator as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> PlayerKey {
        PlayerKey::new("2024".into(), "lions".into(), "p.kumar".into())
    }

    fn batting_delta(runs: u64, balls: u64, not_out: bool) -> PlayerDelta {
        PlayerDelta {
            key: key(),
            counters: PlayerCounters {
                matches: 1,
                innings: 1,
                not_outs: u64::from(not_out),
                runs,
                balls_faced: balls,
                ..Default::default()
            },
        }
    }

    #[test]
    fn apply_and_retract_are_inverse() {
        let mut line = PlayerStatLine::new(key());
        line.apply(&batting_delta(30, 25, false)).unwrap();
        let before = line.clone();
        let d = batting_delta(72, 48, true);
        line.apply(&d).unwrap();
        line.retract(&d).unwrap();
        assert_eq!(line, before);
    }

    #[test]
    fn retract_underflow_names_the_field() {
        let mut line = PlayerStatLine::new(key());
        let err = line.retract(&batting_delta(10, 5, false)).unwrap_err();
        assert!(matches!(err, StatsError::Underflow { field: "matches", .. }));
        assert!(line.is_empty());
    }

    #[test]
    fn derived_rates() {
        let mut line = PlayerStatLine::new(key());
        assert_eq!(line.batting_average(), None);
        assert_eq!(line.strike_rate(), None);

        line.apply(&batting_delta(60, 40, false)).unwrap();
        line.apply(&batting_delta(20, 10, true)).unwrap();
        assert_eq!(line.batting_average(), Some(80.0));
        assert_eq!(line.strike_rate(), Some(160.0));
    }

    #[test]
    fn bowling_rates() {
        let mut line = PlayerStatLine::new(key());
        line.apply(&PlayerDelta {
            key: key(),
            counters: PlayerCounters {
                matches: 1,
                balls_bowled: 22,
                runs_conceded: 33,
                wickets: 3,
                ..Default::default()
            },
        })
        .unwrap();
        assert_eq!(line.overs_bowled().to_string(), "3.4");
        assert_eq!(line.economy(), Some(9.0));
        assert_eq!(line.bowling_average(), Some(11.0));
    }

    #[test]
    fn serializes_flat() {
        let line = PlayerStatLine::new(key());
        let value = serde_json::to_value(&line).unwrap();
        assert_eq!(value["player"], "p.kumar");
        assert_eq!(value["runs"], 0);
        let back: PlayerStatLine = serde_json::from_value(value).unwrap();
        assert_eq!(back, line);
    }
}

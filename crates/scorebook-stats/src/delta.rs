use serde::{Deserialize, Serialize};

use scorebook_types::{Fingerprint, MatchId, Season, TeamId};

use crate::player::{PlayerCounters, PlayerKey};

/// Result of a match from one team's point of view.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Win,
    Loss,
    Draw,
}

impl Outcome {
    /// The same result seen from the other side.
    pub fn reversed(self) -> Self {
        match self {
            Self::Win => Self::Loss,
            Self::Loss => Self::Win,
            Self::Draw => Self::Draw,
        }
    }
}

/// One team's contribution from one match.
///
/// Always worth exactly one match played and exactly one outcome, plus the
/// integer run and ball totals used for net run rate.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamDelta {
    pub team: TeamId,
    pub outcome: Outcome,
    pub runs_scored: u64,
    pub balls_faced: u64,
    pub runs_conceded: u64,
    pub balls_bowled: u64,
}

/// One player's contribution from one match.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerDelta {
    pub key: PlayerKey,
    pub counters: PlayerCounters,
}

/// Everything a single match contributes to the derived statistics.
///
/// Produced by [`crate::accumulate`]; the same scorecard always yields an
/// identical value, which is what makes retraction safe.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchDeltas {
    pub match_id: MatchId,
    pub fingerprint: Fingerprint,
    pub season: Season,
    pub teams: [TeamDelta; 2],
    /// Sorted by key.
    pub players: Vec<PlayerDelta>,
}

impl MatchDeltas {
    pub fn team(&self, team: &TeamId) -> Option<&TeamDelta> {
        self.teams.iter().find(|d| d.team == *team)
    }

    pub fn player(&self, key: &PlayerKey) -> Option<&PlayerDelta> {
        self.players
            .binary_search_by(|d| d.key.cmp(key))
            .ok()
            .map(|i| &self.players[i])
    }
}

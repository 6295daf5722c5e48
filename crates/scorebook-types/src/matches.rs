use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::fingerprint::{Fingerprint, FingerprintHasher};
use crate::ids::{MatchId, PlayerId, Season, TeamId};
use crate::overs::Overs;

/// Lifecycle state of a match document.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchStatus {
    Scheduled,
    InProgress,
    /// Finished, waiting to be folded into the statistics.
    Completed,
    /// Finished and folded into the statistics (optional side signal).
    #[serde(rename = "completed-processed")]
    Processed,
    Abandoned,
}

impl MatchStatus {
    /// Statuses whose scorecards contribute to derived statistics.
    pub const COMPLETED: [MatchStatus; 2] = [MatchStatus::Completed, MatchStatus::Processed];

    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed | Self::Processed)
    }
}

/// How a completed match was decided.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ResultDescriptor {
    Won { winner: TeamId },
    Tied,
    Drawn,
    NoResult,
}

/// One batter's line in an innings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattingEntry {
    pub player: PlayerId,
    pub runs: u32,
    pub balls: u32,
    #[serde(default)]
    pub not_out: bool,
    #[serde(default)]
    pub fours: u32,
    #[serde(default)]
    pub sixes: u32,
}

/// One bowler's figures against the batting side of an innings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BowlingEntry {
    pub player: PlayerId,
    pub overs: Overs,
    #[serde(alias = "runs")]
    pub runs_conceded: u32,
    pub wickets: u32,
    #[serde(default)]
    pub maidens: u32,
}

/// Dismissals effected in the field by a member of the bowling side.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldingEntry {
    pub player: PlayerId,
    #[serde(default)]
    pub catches: u32,
    #[serde(default)]
    pub stumpings: u32,
    #[serde(default)]
    pub run_outs: u32,
}

/// One team's turn at the crease.
///
/// The totals are optional because documents arrive from an external feed;
/// a missing total on a completed match is a malformed scorecard, not a
/// deserialization failure.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Innings {
    pub batting_team: TeamId,
    #[serde(default)]
    pub runs: Option<u32>,
    #[serde(default)]
    pub wickets: Option<u32>,
    #[serde(default)]
    pub overs: Option<Overs>,
    #[serde(default)]
    pub batting: Vec<BattingEntry>,
    #[serde(default)]
    pub bowling: Vec<BowlingEntry>,
    #[serde(default)]
    pub fielding: Vec<FieldingEntry>,
}

impl Innings {
    pub fn new(batting_team: impl Into<TeamId>, runs: u32, wickets: u32, overs: Overs) -> Self {
        Self {
            batting_team: batting_team.into(),
            runs: Some(runs),
            wickets: Some(wickets),
            overs: Some(overs),
            batting: Vec::new(),
            bowling: Vec::new(),
            fielding: Vec::new(),
        }
    }
}

/// Players named in a team's playing eleven.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lineup {
    pub team: TeamId,
    pub players: Vec<PlayerId>,
}

/// A raw match document as held by the match record store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    pub id: MatchId,
    pub team_a: TeamId,
    pub team_b: TeamId,
    pub status: MatchStatus,
    pub date: NaiveDate,
    #[serde(default)]
    pub venue: Option<String>,
    #[serde(default)]
    pub season: Option<Season>,
    #[serde(default)]
    pub innings: Vec<Innings>,
    #[serde(default)]
    pub result: Option<ResultDescriptor>,
    #[serde(default)]
    pub margin: Option<String>,
    #[serde(default)]
    pub lineups: Vec<Lineup>,
}

/// The fields of a match that feed derived statistics, in hashing order.
#[derive(Serialize)]
struct ScorecardView<'a> {
    team_a: &'a TeamId,
    team_b: &'a TeamId,
    season: Season,
    innings: &'a [Innings],
    result: &'a Option<ResultDescriptor>,
    lineups: &'a [Lineup],
}

impl Match {
    /// A scheduled match with no scorecard yet.
    pub fn new(
        id: impl Into<MatchId>,
        team_a: impl Into<TeamId>,
        team_b: impl Into<TeamId>,
        date: NaiveDate,
    ) -> Self {
        Self {
            id: id.into(),
            team_a: team_a.into(),
            team_b: team_b.into(),
            status: MatchStatus::Scheduled,
            date,
            venue: None,
            season: None,
            innings: Vec::new(),
            result: None,
            margin: None,
            lineups: Vec::new(),
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status.is_completed()
    }

    /// The explicit season label, or the calendar year of the match date.
    pub fn effective_season(&self) -> Season {
        self.season
            .clone()
            .unwrap_or_else(|| Season::new(self.date.year().to_string()))
    }

    /// The team facing `team` in this match, if `team` plays in it.
    pub fn opponent_of(&self, team: &TeamId) -> Option<&TeamId> {
        if *team == self.team_a {
            Some(&self.team_b)
        } else if *team == self.team_b {
            Some(&self.team_a)
        } else {
            None
        }
    }

    /// Content fingerprint over the statistically relevant fields.
    ///
    /// Status, venue, date, and margin text are excluded: changing them never
    /// changes what the match contributes (the date only matters through the
    /// derived season, which is included).
    pub fn fingerprint(&self) -> Result<Fingerprint, TypeError> {
        let view = ScorecardView {
            team_a: &self.team_a,
            team_b: &self.team_b,
            season: self.effective_season(),
            innings: &self.innings,
            result: &self.result,
            lineups: &self.lineups,
        };
        FingerprintHasher::SCORECARD.hash_json(&view)
    }
}

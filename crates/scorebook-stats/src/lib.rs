//! Match statistics for Scorebook.
//!
//! This crate is pure computation; it never touches storage. It provides:
//! - [`accumulate`]: one completed match → a deterministic [`MatchDeltas`]
//! - [`TeamStanding`] / [`PlayerStatLine`] with exact `apply` / `retract`
//! - [`StandingsAggregator`]: an owned working set of rows that folds deltas
//!   and reports which rows changed
//! - [`StandingsTable`]: the ranked read model with points and net run rate
//!
//! All accumulators are integers (runs and balls), so applying and then
//! retracting the same delta restores a row bit-for-bit. Points and net run
//! rate are derived at read time and never stored.

pub mod accumulator;
pub mod aggregator;
pub mod config;
pub mod delta;
pub mod error;
pub mod player;
pub mod standing;
pub mod table;

pub use accumulator::accumulate;
pub use aggregator::{AggregatorChanges, RowChange, StandingsAggregator};
pub use config::PointsConfig;
pub use delta::{MatchDeltas, Outcome, PlayerDelta, TeamDelta};
pub use error::StatsError;
pub use player::{PlayerCounters, PlayerKey, PlayerStatLine};
pub use standing::{net_run_rate, run_rate, TeamStanding};
pub use table::{StandingRow, StandingsTable};

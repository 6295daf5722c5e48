//! Reconciliation driver for Scorebook.
//!
//! [`Reconciler`] turns the completed matches in the match record store into
//! persisted team standings and player statistic lines, exactly once per
//! match content:
//!
//! ```text
//! acquire lease → classify {Skip | Process | Reprocess}* → apply → release
//! ```
//!
//! - A match the ledger has never seen is processed.
//! - A match recorded with its present fingerprint is skipped.
//! - A match recorded with an older fingerprint has the contribution of its
//!   retained scorecard retracted before the new one is applied.
//!
//! Whenever consistency cannot be proven (a leftover intent from an
//! interrupted run, a ledger entry for a match that is no longer completed,
//! a stale entry without its retained scorecard) the run falls back to a
//! full rebuild, which clears every derived table and folds all completed
//! matches in ascending (date, match id) order.

pub mod clock;
pub mod config;
pub mod error;
pub mod lease;
pub mod reconciler;
pub mod summary;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::ReconcileConfig;
pub use error::{ReconcileError, ReconcileResult};
pub use lease::LeaseGuard;
pub use reconciler::Reconciler;
pub use summary::{MatchFailure, RebuildReason, RunMode, RunSummary};

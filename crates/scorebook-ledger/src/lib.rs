//! Processed-match ledger for Scorebook.
//!
//! The ledger is the durable record of which completed matches have been
//! folded into the derived statistics, and as what content. It provides:
//! - [`ProcessedLedger`]: fingerprint status per match, ledger marks,
//!   retained scorecard snapshots, and the intent journal
//! - [`LedgerAuditor`]: a read-only consistency report comparing the
//!   ledger against the match record store
//!
//! A ledger mark is only ever written after the match's statistics are
//! durably applied, so a visible mark implies visible statistics.

pub mod audit;
pub mod error;
pub mod ledger;

pub use audit::{AuditReport, LedgerAuditor};
pub use error::{LedgerError, LedgerResult};
pub use ledger::{ProcessedLedger, ProcessedState};

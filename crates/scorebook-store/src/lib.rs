//! Storage boundary for Scorebook.
//!
//! The reconciliation engine treats storage as a key/document store with
//! point reads, point writes, and bulk scans, and never assumes
//! multi-document transactions. This crate names that boundary as four
//! traits, one per collection family:
//!
//! - [`MatchStore`] -- raw match documents (owned by the surrounding app)
//! - [`StatsStore`] -- derived team standings and player statistic lines
//! - [`LedgerStore`] -- processed-match records, scorecard snapshots, and
//!   the intent journal
//! - [`LeaseStore`] -- the single exclusive reconciliation lease
//!
//! # Backends
//!
//! - [`InMemoryStore`] -- `RwLock`-guarded maps with write counters and
//!   fault injection, for tests and embedding
//! - [`FsStore`] -- one JSON document per collection in a directory, each
//!   write replacing the file atomically
//!
//! # Design Rules
//!
//! 1. Every write is an idempotent upsert or delete by key.
//! 2. Listings are returned in key order so callers see stable output.
//! 3. All I/O errors are propagated, never silently ignored.

pub mod error;
pub mod fs;
pub mod memory;
pub mod records;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use fs::FsStore;
pub use memory::{InMemoryStore, WriteCounts};
pub use records::{Intent, JournalEntry, Lease, LeaseGrant, ProcessedMatchRecord, ScorecardSnapshot};
pub use traits::{LeaseStore, LedgerStore, MatchStore, StatsStore};

//! Foundation types for Scorebook.
//!
//! This crate provides the identity, document, and content-hash types used
//! throughout the reconciliation engine. Every other Scorebook crate depends
//! on `scorebook-types`.
//!
//! # Key Types
//!
//! - [`MatchId`], [`TeamId`], [`PlayerId`], [`Season`] -- string identifiers
//! - [`Overs`] -- exact over counts stored as balls bowled
//! - [`Match`] -- the raw match document owned by the match record store
//! - [`Fingerprint`] -- BLAKE3 hash over the statistically relevant fields of a match
//! - [`FingerprintHasher`] -- domain-separated hasher producing fingerprints

pub mod error;
pub mod fingerprint;
pub mod ids;
pub mod matches;
pub mod overs;

pub use error::TypeError;
pub use fingerprint::{Fingerprint, FingerprintHasher};
pub use ids::{MatchId, PlayerId, Season, TeamId};
pub use matches::{
    BattingEntry, BowlingEntry, FieldingEntry, Innings, Lineup, Match, MatchStatus,
    ResultDescriptor,
};
pub use overs::Overs;

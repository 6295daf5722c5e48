use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use scorebook_types::{Fingerprint, Match, MatchId};

/// Ledger entry: `match_id` has been folded into the statistics as it looked
/// when it hashed to `fingerprint`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedMatchRecord {
    pub match_id: MatchId,
    pub fingerprint: Fingerprint,
    pub processed_at: DateTime<Utc>,
}

/// The scorecard that produced the currently applied contribution of a
/// match, retained so that contribution can be recomputed and retracted
/// after the source document is corrected.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScorecardSnapshot {
    pub match_id: MatchId,
    pub fingerprint: Fingerprint,
    pub scorecard: Match,
}

/// Work that was started but whose completion has not been recorded.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Intent {
    /// Statistics writes for one match, ahead of its ledger mark.
    Apply { match_id: MatchId },
    /// A full rebuild that clears and repopulates every derived table.
    Rebuild,
}

impl Intent {
    /// Storage key; at most one journal entry exists per key.
    pub fn key(&self) -> String {
        match self {
            Self::Apply { match_id } => format!("apply:{match_id}"),
            Self::Rebuild => "rebuild".to_string(),
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

/// A journaled intent with its provenance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub intent: Intent,
    pub owner: String,
    pub started_at: DateTime<Utc>,
}

/// The exclusive reconciliation lease.
///
/// `owner` names the host or job. `run_id` is unique per acquisition;
/// renewal and release match on it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lease {
    pub owner: String,
    pub run_id: String,
    pub acquired_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Lease {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Outcome of a lease acquisition attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LeaseGrant {
    /// No lease existed.
    Acquired(Lease),
    /// An expired lease was replaced.
    TakenOver { lease: Lease, previous: Lease },
    /// Another run holds an unexpired lease, whatever its owner.
    Held(Lease),
}

impl LeaseGrant {
    /// Shared acquisition rule for every backend.
    pub fn decide(
        current: Option<&Lease>,
        owner: &str,
        run_id: &str,
        now: DateTime<Utc>,
        ttl: chrono::Duration,
    ) -> Self {
        let lease = Lease {
            owner: owner.to_string(),
            run_id: run_id.to_string(),
            acquired_at: now,
            expires_at: now + ttl,
        };
        match current {
            None => Self::Acquired(lease),
            Some(held) if held.is_expired(now) => Self::TakenOver {
                lease,
                previous: held.clone(),
            },
            Some(held) => Self::Held(held.clone()),
        }
    }

    /// The lease now in force, if the caller got it.
    pub fn granted(&self) -> Option<&Lease> {
        match self {
            Self::Acquired(lease) | Self::TakenOver { lease, .. } => Some(lease),
            Self::Held(_) => None,
        }
    }
}

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use scorebook_stats::PointsConfig;

use crate::error::ReconcileError;

/// Upper bound on `lease_ttl_secs`.
pub const MAX_LEASE_TTL_SECS: u64 = 7 * 24 * 3600;

/// Configuration for the reconciliation driver.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    /// Points weights for the standings table.
    pub points: PointsConfig,
    /// How long a lease stays valid without renewal.
    pub lease_ttl_secs: u64,
    /// Lease owner identity of this process.
    pub owner: String,
    /// Keep the applied scorecard of every processed match so a later
    /// correction can be reconciled without a full rebuild.
    pub retain_snapshots: bool,
    /// Move processed matches from `completed` to `completed-processed`.
    pub mark_processed_status: bool,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            points: PointsConfig::default(),
            lease_ttl_secs: 300,
            owner: default_owner(),
            retain_snapshots: true,
            mark_processed_status: false,
        }
    }
}

impl ReconcileConfig {
    pub fn lease_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.lease_ttl_secs.min(MAX_LEASE_TTL_SECS) as i64)
    }

    pub fn validate(&self) -> Result<(), ReconcileError> {
        if self.lease_ttl_secs == 0 {
            return Err(ReconcileError::Config("lease_ttl_secs must be positive".into()));
        }
        if self.lease_ttl_secs > MAX_LEASE_TTL_SECS {
            return Err(ReconcileError::Config(
                "lease_ttl_secs may not exceed one week".into(),
            ));
        }
        if self.owner.trim().is_empty() {
            return Err(ReconcileError::Config("owner may not be empty".into()));
        }
        Ok(())
    }
}

/// `{host}-{uuid}`, unique per process.
pub fn default_owner() -> String {
    let host = std::env::var("HOSTNAME")
        .ok()
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| "scorebook".to_string());
    format!("{host}-{}", Uuid::now_v7())
}

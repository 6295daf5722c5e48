use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

use scorebook_reconcile::ReconcileConfig;
use scorebook_stats::PointsConfig;

pub const DEFAULT_FILE: &str = "scorebook.toml";

/// Contents of `scorebook.toml`.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub points: PointsConfig,
    pub reconcile: ReconcileSection,
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReconcileSection {
    pub lease_ttl_secs: u64,
    pub owner: Option<String>,
    pub retain_snapshots: bool,
    pub mark_processed_status: bool,
}

impl Default for ReconcileSection {
    fn default() -> Self {
        let base = ReconcileConfig::default();
        Self {
            lease_ttl_secs: base.lease_ttl_secs,
            owner: None,
            retain_snapshots: base.retain_snapshots,
            mark_processed_status: base.mark_processed_status,
        }
    }
}

impl FileConfig {
    /// Load `explicit`, or `<data>/scorebook.toml` when it exists, or the
    /// defaults.
    pub fn load(explicit: Option<&Path>, data: &Path) -> anyhow::Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let candidate = data.join(DEFAULT_FILE);
                if !candidate.exists() {
                    return Ok(Self::default());
                }
                candidate
            }
        };
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn parse(text: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn into_reconcile_config(self) -> ReconcileConfig {
        let base = ReconcileConfig::default();
        ReconcileConfig {
            points: self.points,
            lease_ttl_secs: self.reconcile.lease_ttl_secs,
            owner: self.reconcile.owner.unwrap_or(base.owner),
            retain_snapshots: self.reconcile.retain_snapshots,
            mark_processed_status: self.reconcile.mark_processed_status,
        }
    }
}

//! Sync configuration, loaded from TOML.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

/// Default value for `block_range` in [`L1SyncerConfig`].
const DEFAULT_L1_BLOCK_RANGE: u64 = 20_000;

/// Default value for `stall_timeout_secs` in [`BatchesConfig`].
const DEFAULT_STALL_TIMEOUT_SECS: u64 = 30;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZkSyncConfig {
    pub l1_syncer: L1SyncerConfig,
    pub batches: BatchesConfig,
    pub witness: WitnessConfig,
    pub prune: PruneConfig,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct L1SyncerConfig {
    /// First L1 block to scan when the stage has no progress yet.
    pub start_block: u64,

    /// How many L1 blocks to request per query.
    pub block_range: u64,
}

impl Default for L1SyncerConfig {
    fn default() -> Self {
        Self {
            start_block: 0,
            block_range: DEFAULT_L1_BLOCK_RANGE,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchesConfig {
    /// Seconds without a new stream entry before the stream is reported as
    /// stalled.
    pub stall_timeout_secs: u64,
}

impl Default for BatchesConfig {
    fn default() -> Self {
        Self {
            stall_timeout_secs: DEFAULT_STALL_TIMEOUT_SECS,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WitnessConfig {
    pub enabled: bool,
}

impl Default for WitnessConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PruneConfig {
    /// Blocks of history to keep behind the head. Nothing is pruned when
    /// unset.
    pub retain_blocks: Option<u64>,
}

impl ZkSyncConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let mut cfg: Self = toml::from_str(s)?;
        cfg.normalize();
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    fn normalize(&mut self) {
        if self.l1_syncer.block_range == 0 {
            self.l1_syncer.block_range = DEFAULT_L1_BLOCK_RANGE;
        }
        if self.batches.stall_timeout_secs == 0 {
            self.batches.stall_timeout_secs = DEFAULT_STALL_TIMEOUT_SECS;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.prune.retain_blocks == Some(0) {
            return Err(ConfigError::Invalid(
                "prune.retain_blocks must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Prune boundary for a chain whose head is at `head`, if pruning is on.
    pub fn prune_target(&self, head: u64) -> Option<u64> {
        let retain = self.prune.retain_blocks?;
        Some(head.saturating_sub(retain))
    }
}

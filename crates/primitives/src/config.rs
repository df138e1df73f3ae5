//! Configuration recognized by every peer (§6 / §6.1). Hash width,
//! signature scheme, and symmetric cipher must agree between peers; the
//! others only affect proof size and cache behavior.

use serde::{Deserialize, Serialize};

use crate::HASH_WIDTH;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Merkle tree fanout (children per interior node). Must be >= 2.
    pub merkle_fanout: usize,
    /// Capacity of the per-session direct-mapped hash cache (§4.3).
    pub hash_cache_capacity: usize,
    /// Name of the eviction policy; informational, the only implemented
    /// policy is direct-mapped.
    pub hash_cache_policy: String,
    /// Signature-avoidance extra-hash budget (§4.2).
    pub sig_avoid_max_extra_hashes: usize,
    /// Hash width in bytes. Must equal `primitives::HASH_WIDTH`.
    pub hash_width: usize,
    pub signature_scheme: String,
    pub symmetric_cipher: String,
    pub bind_addr: String,
    pub data_dir: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            merkle_fanout: 2,
            hash_cache_capacity: 1024,
            hash_cache_policy: "direct-mapped".to_string(),
            sig_avoid_max_extra_hashes: 4,
            hash_width: HASH_WIDTH,
            signature_scheme: "reddsa-orchard".to_string(),
            symmetric_cipher: "xchacha20poly1305".to_string(),
            bind_addr: "127.0.0.1:7878".to_string(),
            data_dir: "./data".to_string(),
        }
    }
}

impl Config {
    /// Load from a TOML file if `path` is given, falling back to defaults
    /// for any field the file omits; `None` gives pure defaults.
    pub fn load(path: Option<&std::path::Path>) -> anyhow::Result<Self> {
        let cfg = match path {
            Some(p) => {
                let text = std::fs::read_to_string(p)?;
                toml::from_str(&text)?
            }
            None => Self::default(),
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(self.merkle_fanout >= 2, "merkle_fanout must be >= 2");
        anyhow::ensure!(self.hash_width == HASH_WIDTH, "hash_width mismatch with this build");
        anyhow::ensure!(self.hash_cache_capacity > 0, "hash_cache_capacity must be > 0");
        Ok(())
    }
}

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{MetricsError, Result};

/// How rewards other than 0 and 1 are handled.
///
/// The per-task success count is the plain sum of rewards, which only has a
/// probabilistic meaning for binary rewards. `Lenient` keeps the sum and logs
/// a warning; `Strict` rejects the run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewardPolicy {
    #[default]
    Lenient,
    Strict,
}

impl RewardPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            RewardPolicy::Lenient => "lenient",
            RewardPolicy::Strict => "strict",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MetricsConfig {
    pub reward_policy: RewardPolicy,
    /// Upper bound on k for the Pass^k table. `None` reports every k up to
    /// the number of distinct trials.
    pub max_k: Option<usize>,
}

impl MetricsConfig {
    pub fn from_yaml_str(path: &Path, data: &str) -> Result<Self> {
        let config: MetricsConfig =
            serde_yaml::from_str(data).map_err(|e| MetricsError::Config {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        config.validate().map_err(|e| MetricsError::Config {
            path: path.to_path_buf(),
            reason: match e {
                MetricsError::InvalidOptions { reason } => reason,
                other => other.to_string(),
            },
        })?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_k == Some(0) {
            return Err(MetricsError::InvalidOptions {
                reason: "max_k must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path).map_err(|source| MetricsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(path, &data)
    }
}

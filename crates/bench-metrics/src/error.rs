use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("no trial records: average reward and pass^k are undefined")]
    EmptyInput,
    #[error("malformed record at index {index}: {reason}")]
    MalformedRecord { index: usize, reason: String },
    #[error("non-binary reward {reward} for task `{task_id}` at index {index}")]
    NonBinaryReward {
        index: usize,
        task_id: String,
        reward: f64,
    },
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid config {}: {reason}", path.display())]
    Config { path: PathBuf, reason: String },
    #[error("invalid metrics options: {reason}")]
    InvalidOptions { reason: String },
    #[error("failed to render report: {0}")]
    Render(#[from] serde_json::Error),
}

impl MetricsError {
    /// Stable machine-readable code for JSON error envelopes.
    pub fn code(&self) -> &'static str {
        match self {
            MetricsError::EmptyInput => "empty_input",
            MetricsError::MalformedRecord { .. } => "malformed_record",
            MetricsError::NonBinaryReward { .. } => "non_binary_reward",
            MetricsError::Io { .. } => "read_failed",
            MetricsError::Parse { .. } => "parse_failed",
            MetricsError::Config { .. } => "invalid_config",
            MetricsError::InvalidOptions { .. } => "invalid_config",
            MetricsError::Render(_) => "render_failed",
        }
    }
}

pub type Result<T> = std::result::Result<T, MetricsError>;

//! Aggregate metrics for repeated-trial benchmark runs: average reward,
//! the unbiased pass^k estimator, and a ranked breakdown of failure sources.

pub mod aggregate;
pub mod config;
pub mod error;
pub mod failure;
pub mod io;
pub mod passk;
pub mod record;
pub mod report;

pub use aggregate::{aggregate, Aggregate, TaskSuccess};
pub use config::{MetricsConfig, RewardPolicy};
pub use error::{MetricsError, Result};
pub use failure::{classify, classify_failures, FailureShare, FailureTally, UnknownFailure};
pub use io::{load_results, parse_results, sha256_bytes, ResultsFile};
pub use passk::{binomial, estimate_pass_hat_k, pass_hat_k, PassHatK};
pub use record::{decode_record, decode_records, CheckOutputs, TaskId, TrialInfo, TrialRecord};
pub use report::{
    compute_metrics, compute_metrics_with, render_report, to_fixed, MetricsReport,
};

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use crate::aggregate::aggregate;
use crate::config::MetricsConfig;
use crate::error::Result;
use crate::failure::{classify_failures, FailureShare, UnknownFailure};
use crate::passk::{estimate_pass_hat_k, PassHatK};
use crate::record::TrialRecord;

/// Snapshot of the metrics for one results set.
///
/// Serializes to the report wire shape: fixed-point strings keyed
/// `"Average Reward"`, `"Pass^k"` (in k order) and `"Failure Sources"`
/// (in ranked order).
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsReport {
    pub num_records: usize,
    pub num_tasks: usize,
    pub num_trials: usize,
    pub average_reward: f64,
    pub pass_hat_ks: Vec<PassHatK>,
    pub failure_sources: Vec<FailureShare>,
    pub unknown_failures: Vec<UnknownFailure>,
}

impl MetricsReport {
    pub fn pass_hat_k(&self, k: usize) -> Option<f64> {
        self.pass_hat_ks.iter().find(|p| p.k == k).map(|p| p.value)
    }

    pub fn total_failures(&self) -> usize {
        self.failure_sources.iter().map(|s| s.count).sum()
    }
}

pub fn compute_metrics(records: &[TrialRecord]) -> Result<MetricsReport> {
    compute_metrics_with(records, &MetricsConfig::default())
}

pub fn compute_metrics_with(
    records: &[TrialRecord],
    config: &MetricsConfig,
) -> Result<MetricsReport> {
    config.validate()?;
    let agg = aggregate(records, config.reward_policy)?;
    let pass_hat_ks = estimate_pass_hat_k(&agg.successes(), agg.num_trials, config.max_k);
    let failures = classify_failures(records);
    Ok(MetricsReport {
        num_records: agg.num_records,
        num_tasks: agg.tasks.len(),
        num_trials: agg.num_trials,
        average_reward: agg.average_reward,
        pass_hat_ks,
        failure_sources: failures.tally.ranked(),
        unknown_failures: failures.unknown,
    })
}

struct PassHatKTable<'a>(&'a [PassHatK]);

impl Serialize for PassHatKTable<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for p in self.0 {
            map.serialize_entry(&format!("k={}", p.k), &to_fixed(p.value, 4))?;
        }
        map.end()
    }
}

struct FailureSourceTable<'a>(&'a [FailureShare]);

impl Serialize for FailureSourceTable<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for share in self.0 {
            map.serialize_entry(
                &share.label,
                &format!("{} ({}%)", share.count, to_fixed(share.percent, 2)),
            )?;
        }
        map.end()
    }
}

impl Serialize for MetricsReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry("Average Reward", &to_fixed(self.average_reward, 4))?;
        map.serialize_entry("Pass^k", &PassHatKTable(&self.pass_hat_ks))?;
        map.serialize_entry("Failure Sources", &FailureSourceTable(&self.failure_sources))?;
        map.end()
    }
}

// Digits needed to print any f64 exactly.
const EXACT_DIGITS: usize = 1100;

/// Fixed-point formatting that rounds exact ties away from zero, so
/// 0.03125 at four places is "0.0313". Other values round to nearest.
pub fn to_fixed(value: f64, places: usize) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    let magnitude = value.abs();
    let sign = if value < 0.0 { "-" } else { "" };
    let exact = format!("{:.*}", EXACT_DIGITS, magnitude);
    let (int_part, frac_part) = exact.split_once('.').unwrap_or((exact.as_str(), ""));
    let tail = &frac_part[places..];
    let is_tie = tail.starts_with('5') && tail[1..].bytes().all(|b| b == b'0');
    if !is_tie {
        return format!("{}{:.*}", sign, places, magnitude);
    }

    let mut digits: Vec<u8> = int_part.bytes().chain(frac_part[..places].bytes()).collect();
    let mut carry = true;
    for d in digits.iter_mut().rev() {
        if *d == b'9' {
            *d = b'0';
        } else {
            *d += 1;
            carry = false;
            break;
        }
    }
    if carry {
        digits.insert(0, b'1');
    }
    let split = digits.len() - places;
    let int_digits = String::from_utf8_lossy(&digits[..split]);
    if places == 0 {
        format!("{}{}", sign, int_digits)
    } else {
        let frac_digits = String::from_utf8_lossy(&digits[split..]);
        format!("{}{}.{}", sign, int_digits, frac_digits)
    }
}

/// Render the report as pretty JSON with keys in report order.
pub fn render_report(report: &MetricsReport) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

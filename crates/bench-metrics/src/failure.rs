//! Failure-source classification for zero-reward trials.

use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use tracing::warn;

use crate::record::{TrialInfo, TrialRecord};

pub const UNKNOWN: &str = "unknown";
pub const R_ACTIONS_FALSE: &str = "r_actions_false";
pub const MISSING_OUTPUTS: &str = "missing_outputs";

/// Assign exactly one failure-source label. Rules are checked in priority
/// order and the first match wins: an explicit `source`, then
/// `r_actions == false`, then any falsy entry in `outputs`.
pub fn classify(info: Option<&TrialInfo>) -> String {
    let Some(info) = info else {
        return UNKNOWN.to_string();
    };
    if let Some(source) = &info.source {
        return source.clone();
    }
    if info.r_actions == Some(false) {
        return R_ACTIONS_FALSE.to_string();
    }
    // Must stay last: outputs are the least specific signal.
    if let Some(outputs) = &info.outputs {
        if outputs.values().into_iter().any(|v| !truthy(v)) {
            return MISSING_OUTPUTS.to_string();
        }
    }
    UNKNOWN.to_string()
}

/// Truthiness of a loosely typed check result.
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Label counts in first-seen order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FailureTally {
    counts: Vec<(String, usize)>,
    index: HashMap<String, usize>,
}

impl FailureTally {
    pub fn record(&mut self, label: &str) {
        match self.index.get(label) {
            Some(&slot) => self.counts[slot].1 += 1,
            None => {
                self.index.insert(label.to_string(), self.counts.len());
                self.counts.push((label.to_string(), 1));
            }
        }
    }

    pub fn count(&self, label: &str) -> usize {
        self.index.get(label).map_or(0, |&slot| self.counts[slot].1)
    }

    pub fn total(&self) -> usize {
        self.counts.iter().map(|(_, n)| n).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Labels by descending count; ties keep first-seen order.
    pub fn ranked(&self) -> Vec<FailureShare> {
        let total = self.total();
        if total == 0 {
            return Vec::new();
        }
        let mut ranked = self.counts.clone();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked
            .into_iter()
            .map(|(label, count)| FailureShare {
                percent: count as f64 / total as f64 * 100.0,
                label,
                count,
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FailureShare {
    pub label: String,
    pub count: usize,
    pub percent: f64,
}

/// A zero-reward trial no rule could explain, with its full diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnknownFailure {
    pub index: usize,
    pub task_id: String,
    pub trial: i64,
    pub info: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FailureSummary {
    pub tally: FailureTally,
    pub unknown: Vec<UnknownFailure>,
}

pub fn classify_failures(records: &[TrialRecord]) -> FailureSummary {
    let mut summary = FailureSummary::default();
    for (index, record) in records.iter().enumerate() {
        if !record.is_failure() {
            continue;
        }
        let label = classify(record.info.as_ref());
        summary.tally.record(&label);
        if label == UNKNOWN {
            let info = record
                .info
                .as_ref()
                .and_then(|info| serde_json::to_value(info).ok());
            let payload = match &info {
                Some(v) => serde_json::to_string_pretty(v).unwrap_or_else(|_| v.to_string()),
                None => "<no info>".to_string(),
            };
            warn!(
                target: "bench_metrics::failure",
                index,
                task_id = %record.task_id,
                trial = record.trial,
                "unknown failure case:\n{}",
                payload
            );
            summary.unknown.push(UnknownFailure {
                index,
                task_id: record.task_id.key(),
                trial: record.trial,
                info,
            });
        }
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::decode_record;
    use serde_json::json;

    fn info(value: Value) -> TrialInfo {
        serde_json::from_value(value).expect("info")
    }

    #[test]
    fn missing_info_is_unknown() {
        assert_eq!(classify(None), UNKNOWN);
    }

    #[test]
    fn explicit_source_wins_over_everything() {
        let i = info(json!({"source": "timeout", "r_actions": false, "outputs": {"check": false}}));
        assert_eq!(classify(Some(&i)), "timeout");
    }

    #[test]
    fn r_actions_false_beats_outputs() {
        let i = info(json!({"r_actions": false, "outputs": {"check": false}}));
        assert_eq!(classify(Some(&i)), R_ACTIONS_FALSE);
    }

    #[test]
    fn falsy_output_is_missing_outputs() {
        let i = info(json!({"r_actions": true, "outputs": {"a": true, "b": 0}}));
        assert_eq!(classify(Some(&i)), MISSING_OUTPUTS);
    }

    #[test]
    fn positional_outputs_are_truthiness_tested() {
        let i = info(json!({"outputs": [true, false]}));
        assert_eq!(classify(Some(&i)), MISSING_OUTPUTS);
        let i = info(json!({"outputs": [true, 1, "ok"]}));
        assert_eq!(classify(Some(&i)), UNKNOWN);
    }

    #[test]
    fn ill_typed_fields_fall_through_to_unknown() {
        let i = info(json!({"r_actions": "no", "outputs": 3}));
        assert_eq!(classify(Some(&i)), UNKNOWN);
    }

    #[test]
    fn unmatched_payloads_are_unknown() {
        assert_eq!(classify(Some(&info(json!({})))), UNKNOWN);
        assert_eq!(classify(Some(&info(json!({"r_actions": true})))), UNKNOWN);
        assert_eq!(
            classify(Some(&info(json!({"outputs": {"a": true, "b": "yes"}})))),
            UNKNOWN
        );
        assert_eq!(classify(Some(&info(json!({"outputs": {}})))), UNKNOWN);
    }

    #[test]
    fn truthiness_follows_loose_semantics() {
        for v in [json!(null), json!(false), json!(0), json!(0.0), json!("")] {
            assert!(!truthy(&v), "{} should be falsy", v);
        }
        for v in [json!(true), json!(1), json!(-2.5), json!("x"), json!([]), json!({})] {
            assert!(truthy(&v), "{} should be truthy", v);
        }
    }

    #[test]
    fn ranked_orders_by_count_then_first_seen() {
        let mut tally = FailureTally::default();
        for label in ["b", "a", "c", "a", "c"] {
            tally.record(label);
        }
        let ranked: Vec<(String, usize)> = tally
            .ranked()
            .into_iter()
            .map(|s| (s.label, s.count))
            .collect();
        assert_eq!(
            ranked,
            vec![("a".to_string(), 2), ("c".to_string(), 2), ("b".to_string(), 1)]
        );
        assert_eq!(tally.total(), 5);
        assert_eq!(tally.count("a"), 2);
        assert_eq!(tally.count("zzz"), 0);
    }

    #[test]
    fn empty_tally_ranks_to_nothing() {
        let tally = FailureTally::default();
        assert!(tally.is_empty());
        assert!(tally.ranked().is_empty());
    }

    #[test]
    fn only_zero_rewards_are_classified_and_unknowns_are_kept() {
        let records = vec![
            decode_record(0, &json!({"task_id": "t", "trial": 0, "reward": 1, "info": {}}))
                .expect("r0"),
            decode_record(1, &json!({"task_id": "t", "trial": 1, "reward": 0})).expect("r1"),
            decode_record(
                2,
                &json!({"task_id": "u", "trial": 0, "reward": 0, "info": {"r_actions": true, "note": "x"}}),
            )
            .expect("r2"),
            decode_record(3, &json!({"task_id": "u", "trial": 1, "reward": -1})).expect("r3"),
        ];
        let summary = classify_failures(&records);
        assert_eq!(summary.tally.total(), 2);
        assert_eq!(summary.tally.count(UNKNOWN), 2);
        assert_eq!(summary.unknown.len(), 2);
        assert_eq!(summary.unknown[0].index, 1);
        assert!(summary.unknown[0].info.is_none());
        assert_eq!(
            summary.unknown[1].info,
            Some(json!({"r_actions": true, "note": "x"}))
        );
    }
}

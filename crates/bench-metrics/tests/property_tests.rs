//! Property-based tests for the pass^k estimator and failure breakdown.

use bench_metrics::{binomial, compute_metrics, pass_hat_k, TrialInfo, TrialRecord};
use proptest::prelude::*;

// Per-task success counts for a run with `n` trials.
fn run_strategy() -> impl Strategy<Value = (usize, Vec<usize>)> {
    (1usize..12).prop_flat_map(|n| (Just(n), prop::collection::vec(0..=n, 1..20)))
}

fn records_for(n: usize, successes: &[usize]) -> Vec<TrialRecord> {
    let mut records = Vec::new();
    for (task, &c) in successes.iter().enumerate() {
        for trial in 0..n {
            let reward = if trial < c { 1.0 } else { 0.0 };
            records.push(TrialRecord::new(task as u64, trial as i64, reward));
        }
    }
    records
}

proptest! {
    #[test]
    fn binomial_edges_are_one(n in 0u64..500) {
        prop_assert_eq!(binomial(n, 0), 1.0);
        prop_assert_eq!(binomial(n, n), 1.0);
    }

    #[test]
    fn binomial_is_symmetric(n in 0u64..60, k in 0u64..60) {
        prop_assume!(k <= n);
        prop_assert_eq!(binomial(n, k), binomial(n, n - k));
    }

    #[test]
    fn pass_hat_one_is_success_rate((n, successes) in run_strategy()) {
        for &c in &successes {
            let got = pass_hat_k(c as f64, n, 1);
            prop_assert!((got - c as f64 / n as f64).abs() < 1e-12);
        }
    }

    #[test]
    fn pass_hat_at_full_k_is_indicator((n, successes) in run_strategy()) {
        for &c in &successes {
            let expected = if c == n { 1.0 } else { 0.0 };
            prop_assert_eq!(pass_hat_k(c as f64, n, n), expected);
        }
    }

    #[test]
    fn pass_hat_k_is_non_increasing_in_k((n, successes) in run_strategy()) {
        let report = compute_metrics(&records_for(n, &successes)).expect("metrics");
        prop_assert_eq!(report.pass_hat_ks.len(), n);
        for pair in report.pass_hat_ks.windows(2) {
            prop_assert!(pair[1].value <= pair[0].value + 1e-12);
        }
        for p in &report.pass_hat_ks {
            prop_assert!((0.0..=1.0 + 1e-12).contains(&p.value));
        }
    }

    #[test]
    fn failure_percentages_sum_to_hundred(labels in prop::collection::vec(0usize..4, 1..40)) {
        let names = ["timeout", "bad_tool_call", "user_gave_up", "env_error"];
        let records: Vec<TrialRecord> = labels
            .iter()
            .enumerate()
            .map(|(i, &l)| {
                TrialRecord::new("t", i as i64, 0.0).with_info(TrialInfo {
                    source: Some(names[l].to_string()),
                    ..TrialInfo::default()
                })
            })
            .collect();
        let report = compute_metrics(&records).expect("metrics");
        let sum: f64 = report.failure_sources.iter().map(|s| s.percent).sum();
        prop_assert!((sum - 100.0).abs() < 1e-9);
        prop_assert_eq!(report.total_failures(), labels.len());
        for pair in report.failure_sources.windows(2) {
            prop_assert!(pair[0].count >= pair[1].count);
        }
    }
}

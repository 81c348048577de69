//! Unbiased pass^k estimation.
//!
//! For a task with `c` successful trials out of `n`, the probability that
//! `k` trials drawn without replacement all succeed is `C(c, k) / C(n, k)`.
//! The run-level pass^k is the mean of that ratio over tasks.

use tracing::debug;

/// Binomial coefficient `C(n, k)`.
///
/// `C(n, 0) = C(n, n) = 1` for every `n`, including `C(0, 0)`, and
/// `C(n, k) = 0` for `k > n`. Results that fit in `u128` are computed exactly.
pub fn binomial(n: u64, k: u64) -> f64 {
    if k == 0 || k == n {
        return 1.0;
    }
    if k > n {
        return 0.0;
    }
    let k = k.min(n - k);
    match binomial_exact(n, k) {
        Some(exact) => exact as f64,
        None => binomial_approx(n, k),
    }
}

// Each partial product C(n - k + i, i) is an integer, so the division is exact.
fn binomial_exact(n: u64, k: u64) -> Option<u128> {
    let mut acc: u128 = 1;
    for i in 1..=k {
        acc = acc.checked_mul(u128::from(n - k + i))? / u128::from(i);
    }
    Some(acc)
}

fn binomial_approx(n: u64, k: u64) -> f64 {
    (1..=k).fold(1.0_f64, |acc, i| acc * (n - k + i) as f64 / i as f64)
}

/// `C(c, k) / C(n, k)` for a single task.
///
/// Evaluated as `prod_{i<k} (c - i) / (n - i)`, which equals
/// `binomial(c, k) / binomial(n, k)` (see [`binomial`]) without forming either
/// coefficient, so it cannot overflow for large `n`. `c` is a reward sum and is
/// not clamped to `n`. Returns 0 when `k > n`.
pub fn pass_hat_k(c: f64, n: usize, k: usize) -> f64 {
    if k == 0 {
        return 1.0;
    }
    if k > n {
        return 0.0;
    }
    let mut ratio = 1.0_f64;
    for i in 0..k {
        let numerator = c - i as f64;
        if numerator == 0.0 {
            return 0.0;
        }
        ratio *= numerator / (n - i) as f64;
    }
    ratio
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PassHatK {
    pub k: usize,
    pub value: f64,
}

/// Mean pass^k over tasks for every k in `1..=num_trials`, capped at `max_k`.
pub fn estimate_pass_hat_k(
    successes: &[f64],
    num_trials: usize,
    max_k: Option<usize>,
) -> Vec<PassHatK> {
    if successes.is_empty() {
        return Vec::new();
    }
    let upper = max_k.map_or(num_trials, |cap| cap.min(num_trials));
    let out: Vec<PassHatK> = (1..=upper)
        .map(|k| {
            let sum: f64 = successes.iter().map(|&c| pass_hat_k(c, num_trials, k)).sum();
            PassHatK {
                k,
                value: sum / successes.len() as f64,
            }
        })
        .collect();
    debug!(tasks = successes.len(), num_trials, ks = out.len(), "estimated pass^k");
    out
}

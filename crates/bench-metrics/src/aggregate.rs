use std::collections::{BTreeSet, HashMap};
use tracing::{debug, warn};

use crate::config::RewardPolicy;
use crate::error::{MetricsError, Result};
use crate::record::TrialRecord;

/// Cumulative reward of one task across all of its trials.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskSuccess {
    pub task_id: String,
    pub successes: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Aggregate {
    pub num_records: usize,
    /// Number of distinct `trial` values; the upper bound for k.
    pub num_trials: usize,
    pub average_reward: f64,
    /// Per-task success counts in first-seen task order.
    pub tasks: Vec<TaskSuccess>,
}

impl Aggregate {
    pub fn successes(&self) -> Vec<f64> {
        self.tasks.iter().map(|t| t.successes).collect()
    }
}

pub fn aggregate(records: &[TrialRecord], policy: RewardPolicy) -> Result<Aggregate> {
    if records.is_empty() {
        return Err(MetricsError::EmptyInput);
    }

    let mut trials = BTreeSet::new();
    let mut reward_sum = 0.0_f64;
    let mut index_by_task: HashMap<String, usize> = HashMap::new();
    let mut tasks: Vec<TaskSuccess> = Vec::new();
    let mut non_binary = 0usize;

    for (index, record) in records.iter().enumerate() {
        if !record.reward.is_finite() {
            return Err(MetricsError::MalformedRecord {
                index,
                reason: format!("reward must be finite, got {}", record.reward),
            });
        }
        if !record.is_binary() {
            if policy == RewardPolicy::Strict {
                return Err(MetricsError::NonBinaryReward {
                    index,
                    task_id: record.task_id.key(),
                    reward: record.reward,
                });
            }
            non_binary += 1;
        }

        trials.insert(record.trial);
        reward_sum += record.reward;

        let key = record.task_id.key();
        match index_by_task.get(&key) {
            Some(&slot) => tasks[slot].successes += record.reward,
            None => {
                index_by_task.insert(key.clone(), tasks.len());
                tasks.push(TaskSuccess {
                    task_id: key,
                    successes: record.reward,
                });
            }
        }
    }

    if non_binary > 0 {
        warn!(
            non_binary,
            "non-binary rewards present; per-task success counts are reward sums"
        );
    }

    let aggregate = Aggregate {
        num_records: records.len(),
        num_trials: trials.len(),
        average_reward: reward_sum / records.len() as f64,
        tasks,
    };
    debug!(
        records = aggregate.num_records,
        trials = aggregate.num_trials,
        tasks = aggregate.tasks.len(),
        "aggregated trial records"
    );
    Ok(aggregate)
}

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::fmt;

use crate::error::{MetricsError, Result};

/// Task identifier as it appears on the wire: either a string or a number.
///
/// Tasks are grouped by [`TaskId::key`], so `"7"` and `7` name the same task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TaskId {
    Text(String),
    Number(Number),
}

impl TaskId {
    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskId::Text(s) => f.write_str(s),
            TaskId::Number(n) => match n.as_f64() {
                // Integral floats name the same task as the integer: 7.0 is 7.
                Some(v) if n.is_f64() && is_integral(v) => {
                    if v == 0.0 {
                        f.write_str("0")
                    } else {
                        write!(f, "{:.0}", v)
                    }
                }
                _ => write!(f, "{}", n),
            },
        }
    }
}

fn is_integral(v: f64) -> bool {
    v.is_finite() && v.fract() == 0.0 && v.abs() < 1e21
}

impl From<&str> for TaskId {
    fn from(value: &str) -> Self {
        TaskId::Text(value.to_string())
    }
}

impl From<u64> for TaskId {
    fn from(value: u64) -> Self {
        TaskId::Number(Number::from(value))
    }
}

/// Diagnostic payload attached to a trial.
///
/// `source`, `r_actions` and `outputs` are lifted out only when they carry a
/// usable type; anything else, including an ill-typed known field, stays in
/// `extra` so the whole payload can be reported back.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct TrialInfo {
    pub source: Option<String>,
    pub r_actions: Option<bool>,
    pub outputs: Option<CheckOutputs>,
    pub extra: Map<String, Value>,
}

/// Sub-check results, either named or positional.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CheckOutputs {
    Named(Map<String, Value>),
    Listed(Vec<Value>),
}

impl CheckOutputs {
    pub fn values(&self) -> Vec<&Value> {
        match self {
            CheckOutputs::Named(map) => map.values().collect(),
            CheckOutputs::Listed(items) => items.iter().collect(),
        }
    }
}

impl From<Map<String, Value>> for TrialInfo {
    fn from(mut extra: Map<String, Value>) -> Self {
        let source = match extra.remove("source") {
            Some(Value::String(s)) => Some(s),
            Some(v @ (Value::Number(_) | Value::Bool(_))) => Some(v.to_string()),
            Some(other) => {
                extra.insert("source".to_string(), other);
                None
            }
            None => None,
        };
        let r_actions = match extra.remove("r_actions") {
            Some(Value::Bool(b)) => Some(b),
            Some(other) => {
                extra.insert("r_actions".to_string(), other);
                None
            }
            None => None,
        };
        let outputs = match extra.remove("outputs") {
            Some(Value::Object(map)) => Some(CheckOutputs::Named(map)),
            Some(Value::Array(items)) => Some(CheckOutputs::Listed(items)),
            Some(other) => {
                extra.insert("outputs".to_string(), other);
                None
            }
            None => None,
        };
        TrialInfo {
            source,
            r_actions,
            outputs,
            extra,
        }
    }
}

impl From<TrialInfo> for Map<String, Value> {
    fn from(info: TrialInfo) -> Self {
        let mut map = info.extra;
        if let Some(source) = info.source {
            map.insert("source".to_string(), Value::String(source));
        }
        if let Some(r_actions) = info.r_actions {
            map.insert("r_actions".to_string(), Value::Bool(r_actions));
        }
        match info.outputs {
            Some(CheckOutputs::Named(outputs)) => {
                map.insert("outputs".to_string(), Value::Object(outputs));
            }
            Some(CheckOutputs::Listed(items)) => {
                map.insert("outputs".to_string(), Value::Array(items));
            }
            None => {}
        }
        map
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialRecord {
    pub task_id: TaskId,
    pub trial: i64,
    pub reward: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<TrialInfo>,
}

impl TrialRecord {
    pub fn new(task_id: impl Into<TaskId>, trial: i64, reward: f64) -> Self {
        Self {
            task_id: task_id.into(),
            trial,
            reward,
            info: None,
        }
    }

    pub fn with_info(mut self, info: TrialInfo) -> Self {
        self.info = Some(info);
        self
    }

    /// Only an exact zero reward counts as a failed trial.
    pub fn is_failure(&self) -> bool {
        self.reward == 0.0
    }

    pub fn is_binary(&self) -> bool {
        self.reward == 0.0 || self.reward == 1.0
    }
}

/// Decode a JSON array of trial records, rejecting any record whose
/// `task_id`, `trial` or `reward` is missing or ill-typed. Diagnostics are
/// never a reason to reject a record.
pub fn decode_records(value: &Value) -> Result<Vec<TrialRecord>> {
    let items = value.as_array().ok_or_else(|| MetricsError::MalformedRecord {
        index: 0,
        reason: format!("expected an array of records, got {}", value_type_name(value)),
    })?;
    items
        .iter()
        .enumerate()
        .map(|(index, item)| decode_record(index, item))
        .collect()
}

pub fn decode_record(index: usize, value: &Value) -> Result<TrialRecord> {
    let malformed = |reason: String| MetricsError::MalformedRecord { index, reason };
    let obj = value
        .as_object()
        .ok_or_else(|| malformed(format!("expected object, got {}", value_type_name(value))))?;

    let task_id = match obj.get("task_id") {
        Some(Value::String(s)) => TaskId::Text(s.clone()),
        Some(Value::Number(n)) => TaskId::Number(n.clone()),
        Some(other) => {
            return Err(malformed(format!(
                "task_id must be a string or number, got {}",
                value_type_name(other)
            )))
        }
        None => return Err(malformed("missing required field task_id".to_string())),
    };

    let trial = match obj.get("trial") {
        Some(v) => integer_value(v)
            .ok_or_else(|| malformed(format!("trial must be an integer, got {}", v)))?,
        None => return Err(malformed("missing required field trial".to_string())),
    };

    let reward = match obj.get("reward") {
        Some(Value::Number(n)) => n
            .as_f64()
            .ok_or_else(|| malformed(format!("reward {} is not representable", n)))?,
        Some(other) => {
            return Err(malformed(format!(
                "reward must be a number, got {}",
                value_type_name(other)
            )))
        }
        None => return Err(malformed("missing required field reward".to_string())),
    };

    let info = match obj.get("info") {
        None | Some(Value::Null) => None,
        Some(Value::Object(map)) => Some(TrialInfo::from(map.clone())),
        // Opaque diagnostics: nothing to classify, but the payload is kept.
        Some(other) => {
            let mut extra = Map::new();
            extra.insert("info".to_string(), other.clone());
            Some(TrialInfo::from(extra))
        }
    };

    Ok(TrialRecord {
        task_id,
        trial,
        reward,
        info,
    })
}

fn integer_value(value: &Value) -> Option<i64> {
    if let Some(i) = value.as_i64() {
        return Some(i);
    }
    let f = value.as_f64()?;
    if f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

pub(crate) fn value_type_name(value: &Value) -> &'static str {
    if value.is_string() {
        "string"
    } else if value.is_boolean() {
        "boolean"
    } else if value.is_number() {
        "number"
    } else if value.is_array() {
        "array"
    } else if value.is_object() {
        "object"
    } else {
        "null"
    }
}

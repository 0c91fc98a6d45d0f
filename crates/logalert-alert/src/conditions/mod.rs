//! The five condition algorithms.
//!
//! Each evaluator decodes the rule's `parameters` into its own typed
//! parameter struct and is otherwise a pure function of the batch, the
//! metrics history and the evaluation time.

pub mod absence;
pub mod anomaly;
pub mod frequency;
pub mod pattern;
pub mod threshold;

use crate::error::{AlertError, Result};
use crate::history::MetricsHistory;
use chrono::{DateTime, Duration, Utc};
use logalert_common::types::{AlertContext, ConditionKind, LogEntry, LogLevel};
use serde::de::{self, DeserializeOwned, Deserializer};
use serde::Deserialize;
use serde_json::{Map, Value};

/// Result of evaluating one rule.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Evaluation {
    pub triggered: bool,
    pub context: AlertContext,
}

impl Evaluation {
    pub fn new(triggered: bool, context: AlertContext) -> Self {
        Self { triggered, context }
    }
}

/// Everything an evaluator may read.
#[derive(Clone, Copy)]
pub struct EvalInput<'a> {
    pub batch: &'a [LogEntry],
    pub history: &'a MetricsHistory,
    pub now: DateTime<Utc>,
}

/// Runs the algorithm for `kind` over `input`.
///
/// # Errors
///
/// Returns a configuration error when `parameters` cannot be decoded for
/// `kind` or contain an invalid regex, operator or level.
pub fn evaluate(
    kind: ConditionKind,
    parameters: &Map<String, Value>,
    input: EvalInput<'_>,
) -> Result<Evaluation> {
    match kind {
        ConditionKind::Pattern => pattern::evaluate(&decode(kind, parameters)?, input),
        ConditionKind::Threshold => threshold::evaluate(&decode(kind, parameters)?, input),
        ConditionKind::Anomaly => anomaly::evaluate(&decode(kind, parameters)?, input),
        ConditionKind::Frequency => frequency::evaluate(&decode(kind, parameters)?, input),
        ConditionKind::Absence => absence::evaluate(&decode(kind, parameters)?, input),
    }
}

fn decode<T: DeserializeOwned>(kind: ConditionKind, parameters: &Map<String, Value>) -> Result<T> {
    serde_json::from_value(Value::Object(parameters.clone())).map_err(|source| {
        AlertError::InvalidParameters {
            condition: kind.as_str(),
            source,
        }
    })
}

/// Accepts counts and window lengths written as `60` or `60.0`; negative or
/// fractional values are rejected.
pub(crate) fn whole_number<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: TryFrom<u64>,
{
    let number = serde_json::Number::deserialize(deserializer)?;
    let whole = number.as_u64().or_else(|| {
        number
            .as_f64()
            .filter(|f| *f >= 0.0 && f.fract() == 0.0 && *f <= u64::MAX as f64)
            .map(|f| f as u64)
    });
    whole
        .and_then(|n| T::try_from(n).ok())
        .ok_or_else(|| {
            de::Error::custom(format!("expected a non-negative whole number, got {number}"))
        })
}

pub(crate) fn parse_level(level: Option<&str>) -> Result<Option<LogLevel>> {
    level
        .map(|l| l.parse().map_err(|_| AlertError::UnknownLevel(l.to_string())))
        .transpose()
}

pub(crate) fn compile(pattern: &str) -> Result<regex::Regex> {
    regex::Regex::new(pattern).map_err(|source| AlertError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })
}

/// Entries at `level` (if given) stamped no earlier than `now - window_secs`.
pub(crate) fn in_window<'a>(
    batch: &'a [LogEntry],
    level: Option<LogLevel>,
    window_secs: u64,
    now: DateTime<Utc>,
) -> impl Iterator<Item = &'a LogEntry> {
    let cutoff = now - Duration::seconds(crate::history::clamp_secs(window_secs));
    batch
        .iter()
        .filter(move |e| level.map_or(true, |l| e.level == l))
        .filter(move |e| e.timestamp >= cutoff)
}

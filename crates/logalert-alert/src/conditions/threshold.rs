use super::{EvalInput, Evaluation};
use crate::error::{AlertError, Result};
use logalert_common::types::AlertContext;
use serde::Deserialize;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    GreaterThan,
    GreaterEqual,
    LessThan,
    LessEqual,
    Equal,
    NotEqual,
}

impl FromStr for CompareOp {
    type Err = AlertError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            ">" | "gt" => Ok(Self::GreaterThan),
            ">=" | "gte" => Ok(Self::GreaterEqual),
            "<" | "lt" => Ok(Self::LessThan),
            "<=" | "lte" => Ok(Self::LessEqual),
            "==" | "eq" => Ok(Self::Equal),
            "!=" | "ne" => Ok(Self::NotEqual),
            other => Err(AlertError::UnknownOperator(other.to_string())),
        }
    }
}

impl std::fmt::Display for CompareOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let symbol = match self {
            Self::GreaterThan => ">",
            Self::GreaterEqual => ">=",
            Self::LessThan => "<",
            Self::LessEqual => "<=",
            Self::Equal => "==",
            Self::NotEqual => "!=",
        };
        f.write_str(symbol)
    }
}

impl CompareOp {
    pub fn check(self, value: f64, threshold: f64) -> bool {
        match self {
            Self::GreaterThan => value > threshold,
            Self::GreaterEqual => value >= threshold,
            Self::LessThan => value < threshold,
            Self::LessEqual => value <= threshold,
            Self::Equal => (value - threshold).abs() < f64::EPSILON,
            Self::NotEqual => (value - threshold).abs() >= f64::EPSILON,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ThresholdParams {
    pub metric: String,
    pub threshold: f64,
    pub operator: String,
    #[serde(default = "default_window", deserialize_with = "super::whole_number")]
    pub window: u64,
}

fn default_window() -> u64 {
    300
}

/// Compares the mean of the metric's window against `threshold`.
pub fn evaluate(params: &ThresholdParams, input: EvalInput<'_>) -> Result<Evaluation> {
    let op: CompareOp = params.operator.parse()?;

    let points = input.history.window(&params.metric, input.now, params.window);
    let mut context = AlertContext::new();
    context.insert("metric".into(), params.metric.clone().into());
    context.insert("threshold".into(), params.threshold.into());
    context.insert("operator".into(), op.to_string().into());
    context.insert("window_seconds".into(), params.window.into());
    context.insert("data_points".into(), points.len().into());

    if points.is_empty() {
        return Ok(Evaluation::new(false, context));
    }

    let current = points.iter().map(|p| p.value).sum::<f64>() / points.len() as f64;
    context.insert("current_value".into(), current.into());

    Ok(Evaluation::new(op.check(current, params.threshold), context))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::MetricsHistory;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn params(operator: &str, threshold: f64) -> ThresholdParams {
        ThresholdParams {
            metric: "error_rate".into(),
            threshold,
            operator: operator.into(),
            window: 300,
        }
    }

    fn run(history: &MetricsHistory, params: &ThresholdParams) -> Result<Evaluation> {
        evaluate(
            params,
            EvalInput {
                batch: &[],
                history,
                now: now(),
            },
        )
    }

    #[test]
    fn operators_and_aliases() {
        assert!(CompareOp::from_str(">").unwrap().check(2.0, 1.0));
        assert!(CompareOp::from_str("gte").unwrap().check(1.0, 1.0));
        assert!(CompareOp::from_str("<").unwrap().check(0.5, 1.0));
        assert!(!CompareOp::from_str("lte").unwrap().check(1.5, 1.0));
        assert!(CompareOp::from_str("==").unwrap().check(0.1 + 0.2, 0.3));
        assert!(CompareOp::from_str("ne").unwrap().check(0.0, 1.0));
        assert!(matches!(
            CompareOp::from_str("=>"),
            Err(AlertError::UnknownOperator(op)) if op == "=>"
        ));
    }

    #[test]
    fn compares_window_mean() {
        let mut history = MetricsHistory::new();
        history.record("error_rate", now() - Duration::seconds(400), 1.0);
        history.record("error_rate", now() - Duration::seconds(60), 0.2);
        history.record("error_rate", now(), 0.6);

        let eval = run(&history, &params(">", 0.3)).unwrap();
        assert!(eval.triggered);
        assert_eq!(eval.context["data_points"], 2);
        let current = eval.context["current_value"].as_f64().unwrap();
        assert!((current - 0.4).abs() < 1e-9);

        assert!(!run(&history, &params(">", 0.5)).unwrap().triggered);
    }

    #[test]
    fn empty_window_never_fires() {
        let history = MetricsHistory::new();
        let eval = run(&history, &params("<", 100.0)).unwrap();
        assert!(!eval.triggered);
        assert_eq!(eval.context["data_points"], 0);
    }
}

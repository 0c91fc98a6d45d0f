use super::{EvalInput, Evaluation};
use crate::error::Result;
use logalert_common::types::AlertContext;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AnomalyParams {
    pub metric: String,
    #[serde(default = "default_sensitivity")]
    pub sensitivity: f64,
    #[serde(default = "default_window", deserialize_with = "super::whole_number")]
    pub window: u64,
    #[serde(default = "default_min_data_points", deserialize_with = "super::whole_number")]
    pub min_data_points: usize,
}

fn default_sensitivity() -> f64 {
    3.0
}

fn default_window() -> u64 {
    3600
}

fn default_min_data_points() -> usize {
    10
}

/// Mean and population standard deviation.
fn stats(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}

/// Z-score of the newest point against the rest of the window.
///
/// A baseline with zero variance yields `z = 0`, so a flat history followed
/// by any spike does not fire.
pub fn evaluate(params: &AnomalyParams, input: EvalInput<'_>) -> Result<Evaluation> {
    let values: Vec<f64> = input
        .history
        .window(&params.metric, input.now, params.window)
        .iter()
        .map(|p| p.value)
        .collect();

    let mut context = AlertContext::new();
    context.insert("metric".into(), params.metric.clone().into());
    context.insert("sensitivity".into(), params.sensitivity.into());
    context.insert("data_points".into(), values.len().into());

    let required = params.min_data_points.max(2);
    let Some((&recent, historical)) = values.split_last().filter(|_| values.len() >= required)
    else {
        return Ok(Evaluation::new(false, context));
    };

    let (mean, std) = stats(historical);
    let z_score = if std == 0.0 {
        0.0
    } else {
        (recent - mean).abs() / std
    };

    context.insert("current_value".into(), recent.into());
    context.insert("mean".into(), mean.into());
    context.insert("std".into(), std.into());
    context.insert("z_score".into(), z_score.into());

    Ok(Evaluation::new(z_score > params.sensitivity, context))
}

use super::{compile, in_window, parse_level, EvalInput, Evaluation};
use crate::error::Result;
use logalert_common::types::AlertContext;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, Deserialize)]
pub struct AbsenceParams {
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default = "default_window", deserialize_with = "super::whole_number")]
    pub window: u64,
}

fn default_window() -> u64 {
    300
}

/// Fires when no entry inside the window matches the level and pattern.
pub fn evaluate(params: &AbsenceParams, input: EvalInput<'_>) -> Result<Evaluation> {
    let level = parse_level(params.level.as_deref())?;
    let regex = params.pattern.as_deref().map(compile).transpose()?;

    let mut checked = 0usize;
    let mut found = 0usize;
    for entry in in_window(input.batch, level, params.window, input.now) {
        checked += 1;
        if regex.as_ref().map_or(true, |r| r.is_match(&entry.message)) {
            found += 1;
        }
    }

    let mut context = AlertContext::new();
    context.insert(
        "pattern".into(),
        params.pattern.clone().map_or(Value::Null, Value::String),
    );
    context.insert(
        "level".into(),
        level.map_or(Value::Null, |l| l.as_str().into()),
    );
    context.insert("window_seconds".into(), params.window.into());
    context.insert("checked_entries".into(), checked.into());

    Ok(Evaluation::new(found == 0, context))
}

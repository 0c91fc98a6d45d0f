use super::{compile, EvalInput, Evaluation};
use crate::error::Result;
use logalert_common::types::AlertContext;
use serde::Deserialize;
use serde_json::json;

/// At most this many matching entries are copied into the context.
pub const MAX_MATCHED_LOGS: usize = 10;

#[derive(Debug, Clone, Deserialize)]
pub struct PatternParams {
    pub pattern: String,
    #[serde(default = "default_min_matches", deserialize_with = "super::whole_number")]
    pub min_matches: u64,
}

fn default_min_matches() -> u64 {
    1
}

/// Counts batch messages matching `pattern`; fires at `min_matches` or more.
pub fn evaluate(params: &PatternParams, input: EvalInput<'_>) -> Result<Evaluation> {
    let regex = compile(&params.pattern)?;

    let mut matches = 0u64;
    let mut matched_logs = Vec::new();
    for entry in input.batch.iter().filter(|e| regex.is_match(&e.message)) {
        matches += 1;
        if matched_logs.len() < MAX_MATCHED_LOGS {
            matched_logs.push(json!({
                "timestamp": entry.timestamp.to_rfc3339(),
                "level": entry.level.as_str(),
                "message": entry.message,
            }));
        }
    }

    let mut context = AlertContext::new();
    context.insert("pattern".into(), params.pattern.clone().into());
    context.insert("matches".into(), matches.into());
    context.insert("min_matches".into(), params.min_matches.into());
    context.insert("matched_logs".into(), matched_logs.into());

    Ok(Evaluation::new(matches >= params.min_matches, context))
}

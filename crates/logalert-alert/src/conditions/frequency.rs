use super::{in_window, parse_level, EvalInput, Evaluation};
use crate::error::Result;
use logalert_common::types::AlertContext;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct FrequencyParams {
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default = "default_window", deserialize_with = "super::whole_number")]
    pub window: u64,
}

fn default_threshold() -> f64 {
    100.0
}

fn default_window() -> u64 {
    60
}

/// Fires when strictly more than `threshold` entries fall inside the window.
pub fn evaluate(params: &FrequencyParams, input: EvalInput<'_>) -> Result<Evaluation> {
    let level = parse_level(params.level.as_deref())?;
    let count = in_window(input.batch, level, params.window, input.now).count();

    let mut context = AlertContext::new();
    context.insert("frequency".into(), count.into());
    context.insert("threshold".into(), params.threshold.into());
    context.insert("window_seconds".into(), params.window.into());
    if let Some(level) = level {
        context.insert("level".into(), level.as_str().into());
    }

    Ok(Evaluation::new(count as f64 > params.threshold, context))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AlertError;
    use crate::history::MetricsHistory;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use logalert_common::types::{LogEntry, LogLevel};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn entries(count: usize, level: LogLevel, age_secs: i64) -> Vec<LogEntry> {
        (0..count)
            .map(|i| {
                LogEntry::new(
                    now() - Duration::seconds(age_secs),
                    level,
                    format!("entry {i}"),
                )
            })
            .collect()
    }

    fn run(batch: &[LogEntry], level: Option<&str>) -> Result<Evaluation> {
        let history = MetricsHistory::new();
        let params = FrequencyParams {
            threshold: 5.0,
            level: level.map(str::to_string),
            window: 60,
        };
        evaluate(
            &params,
            EvalInput {
                batch,
                history: &history,
                now: now(),
            },
        )
    }

    #[test]
    fn strictly_greater_than_threshold() {
        assert!(run(&entries(6, LogLevel::Info, 10), None).unwrap().triggered);

        let eval = run(&entries(5, LogLevel::Info, 10), None).unwrap();
        assert!(!eval.triggered);
        assert_eq!(eval.context["frequency"], 5);
    }

    #[test]
    fn ignores_entries_outside_window() {
        let mut batch = entries(3, LogLevel::Info, 10);
        batch.extend(entries(10, LogLevel::Info, 61));
        let eval = run(&batch, None).unwrap();
        assert!(!eval.triggered);
        assert_eq!(eval.context["frequency"], 3);
    }

    #[test]
    fn filters_by_level_case_insensitively() {
        let mut batch = entries(6, LogLevel::Error, 5);
        batch.extend(entries(6, LogLevel::Info, 5));

        let eval = run(&batch, Some("error")).unwrap();
        assert!(eval.triggered);
        assert_eq!(eval.context["frequency"], 6);
        assert_eq!(eval.context["level"], "ERROR");

        assert!(!run(&batch, Some("CRITICAL")).unwrap().triggered);
    }

    #[test]
    fn unknown_level_is_an_error() {
        assert!(matches!(
            run(&[], Some("verbose")),
            Err(AlertError::UnknownLevel(l)) if l == "verbose"
        ));
    }
}

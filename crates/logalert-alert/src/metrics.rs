//! Metrics derived from each ingested batch.

use crate::error::{AlertError, Result};
use crate::history::MetricsHistory;
use logalert_common::types::LogEntry;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing;

pub const ERROR_RATE: &str = "error_rate";
pub const ERROR_COUNT: &str = "error_count";
pub const LOG_FREQUENCY: &str = "log_frequency";
pub const RESPONSE_TIME: &str = "response_time";

/// Matches durations such as `"took 250 ms"` or `"12.5ms"`.
pub const RESPONSE_TIME_PATTERN: &str = r"(\d+(?:\.\d+)?)\s*ms\b";

/// Declarative form of a [`MetricExtractor`], as found in configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractorConfig {
    pub metric: String,
    /// Regex whose first capture group is the numeric value.
    pub pattern: String,
}

impl ExtractorConfig {
    pub fn compile(&self) -> Result<MetricExtractor> {
        MetricExtractor::new(&self.metric, &self.pattern)
    }
}

pub fn default_extractors() -> Vec<ExtractorConfig> {
    vec![ExtractorConfig {
        metric: RESPONSE_TIME.to_string(),
        pattern: RESPONSE_TIME_PATTERN.to_string(),
    }]
}

/// Pulls numeric samples for one metric out of log messages.
#[derive(Debug, Clone)]
pub struct MetricExtractor {
    metric: String,
    regex: Regex,
}

impl MetricExtractor {
    pub fn new(metric: &str, pattern: &str) -> Result<Self> {
        let regex = Regex::new(pattern).map_err(|source| AlertError::InvalidExtractor {
            metric: metric.to_string(),
            source,
        })?;
        if regex.captures_len() < 2 {
            return Err(AlertError::Config(format!(
                "extractor for metric '{metric}' needs a capture group"
            )));
        }
        Ok(Self {
            metric: metric.to_string(),
            regex,
        })
    }

    /// Every numeric capture in `message`, left to right.
    pub fn extract(&self, message: &str) -> Vec<f64> {
        self.regex
            .captures_iter(message)
            .filter_map(|caps| {
                let raw = caps.get(1)?.as_str();
                match raw.parse::<f64>() {
                    Ok(v) => Some(v),
                    Err(e) => {
                        tracing::debug!(
                            metric = %self.metric,
                            capture = raw,
                            error = %e,
                            "Skipping non-numeric capture"
                        );
                        None
                    }
                }
            })
            .collect()
    }
}

/// Records the batch-level metrics and every extracted sample into
/// `history`, all stamped with the first entry's timestamp. Empty batches
/// record nothing.
pub fn record_batch(
    history: &mut MetricsHistory,
    batch: &[LogEntry],
    extractors: &[MetricExtractor],
) {
    let Some(first) = batch.first() else {
        return;
    };
    let ts = first.timestamp;
    let total = batch.len();
    let errors = batch.iter().filter(|e| e.level.is_error()).count();

    history.record(ERROR_RATE, ts, errors as f64 / total as f64);
    history.record(ERROR_COUNT, ts, errors as f64);
    history.record(LOG_FREQUENCY, ts, total as f64);

    for entry in batch {
        for extractor in extractors {
            for value in extractor.extract(&entry.message) {
                history.record(&extractor.metric, ts, value);
            }
        }
    }
}

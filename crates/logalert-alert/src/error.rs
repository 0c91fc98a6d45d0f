/// Errors raised by rule evaluation and engine setup.
///
/// Evaluation errors never leave the engine: a rule whose parameters fail
/// to decode is logged and treated as not triggered. Only
/// [`AlertError::StatePoisoned`] surfaces from `process_logs`.
#[derive(Debug, thiserror::Error)]
pub enum AlertError {
    /// Condition parameters are missing a required key or have the wrong type.
    #[error("Alert: invalid {condition} parameters: {source}")]
    InvalidParameters {
        condition: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("Alert: unknown comparison operator '{0}'")]
    UnknownOperator(String),

    #[error("Alert: unknown log level '{0}'")]
    UnknownLevel(String),

    #[error("Alert: invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// A metric extractor in the engine configuration failed to compile.
    #[error("Alert: invalid extractor for metric '{metric}': {source}")]
    InvalidExtractor {
        metric: String,
        #[source]
        source: regex::Error,
    },

    /// A configured notifier could not be built.
    #[error("Alert: notifier error: {0}")]
    Notify(#[from] logalert_notify::error::NotifyError),

    #[error("Alert: configuration error: {0}")]
    Config(String),

    /// A thread panicked while holding the engine lock.
    #[error("Alert: engine state poisoned by a panicked thread")]
    StatePoisoned,
}

/// Convenience `Result` alias for alert operations.
pub type Result<T> = std::result::Result<T, AlertError>;

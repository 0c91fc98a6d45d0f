use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Free-form data attached to an alert (matched log excerpts, computed
/// statistics, ...). Rendered by notifiers, never interpreted by the engine.
pub type AlertContext = Map<String, Value>;

/// Log record level, ordered from least to most severe.
///
/// Parsing is case-insensitive and accepts the common `WARN` / `FATAL`
/// spellings.
///
/// # Examples
///
/// ```
/// use logalert_common::types::LogLevel;
///
/// let level: LogLevel = "error".parse().unwrap();
/// assert_eq!(level, LogLevel::Error);
/// assert_eq!("Warn".parse::<LogLevel>().unwrap(), LogLevel::Warning);
/// assert!(LogLevel::Critical > LogLevel::Info);
/// assert_eq!(level.to_string(), "ERROR");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl LogLevel {
    /// `ERROR` and `CRITICAL` count towards the derived error rate.
    pub fn is_error(self) -> bool {
        matches!(self, LogLevel::Error | LogLevel::Critical)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
            LogLevel::Critical => "CRITICAL",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "DEBUG" => Ok(LogLevel::Debug),
            "INFO" => Ok(LogLevel::Info),
            "WARNING" | "WARN" => Ok(LogLevel::Warning),
            "ERROR" => Ok(LogLevel::Error),
            "CRITICAL" | "FATAL" => Ok(LogLevel::Critical),
            _ => Err(format!("unknown log level: {s}")),
        }
    }
}

impl TryFrom<String> for LogLevel {
    type Error = String;

    fn try_from(value: String) -> Result<Self, String> {
        value.parse()
    }
}

impl From<LogLevel> for String {
    fn from(level: LogLevel) -> Self {
        level.as_str().to_string()
    }
}

/// One structured log record of an ingested batch.
///
/// Keys other than `timestamp`, `level` and `message` are kept in `fields`
/// and are not interpreted by the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl LogEntry {
    pub fn new(timestamp: DateTime<Utc>, level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            timestamp,
            level,
            message: message.into(),
            fields: Map::new(),
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }
}

/// Alert severity level, ordered from lowest to highest.
///
/// # Examples
///
/// ```
/// use logalert_common::types::Severity;
///
/// let sev: Severity = "Error".parse().unwrap();
/// assert_eq!(sev, Severity::Error);
/// assert_eq!(sev.to_string(), "error");
/// assert_eq!(Severity::default(), Severity::Warning);
/// assert!(Severity::Critical > Severity::Info);
/// ```
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    #[default]
    Warning,
    Error,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "info" => Ok(Severity::Info),
            "warning" => Ok(Severity::Warning),
            "error" => Ok(Severity::Error),
            "critical" => Ok(Severity::Critical),
            _ => Err(format!("unknown severity: {s}")),
        }
    }
}

/// The evaluation algorithm a rule uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConditionKind {
    /// Regex matches over the batch's messages.
    Pattern,
    /// Windowed mean of a metric compared against a fixed value.
    Threshold,
    /// Z-score of the latest metric value against its recent history.
    Anomaly,
    /// Count of (optionally level-filtered) entries inside a time window.
    Frequency,
    /// No matching entry inside a time window.
    Absence,
}

impl ConditionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ConditionKind::Pattern => "pattern",
            ConditionKind::Threshold => "threshold",
            ConditionKind::Anomaly => "anomaly",
            ConditionKind::Frequency => "frequency",
            ConditionKind::Absence => "absence",
        }
    }
}

impl std::fmt::Display for ConditionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ConditionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pattern" => Ok(ConditionKind::Pattern),
            "threshold" => Ok(ConditionKind::Threshold),
            "anomaly" => Ok(ConditionKind::Anomaly),
            "frequency" => Ok(ConditionKind::Frequency),
            "absence" => Ok(ConditionKind::Absence),
            _ => Err(format!("unknown condition: {s}")),
        }
    }
}

/// One rule firing produced by a single `process_logs` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggeredAlert {
    /// Rule name (human-readable).
    pub rule: String,
    pub severity: Severity,
    /// Evaluation time, serialized as RFC 3339.
    pub time: DateTime<Utc>,
    pub context: AlertContext,
}

use crate::types::{ConditionKind, Severity};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A named condition bound to a list of notifiers.
///
/// The rule itself only carries configuration plus the cooldown state
/// (`last_triggered`); evaluation lives in the alert engine. A rule is
/// either *armed* or *in cooldown*, and the state is derived from
/// `last_triggered` on every check:
///
/// ```
/// use chrono::{Duration, Utc};
/// use logalert_common::rule::AlertRule;
/// use logalert_common::types::ConditionKind;
///
/// let mut rule = AlertRule::new("Error Burst", ConditionKind::Frequency).with_cooldown(60);
/// assert_eq!(rule.id, "error_burst");
///
/// let now = Utc::now();
/// assert!(!rule.is_in_cooldown(now));
/// rule.mark_triggered(now);
/// assert!(rule.is_in_cooldown(now + Duration::seconds(59)));
/// assert!(!rule.is_in_cooldown(now + Duration::seconds(60)));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRule {
    /// Unique within an engine. Derived from `name` when left empty.
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub condition: ConditionKind,
    /// Condition-specific parameters, decoded by the matching evaluator.
    #[serde(default)]
    pub parameters: Map<String, Value>,
    #[serde(default)]
    pub severity: Severity,
    /// Names of the notifiers to dispatch to, in order.
    #[serde(default)]
    pub notifiers: Vec<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Seconds during which the rule cannot fire again after a trigger.
    #[serde(default = "default_cooldown_period", alias = "cooldown_secs")]
    pub cooldown_period: u64,
    #[serde(default)]
    pub last_triggered: Option<DateTime<Utc>>,
}

/// Longer cooldowns are clamped; chrono durations overflow long before `u64::MAX`.
const MAX_COOLDOWN_SECS: u64 = 100 * 365 * 86_400;

fn default_enabled() -> bool {
    true
}

fn default_cooldown_period() -> u64 {
    300
}

impl AlertRule {
    pub fn new(name: impl Into<String>, condition: ConditionKind) -> Self {
        let name = name.into();
        Self {
            id: derive_id(&name),
            name,
            description: String::new(),
            condition,
            parameters: Map::new(),
            severity: Severity::default(),
            notifiers: Vec::new(),
            enabled: default_enabled(),
            cooldown_period: default_cooldown_period(),
            last_triggered: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Appends a notifier name; names already present are ignored.
    pub fn with_notifier(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !self.notifiers.contains(&name) {
            self.notifiers.push(name);
        }
        self
    }

    pub fn with_cooldown(mut self, secs: u64) -> Self {
        self.cooldown_period = secs;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Fills in `id` from `name` if it was left empty (e.g. by a config
    /// file that only names the rule).
    pub fn ensure_id(&mut self) {
        if self.id.trim().is_empty() {
            self.id = derive_id(&self.name);
        }
    }

    /// True while `now` is less than `cooldown_period` seconds after the last trigger.
    pub fn is_in_cooldown(&self, now: DateTime<Utc>) -> bool {
        self.cooldown_remaining(now).is_some()
    }

    /// Time left until the rule is armed again, `None` when already armed.
    pub fn cooldown_remaining(&self, now: DateTime<Utc>) -> Option<Duration> {
        let last = self.last_triggered?;
        let secs = self.cooldown_period.min(MAX_COOLDOWN_SECS) as i64;
        let period = Duration::seconds(secs);
        let elapsed = now - last;
        if elapsed < period {
            Some(period - elapsed)
        } else {
            None
        }
    }

    pub fn mark_triggered(&mut self, now: DateTime<Utc>) {
        self.last_triggered = Some(now);
    }
}

/// `"High Error Rate"` -> `"high_error_rate"`.
fn derive_id(name: &str) -> String {
    name.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("_")
}

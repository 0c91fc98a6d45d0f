pub mod email;
pub mod in_app;
pub mod webhook;

use chrono::{DateTime, Utc};
use logalert_common::rule::AlertRule;

/// When the rule fired: the engine marks the rule before dispatching, so
/// `last_triggered` is the trigger time. Falls back to the current time for
/// rules sent outside the engine.
pub(crate) fn fired_at(rule: &AlertRule) -> DateTime<Utc> {
    rule.last_triggered.unwrap_or_else(Utc::now)
}

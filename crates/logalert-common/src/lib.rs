//! Shared data model for the log alerting engine: log records, alert rules
//! with their cooldown state, and the alerts produced by an evaluation.

pub mod rule;
pub mod types;

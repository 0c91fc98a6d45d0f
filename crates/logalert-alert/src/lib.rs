//! Rule engine that turns structured log batches into alerts.
//!
//! Each batch handed to [`engine::AlertEngine::process_logs`] is folded into
//! a bounded per-metric [`history::MetricsHistory`] (error rate, log
//! frequency, values extracted from messages) and then checked against every
//! registered rule. Built-in conditions are pattern, threshold, anomaly,
//! frequency and absence. Rules that fire enter their cooldown and are
//! delivered through the notifiers of `logalert-notify`.

pub mod conditions;
pub mod config;
pub mod engine;
pub mod error;
pub mod history;
pub mod metrics;

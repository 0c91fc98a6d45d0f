//! Notification delivery for fired alert rules.
//!
//! A fired rule is dispatched to every [`Notifier`] it names, looked up in a
//! [`registry::NotifierRegistry`]. Built-in notifiers cover webhooks, email
//! (SMTP) and an in-process inbox; hosts can register their own.

pub mod channels;
pub mod config;
pub mod error;
pub mod registry;
pub mod utils;


use anyhow::Result;
use async_trait::async_trait;
use logalert_common::rule::AlertRule;
use logalert_common::types::AlertContext;

/// A delivery channel for fired alerts (e.g. a webhook endpoint, a mailbox).
///
/// Notifiers are registered by [`name`](Notifier::name); registering a second
/// notifier under the same name replaces the first.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Registry key referenced by [`AlertRule::notifiers`].
    fn name(&self) -> &str;

    /// Delivers one alert for `rule`.
    ///
    /// Returns `Ok(true)` on (best-effort) delivery and `Ok(false)` when the
    /// channel rejected it. Implementations apply their own timeouts.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport failed.
    async fn send(&self, rule: &AlertRule, context: &AlertContext) -> Result<bool>;
}

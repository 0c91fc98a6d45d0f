use crate::Notifier;
use logalert_common::rule::AlertRule;
use logalert_common::types::AlertContext;
use std::collections::HashMap;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tracing;

/// Name -> notifier mapping owned by an engine.
#[derive(Default)]
pub struct NotifierRegistry {
    notifiers: HashMap<String, Arc<dyn Notifier>>,
}

impl NotifierRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `notifier` under its own name, replacing any previous one.
    pub fn register(&mut self, notifier: Arc<dyn Notifier>) {
        let name = notifier.name().to_string();
        if self.notifiers.insert(name.clone(), notifier).is_some() {
            tracing::debug!(notifier = %name, "Replaced existing notifier");
        }
    }

    /// Returns true if a notifier was registered under `name`.
    pub fn remove(&mut self, name: &str) -> bool {
        self.notifiers.remove(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Notifier>> {
        self.notifiers.get(name).cloned()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.notifiers.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.notifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notifiers.is_empty()
    }

    /// Looks up every notifier a rule names, in the rule's order. Duplicate
    /// names are visited once; unknown names resolve to `None`.
    ///
    /// The returned handles are independent of the registry, so the caller
    /// can release whatever lock guards it before dispatching.
    pub fn resolve(&self, names: &[String]) -> Vec<DispatchTarget> {
        let mut targets: Vec<DispatchTarget> = Vec::with_capacity(names.len());
        for name in names {
            if targets.iter().any(|t| &t.name == name) {
                continue;
            }
            targets.push(DispatchTarget {
                name: name.clone(),
                notifier: self.get(name),
            });
        }
        targets
    }
}

/// A notifier name paired with its registered handle, if any.
#[derive(Clone)]
pub struct DispatchTarget {
    pub name: String,
    pub notifier: Option<Arc<dyn Notifier>>,
}

/// Outcome of dispatching one fired rule.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub delivered: Vec<String>,
    pub failed: Vec<String>,
    /// Names the rule references that have no registered notifier.
    pub missing: Vec<String>,
}

impl DispatchReport {
    pub fn all_delivered(&self) -> bool {
        self.failed.is_empty() && self.missing.is_empty()
    }
}

/// Sends one fired rule to each target in order.
///
/// Missing notifiers are logged and skipped. Inside a tokio runtime each
/// `send` runs on its own task; without one it is polled in place. Either
/// way an error, a `false` result or a panic is logged and recorded as a
/// failure, and the remaining targets are still attempted.
pub async fn dispatch(
    rule: &AlertRule,
    context: &AlertContext,
    targets: Vec<DispatchTarget>,
) -> DispatchReport {
    let mut report = DispatchReport::default();

    for target in targets {
        let Some(notifier) = target.notifier else {
            tracing::warn!(
                rule_id = %rule.id,
                notifier = %target.name,
                "Notifier not registered, skipping"
            );
            report.missing.push(target.name);
            continue;
        };

        match send_isolated(notifier, rule, context).await {
            Ok(Ok(true)) => report.delivered.push(target.name),
            Ok(Ok(false)) => {
                tracing::warn!(
                    rule_id = %rule.id,
                    notifier = %target.name,
                    "Notifier reported delivery failure"
                );
                report.failed.push(target.name);
            }
            Ok(Err(e)) => {
                tracing::error!(
                    rule_id = %rule.id,
                    notifier = %target.name,
                    error = %e,
                    "Failed to send notification"
                );
                report.failed.push(target.name);
            }
            Err(reason) => {
                tracing::error!(
                    rule_id = %rule.id,
                    notifier = %target.name,
                    error = %reason,
                    "Notifier panicked or was cancelled"
                );
                report.failed.push(target.name);
            }
        }
    }

    tracing::debug!(
        rule_id = %rule.id,
        delivered = report.delivered.len(),
        failed = report.failed.len(),
        missing = report.missing.len(),
        "Dispatch finished"
    );

    report
}

/// Runs one `send`, turning a panic (or a cancelled task) into `Err`.
async fn send_isolated(
    notifier: Arc<dyn Notifier>,
    rule: &AlertRule,
    context: &AlertContext,
) -> Result<anyhow::Result<bool>, String> {
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            let task_rule = rule.clone();
            let task_context = context.clone();
            handle
                .spawn(async move { notifier.send(&task_rule, &task_context).await })
                .await
                .map_err(|e| e.to_string())
        }
        Err(_) => CatchUnwind(notifier.send(rule, context))
            .await
            .map_err(|_| "notifier panicked".to_string()),
    }
}

/// Polls the wrapped future, reporting a panic as `Err` instead of unwinding.
struct CatchUnwind<F>(F);

impl<F: Future + Unpin> Future for CatchUnwind<F> {
    type Output = std::thread::Result<F::Output>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let inner = &mut self.0;
        match panic::catch_unwind(AssertUnwindSafe(|| Pin::new(inner).poll(cx))) {
            Ok(Poll::Ready(output)) => Poll::Ready(Ok(output)),
            Ok(Poll::Pending) => Poll::Pending,
            Err(payload) => Poll::Ready(Err(payload)),
        }
    }
}

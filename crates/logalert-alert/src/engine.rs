use crate::conditions::{self, EvalInput};
use crate::config::EngineConfig;
use crate::error::{AlertError, Result};
use crate::history::{MetricPoint, MetricsHistory};
use crate::metrics::{self, default_extractors, MetricExtractor};
use chrono::{DateTime, Utc};
use logalert_common::rule::AlertRule;
use logalert_common::types::{AlertContext, LogEntry, TriggeredAlert};
use logalert_notify::registry::{dispatch, DispatchTarget, NotifierRegistry};
use logalert_notify::Notifier;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing;

struct EngineState {
    rules: Vec<AlertRule>,
    registry: NotifierRegistry,
    history: MetricsHistory,
    extractors: Vec<MetricExtractor>,
}

/// A fired rule waiting for delivery once the lock is released.
struct PendingDispatch {
    rule: AlertRule,
    context: AlertContext,
    targets: Vec<DispatchTarget>,
}

/// Evaluates rules against ingested log batches and dispatches the ones
/// that fire.
///
/// Rules, notifiers and metric history live behind one lock, so an engine
/// can be shared through an `Arc` by several producers. Notifier I/O runs
/// after the lock is released.
///
/// # Examples
///
/// ```
/// use logalert_alert::engine::AlertEngine;
/// use logalert_common::rule::AlertRule;
/// use logalert_common::types::ConditionKind;
///
/// let engine = AlertEngine::new();
/// engine.add_rule(
///     AlertRule::new("Disk Full", ConditionKind::Pattern)
///         .with_parameter("pattern", "No space left on device"),
/// );
/// assert!(engine.get_rule("disk_full").is_some());
/// assert!(!engine.remove_rule("nonexistent"));
/// ```
pub struct AlertEngine {
    state: Mutex<EngineState>,
}

impl Default for AlertEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl AlertEngine {
    /// An engine with default history capacity and the built-in
    /// `response_time` extractor.
    pub fn new() -> Self {
        Self::with_history_capacity(crate::history::DEFAULT_CAPACITY)
    }

    pub fn with_history_capacity(capacity: usize) -> Self {
        let extractors = default_extractors()
            .iter()
            .filter_map(|c| match c.compile() {
                Ok(extractor) => Some(extractor),
                Err(e) => {
                    tracing::error!(metric = %c.metric, error = %e, "Built-in extractor rejected");
                    None
                }
            })
            .collect();
        Self::from_parts(
            MetricsHistory::with_capacity(capacity),
            extractors,
            NotifierRegistry::new(),
        )
    }

    /// Builds an engine from configuration, compiling extractors and
    /// registering the configured notifiers.
    ///
    /// # Errors
    ///
    /// Fails on an invalid extractor regex or an invalid notifier definition.
    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        let extractors = config
            .extractors
            .iter()
            .map(|c| c.compile())
            .collect::<Result<Vec<_>>>()?;

        let mut registry = NotifierRegistry::new();
        for notifier in &config.notifiers {
            registry.register(notifier.build()?);
            tracing::info!(
                notifier = notifier.name(),
                kind = notifier.kind(),
                "Registered notifier from config"
            );
        }

        Ok(Self::from_parts(
            MetricsHistory::with_capacity(config.history_capacity),
            extractors,
            registry,
        ))
    }

    fn from_parts(
        history: MetricsHistory,
        extractors: Vec<MetricExtractor>,
        registry: NotifierRegistry,
    ) -> Self {
        Self {
            state: Mutex::new(EngineState {
                rules: Vec::new(),
                registry,
                history,
                extractors,
            }),
        }
    }

    /// Lock for administrative access; a poisoned lock is recovered.
    fn lock(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(|poisoned| {
            tracing::error!("Engine state poisoned, recovering for administration");
            poisoned.into_inner()
        })
    }

    // ── Rules ──

    /// Inserts `rule`, or replaces the rule with the same id in place.
    pub fn add_rule(&self, mut rule: AlertRule) {
        rule.ensure_id();
        let mut state = self.lock();
        match state.rules.iter_mut().find(|r| r.id == rule.id) {
            Some(existing) => {
                tracing::debug!(rule_id = %rule.id, "Replacing rule");
                *existing = rule;
            }
            None => {
                tracing::debug!(rule_id = %rule.id, "Adding rule");
                state.rules.push(rule);
            }
        }
    }

    /// Remove a rule by ID. Returns true if found and removed.
    pub fn remove_rule(&self, id: &str) -> bool {
        let mut state = self.lock();
        let len_before = state.rules.len();
        state.rules.retain(|r| r.id != id);
        state.rules.len() < len_before
    }

    pub fn get_rule(&self, id: &str) -> Option<AlertRule> {
        self.lock().rules.iter().find(|r| r.id == id).cloned()
    }

    /// Snapshot of all rules in evaluation order.
    pub fn rules(&self) -> Vec<AlertRule> {
        self.lock().rules.clone()
    }

    /// Replace all rules with a new set. Metric history is kept. A later
    /// rule with an id already seen replaces the earlier one.
    pub fn replace_rules(&self, rules: Vec<AlertRule>) {
        let mut next: Vec<AlertRule> = Vec::with_capacity(rules.len());
        for mut rule in rules {
            rule.ensure_id();
            match next.iter_mut().find(|r| r.id == rule.id) {
                Some(existing) => *existing = rule,
                None => next.push(rule),
            }
        }
        self.lock().rules = next;
    }

    // ── Notifiers ──

    /// Registers `notifier`, replacing any notifier with the same name.
    pub fn add_notifier(&self, notifier: Arc<dyn Notifier>) {
        self.lock().registry.register(notifier);
    }

    pub fn remove_notifier(&self, name: &str) -> bool {
        self.lock().registry.remove(name)
    }

    /// Registered notifier names, sorted.
    pub fn notifier_names(&self) -> Vec<String> {
        self.lock().registry.names()
    }

    // ── Metrics ──

    pub fn metric_window(
        &self,
        metric: &str,
        now: DateTime<Utc>,
        duration_secs: u64,
    ) -> Vec<MetricPoint> {
        self.lock().history.window(metric, now, duration_secs)
    }

    // ── Ingestion ──

    /// Ingests `batch` at the current wall-clock time.
    ///
    /// # Errors
    ///
    /// Only [`AlertError::StatePoisoned`]; rule and notifier failures are
    /// logged and never returned.
    ///
    /// Works with or without a tokio runtime: notifiers are spawned on the
    /// current runtime when there is one and polled in place otherwise.
    pub async fn process_logs(&self, batch: &[LogEntry]) -> Result<Vec<TriggeredAlert>> {
        self.process_logs_at(batch, Utc::now()).await
    }

    /// Ingests `batch` as if evaluated at `now`.
    ///
    /// Records the batch metrics, evaluates every enabled rule outside its
    /// cooldown, commits the cooldown of each rule that fires and then
    /// dispatches the fired rules to their notifiers. The returned alerts
    /// keep rule order.
    pub async fn process_logs_at(
        &self,
        batch: &[LogEntry],
        now: DateTime<Utc>,
    ) -> Result<Vec<TriggeredAlert>> {
        if batch.is_empty() {
            return Ok(Vec::new());
        }

        let pending = self.evaluate_batch(batch, now)?;

        let mut alerts = Vec::with_capacity(pending.len());
        for fired in pending {
            let report = dispatch(&fired.rule, &fired.context, fired.targets).await;
            if !report.all_delivered() {
                tracing::warn!(
                    rule_id = %fired.rule.id,
                    delivered = ?report.delivered,
                    failed = ?report.failed,
                    missing = ?report.missing,
                    "Alert fired with incomplete delivery"
                );
            }
            alerts.push(TriggeredAlert {
                rule: fired.rule.name,
                severity: fired.rule.severity,
                time: now,
                context: fired.context,
            });
        }
        Ok(alerts)
    }

    /// Locked phase of ingestion. Nothing here awaits.
    fn evaluate_batch(
        &self,
        batch: &[LogEntry],
        now: DateTime<Utc>,
    ) -> Result<Vec<PendingDispatch>> {
        let mut guard = self.state.lock().map_err(|_| {
            tracing::error!("Engine state poisoned, refusing to process batch");
            AlertError::StatePoisoned
        })?;
        let state = &mut *guard;

        metrics::record_batch(&mut state.history, batch, &state.extractors);

        let input = EvalInput {
            batch,
            history: &state.history,
            now,
        };

        let mut pending = Vec::new();
        for rule in state.rules.iter_mut() {
            if !rule.enabled {
                continue;
            }
            if rule.is_in_cooldown(now) {
                tracing::debug!(
                    rule_id = %rule.id,
                    remaining_secs = rule.cooldown_remaining(now).map_or(0, |d| d.num_seconds()),
                    "Rule suppressed (cooldown)"
                );
                continue;
            }

            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                conditions::evaluate(rule.condition, &rule.parameters, input)
            }));

            let evaluation = match outcome {
                Ok(Ok(evaluation)) => evaluation,
                Ok(Err(e @ AlertError::InvalidPattern { .. })) => {
                    tracing::error!(rule_id = %rule.id, error = %e, "Rule has an invalid pattern");
                    continue;
                }
                Ok(Err(e)) => {
                    tracing::warn!(
                        rule_id = %rule.id,
                        condition = %rule.condition,
                        error = %e,
                        "Rule misconfigured, skipping"
                    );
                    continue;
                }
                Err(_) => {
                    tracing::error!(rule_id = %rule.id, "Rule evaluation panicked, skipping");
                    continue;
                }
            };

            if !evaluation.triggered {
                continue;
            }

            rule.mark_triggered(now);
            tracing::info!(
                rule_id = %rule.id,
                rule_name = %rule.name,
                severity = %rule.severity,
                "Alert rule fired"
            );

            pending.push(PendingDispatch {
                targets: state.registry.resolve(&rule.notifiers),
                rule: rule.clone(),
                context: evaluation.context,
            });
        }

        Ok(pending)
    }
}

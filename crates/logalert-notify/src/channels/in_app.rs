use crate::channels::fired_at;
use crate::Notifier;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use logalert_common::rule::AlertRule;
use logalert_common::types::{AlertContext, Severity};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

pub const DEFAULT_INBOX_CAPACITY: usize = 100;

/// An alert as stored in an [`InAppNotifier`] inbox.
#[derive(Debug, Clone, Serialize)]
pub struct InAppNotification {
    pub rule_id: String,
    pub rule_name: String,
    pub description: String,
    pub severity: Severity,
    pub triggered_at: DateTime<Utc>,
    pub context: AlertContext,
}

/// Keeps the most recent alerts in memory for the host application to
/// display (e.g. a dashboard badge). Oldest entries are dropped first.
pub struct InAppNotifier {
    name: String,
    capacity: usize,
    inbox: Mutex<VecDeque<InAppNotification>>,
}

impl InAppNotifier {
    pub fn new(name: &str, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            name: name.to_string(),
            capacity,
            inbox: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    /// Inbox contents, oldest first.
    pub fn notifications(&self) -> Vec<InAppNotification> {
        self.inbox().iter().cloned().collect()
    }

    /// Empties the inbox and returns what it held, oldest first.
    pub fn drain(&self) -> Vec<InAppNotification> {
        self.inbox().drain(..).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.inbox().is_empty()
    }

    // Every mutation is a single push/pop, so a poisoned inbox is still consistent.
    fn inbox(&self) -> MutexGuard<'_, VecDeque<InAppNotification>> {
        self.inbox.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl Notifier for InAppNotifier {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send(&self, rule: &AlertRule, context: &AlertContext) -> Result<bool> {
        let notification = InAppNotification {
            rule_id: rule.id.clone(),
            rule_name: rule.name.clone(),
            description: rule.description.clone(),
            severity: rule.severity,
            triggered_at: fired_at(rule),
            context: context.clone(),
        };

        let mut inbox = self.inbox();
        if inbox.len() >= self.capacity {
            inbox.pop_front();
        }
        inbox.push_back(notification);
        Ok(true)
    }
}

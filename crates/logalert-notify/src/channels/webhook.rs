use crate::channels::fired_at;
use crate::error::NotifyError;
use crate::utils::{truncate_string, MAX_BODY_LENGTH};
use crate::Notifier;
use anyhow::Result;
use async_trait::async_trait;
use logalert_common::rule::AlertRule;
use logalert_common::types::AlertContext;
use std::time::Duration;
use tracing;

pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// POSTs each alert as JSON to a fixed URL.
///
/// Without a body template the payload is
/// `{rule_id, rule_name, description, severity, condition, time, context}`.
/// A template may use the same keys as `{{placeholders}}`; `{{context}}`
/// expands to compact JSON.
pub struct WebhookNotifier {
    name: String,
    url: String,
    client: reqwest::Client,
    body_template: Option<String>,
}

impl WebhookNotifier {
    pub fn new(
        name: &str,
        url: &str,
        body_template: Option<String>,
        timeout: Duration,
    ) -> crate::error::Result<Self> {
        let parsed = reqwest::Url::parse(url)
            .map_err(|e| NotifyError::InvalidConfig(format!("invalid webhook url '{url}': {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(NotifyError::InvalidConfig(format!(
                "webhook url must be http(s): {url}"
            )));
        }
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            name: name.to_string(),
            url: url.to_string(),
            client,
            body_template,
        })
    }

    pub(crate) fn render_body(&self, rule: &AlertRule, context: &AlertContext) -> String {
        let time = fired_at(rule).to_rfc3339();
        if let Some(template) = &self.body_template {
            let context_json = serde_json::Value::Object(context.clone()).to_string();
            template
                .replace("{{rule_id}}", &rule.id)
                .replace("{{rule_name}}", &rule.name)
                .replace("{{description}}", &rule.description)
                .replace("{{severity}}", &rule.severity.to_string())
                .replace("{{condition}}", &rule.condition.to_string())
                .replace("{{time}}", &time)
                .replace("{{context}}", &context_json)
        } else {
            serde_json::json!({
                "rule_id": rule.id,
                "rule_name": rule.name,
                "description": rule.description,
                "severity": rule.severity.to_string(),
                "condition": rule.condition.to_string(),
                "time": time,
                "context": context,
            })
            .to_string()
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send(&self, rule: &AlertRule, context: &AlertContext) -> Result<bool> {
        let body = self.render_body(rule, context);

        let resp = self
            .client
            .post(self.url.as_str())
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await
            .map_err(NotifyError::from)?;

        let status = resp.status();
        if status.is_success() {
            tracing::debug!(notifier = %self.name, status = %status, "Webhook delivered");
            return Ok(true);
        }

        let resp_body = match resp.text().await {
            Ok(text) => truncate_string(&text, MAX_BODY_LENGTH),
            Err(e) => format!("[Failed to read response body: {e}]"),
        };
        Err(NotifyError::Api {
            service: self.name.clone(),
            status: status.as_u16(),
            body: resp_body,
        }
        .into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use logalert_common::types::{ConditionKind, Severity};

    fn rule() -> AlertRule {
        let mut rule = AlertRule::new("Error Burst", ConditionKind::Frequency)
            .with_description("too many errors")
            .with_severity(Severity::Critical);
        rule.mark_triggered(chrono::Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        rule
    }

    #[test]
    fn default_body_is_json() {
        let hook = WebhookNotifier::new(
            "ops",
            "http://127.0.0.1:9/alerts",
            None,
            Duration::from_secs(1),
        )
        .unwrap();
        let mut ctx = AlertContext::new();
        ctx.insert("frequency".into(), 12.into());

        let rendered = hook.render_body(&rule(), &ctx);
        let body: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(body["rule_id"], "error_burst");
        assert_eq!(body["severity"], "critical");
        assert_eq!(body["condition"], "frequency");
        assert_eq!(body["time"], "2024-01-01T00:00:00+00:00");
        assert_eq!(body["context"]["frequency"], 12);
    }

    #[test]
    fn template_placeholders_are_expanded() {
        let hook = WebhookNotifier::new(
            "chat",
            "https://chat.example.com/hook",
            Some(r#"{"text":"[{{severity}}] {{rule_name}}: {{description}}"}"#.into()),
            Duration::from_secs(1),
        )
        .unwrap();
        let body = hook.render_body(&rule(), &AlertContext::new());
        assert_eq!(body, r#"{"text":"[critical] Error Burst: too many errors"}"#);
    }

    #[test]
    fn rejects_non_http_urls() {
        let err = WebhookNotifier::new("x", "ftp://example.com", None, Duration::from_secs(1))
            .err()
            .expect("ftp url should be rejected");
        assert!(err.to_string().contains("http(s)"), "error was: {err}");
        assert!(WebhookNotifier::new("x", "not a url", None, Duration::from_secs(1)).is_err());
    }
}

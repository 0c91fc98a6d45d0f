use crate::channels::fired_at;
use crate::error::NotifyError;
use crate::Notifier;
use anyhow::Result;
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use logalert_common::rule::AlertRule;
use logalert_common::types::AlertContext;
use std::time::Duration;
use tracing;

/// Sends a plain-text mail per alert to a fixed recipient list.
///
/// The transport speaks plain SMTP to a relay (typically a local MTA);
/// TLS termination is left to that relay.
pub struct EmailNotifier {
    name: String,
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    recipients: Vec<Mailbox>,
}

/// SMTP connection settings for [`EmailNotifier::new`].
pub struct SmtpSettings<'a> {
    pub host: &'a str,
    pub port: u16,
    pub username: Option<&'a str>,
    pub password: Option<&'a str>,
    pub timeout: Duration,
}

impl EmailNotifier {
    pub fn new(
        name: &str,
        smtp: SmtpSettings<'_>,
        from: &str,
        recipients: &[String],
    ) -> crate::error::Result<Self> {
        if smtp.host.trim().is_empty() {
            return Err(NotifyError::InvalidConfig("missing smtp_host".into()));
        }
        if recipients.is_empty() {
            return Err(NotifyError::InvalidConfig(format!(
                "email notifier '{name}' has no recipients"
            )));
        }

        let from: Mailbox = from.parse().map_err(|e| {
            NotifyError::InvalidConfig(format!("invalid from address '{from}': {e}"))
        })?;
        let recipients = recipients
            .iter()
            .map(|r| {
                r.parse::<Mailbox>().map_err(|e| {
                    NotifyError::InvalidConfig(format!("invalid recipient '{r}': {e}"))
                })
            })
            .collect::<crate::error::Result<Vec<_>>>()?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(smtp.host)
            .port(smtp.port)
            .timeout(Some(smtp.timeout));
        if let (Some(user), Some(pass)) = (smtp.username, smtp.password) {
            builder = builder.credentials(Credentials::new(user.to_string(), pass.to_string()));
        }

        Ok(Self {
            name: name.to_string(),
            transport: builder.build(),
            from,
            recipients,
        })
    }

    pub(crate) fn format_subject(rule: &AlertRule) -> String {
        format!("[logalert][{}] {}", rule.severity, rule.name)
    }

    pub(crate) fn format_body(rule: &AlertRule, context: &AlertContext) -> String {
        let description_line = if rule.description.is_empty() {
            String::new()
        } else {
            format!("\nDescription: {}", rule.description)
        };
        let context_block = serde_json::to_string_pretty(context).unwrap_or_default();
        format!(
            concat!(
                "Alert: {severity}\nRule: {name} ({id}){description_line}\n",
                "Condition: {condition}\nTime: {time}\nContext:\n{context_block}",
            ),
            severity = rule.severity,
            name = rule.name,
            id = rule.id,
            description_line = description_line,
            condition = rule.condition,
            time = fired_at(rule).to_rfc3339(),
            context_block = context_block,
        )
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send(&self, rule: &AlertRule, context: &AlertContext) -> Result<bool> {
        let mut builder = Message::builder()
            .from(self.from.clone())
            .subject(Self::format_subject(rule))
            .header(ContentType::TEXT_PLAIN);
        for recipient in &self.recipients {
            builder = builder.to(recipient.clone());
        }
        let email = builder
            .body(Self::format_body(rule, context))
            .map_err(|e| NotifyError::Other(format!("failed to build email: {e}")))?;

        let response = self
            .transport
            .send(email)
            .await
            .map_err(|e| NotifyError::Smtp(e.to_string()))?;

        let delivered = response.is_positive();
        if !delivered {
            tracing::warn!(
                notifier = %self.name,
                code = %response.code(),
                "SMTP server rejected alert email"
            );
        }
        Ok(delivered)
    }
}

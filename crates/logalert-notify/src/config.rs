use crate::channels::email::{EmailNotifier, SmtpSettings};
use crate::channels::in_app::{InAppNotifier, DEFAULT_INBOX_CAPACITY};
use crate::channels::webhook::{WebhookNotifier, DEFAULT_TIMEOUT_SECS};
use crate::error::{NotifyError, Result};
use crate::Notifier;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Declarative notifier definition, tagged by `type`.
///
/// # Examples
///
/// ```
/// use logalert_notify::config::NotifierConfig;
///
/// let cfg: NotifierConfig = serde_json::from_value(serde_json::json!({
///     "type": "webhook",
///     "name": "ops",
///     "url": "https://hooks.example.com/alerts"
/// }))
/// .unwrap();
/// assert_eq!(cfg.name(), "ops");
/// assert_eq!(cfg.kind(), "webhook");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotifierConfig {
    Webhook(WebhookConfig),
    Email(EmailConfig),
    InApp(InAppConfig),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub body_template: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    pub name: String,
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    #[serde(default)]
    pub smtp_username: Option<String>,
    #[serde(default)]
    pub smtp_password: Option<String>,
    pub from: String,
    pub recipients: Vec<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InAppConfig {
    pub name: String,
    #[serde(default = "default_inbox_capacity")]
    pub capacity: usize,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_smtp_port() -> u16 {
    25
}

fn default_inbox_capacity() -> usize {
    DEFAULT_INBOX_CAPACITY
}

impl NotifierConfig {
    pub fn name(&self) -> &str {
        match self {
            NotifierConfig::Webhook(c) => &c.name,
            NotifierConfig::Email(c) => &c.name,
            NotifierConfig::InApp(c) => &c.name,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            NotifierConfig::Webhook(_) => "webhook",
            NotifierConfig::Email(_) => "email",
            NotifierConfig::InApp(_) => "in_app",
        }
    }

    /// Checks the definition and instantiates the notifier.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::InvalidConfig`] for an empty name, a bad URL
    /// or address, a zero timeout, or an empty recipient list.
    pub fn build(&self) -> Result<Arc<dyn Notifier>> {
        if self.name().trim().is_empty() {
            return Err(NotifyError::InvalidConfig(format!(
                "{} notifier has an empty name",
                self.kind()
            )));
        }

        match self {
            NotifierConfig::Webhook(c) => {
                let timeout = timeout(c.timeout_secs)?;
                let notifier =
                    WebhookNotifier::new(&c.name, &c.url, c.body_template.clone(), timeout)?;
                Ok(Arc::new(notifier))
            }
            NotifierConfig::Email(c) => {
                let settings = SmtpSettings {
                    host: &c.smtp_host,
                    port: c.smtp_port,
                    username: c.smtp_username.as_deref(),
                    password: c.smtp_password.as_deref(),
                    timeout: timeout(c.timeout_secs)?,
                };
                let notifier = EmailNotifier::new(&c.name, settings, &c.from, &c.recipients)?;
                Ok(Arc::new(notifier))
            }
            NotifierConfig::InApp(c) => Ok(Arc::new(InAppNotifier::new(&c.name, c.capacity))),
        }
    }

    /// Copy of the definition safe to log or return from an admin API.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if let NotifierConfig::Email(c) = &mut copy {
            if c.smtp_password.is_some() {
                c.smtp_password = Some("***".to_string());
            }
        }
        copy
    }
}

fn timeout(secs: u64) -> Result<Duration> {
    if secs == 0 {
        return Err(NotifyError::InvalidConfig(
            "timeout_secs must be greater than 0".into(),
        ));
    }
    Ok(Duration::from_secs(secs))
}

use crate::history::DEFAULT_CAPACITY;
use crate::metrics::{default_extractors, ExtractorConfig};
use logalert_notify::config::NotifierConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Engine settings loaded from TOML. Rules are managed at runtime and are
/// not part of this file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Points kept per metric series.
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
    #[serde(default = "default_extractors")]
    pub extractors: Vec<ExtractorConfig>,
    #[serde(default)]
    pub notifiers: Vec<NotifierConfig>,
}

fn default_history_capacity() -> usize {
    DEFAULT_CAPACITY
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            history_capacity: DEFAULT_CAPACITY,
            extractors: default_extractors(),
            notifiers: Vec::new(),
        }
    }
}

impl EngineConfig {
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::RESPONSE_TIME;
    use std::io::Write;

    #[test]
    fn empty_file_uses_defaults() {
        let config = EngineConfig::from_toml("").unwrap();
        assert_eq!(config.history_capacity, 1000);
        assert_eq!(config.extractors.len(), 1);
        assert_eq!(config.extractors[0].metric, RESPONSE_TIME);
        assert!(config.notifiers.is_empty());
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
history_capacity = 50

[[extractors]]
metric = "queue_depth"
pattern = 'queue depth (\d+)'

[[notifiers]]
type = "webhook"
name = "ops"
url = "https://hooks.example.com/alerts"
timeout_secs = 3

[[notifiers]]
type = "in_app"
name = "inbox"
"#
        )
        .unwrap();

        let config = EngineConfig::load(file.path()).unwrap();
        assert_eq!(config.history_capacity, 50);
        assert_eq!(config.extractors[0].metric, "queue_depth");
        let names: Vec<&str> = config.notifiers.iter().map(|n| n.name()).collect();
        assert_eq!(names, vec!["ops", "inbox"]);
    }

    #[test]
    fn rejects_unknown_notifier_type() {
        let err = EngineConfig::from_toml("[[notifiers]]\ntype = \"pager\"\nname = \"p\"\n");
        assert!(err.is_err());
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(EngineConfig::load("/nonexistent/logalert.toml").is_err());
    }
}

//! Engine configuration

use serde::{Deserialize, Serialize};

/// Behaviour switches for [`crate::WorkflowEngine`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Skip approval steps the submitter could approve themselves
    #[serde(default = "default_true")]
    pub auto_skip_self_approval: bool,

    /// Also apply conditional rules when resolving the first step on
    /// submit and resubmit. Rules always apply on advancement.
    #[serde(default)]
    pub apply_rules_on_submit: bool,

    /// Attempts per operation when the store reports a version conflict
    #[serde(default = "default_max_commit_attempts")]
    pub max_commit_attempts: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            auto_skip_self_approval: default_true(),
            apply_rules_on_submit: false,
            max_commit_attempts: default_max_commit_attempts(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_max_commit_attempts() -> u32 {
    3
}

impl EngineConfig {
    /// Load configuration: defaults, then an optional file, then
    /// `APPROVAL_*` environment variables (e.g. `APPROVAL_MAX_COMMIT_ATTEMPTS=5`).
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        builder = builder.add_source(config::Config::try_from(&EngineConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        // Field names contain underscores, so nesting uses a double underscore
        builder = builder.add_source(
            config::Environment::with_prefix("APPROVAL")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }

    /// Configuration with self-approval skipping turned off
    pub fn without_auto_skip() -> Self {
        Self {
            auto_skip_self_approval: false,
            ..Default::default()
        }
    }

    /// Attempts actually made; zero is treated as one
    pub(crate) fn attempts(&self) -> u32 {
        self.max_commit_attempts.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert!(config.auto_skip_self_approval);
        assert!(!config.apply_rules_on_submit);
        assert_eq!(config.max_commit_attempts, 3);
    }

    #[test]
    fn test_partial_document_uses_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"apply_rules_on_submit": true}"#).unwrap();
        assert!(config.auto_skip_self_approval);
        assert!(config.apply_rules_on_submit);
        assert_eq!(config.max_commit_attempts, 3);
    }

    #[test]
    fn test_load_without_file() {
        let config = EngineConfig::load(Some("/nonexistent/approval-engine")).unwrap();
        assert_eq!(config.max_commit_attempts, 3);
    }

    #[test]
    fn test_zero_attempts_still_tries_once() {
        let config = EngineConfig {
            max_commit_attempts: 0,
            ..Default::default()
        };
        assert_eq!(config.attempts(), 1);
    }
}

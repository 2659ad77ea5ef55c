//! Workflow settings read from `apgate.yaml`

use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorkflowConfig {
    pub poll: PollSettings,
    /// Quiet period before typed input reaches the cascade resolver
    pub debounce_ms: u64,
    pub api: ApiSettings,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            poll: PollSettings::default(),
            debounce_ms: 500,
            api: ApiSettings::default(),
        }
    }
}

/// Provisioning poll timing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PollSettings {
    pub interval_ms: u64,
    /// Base timeout for access point creation, multiplied by the unit count
    pub access_point_timeout_ms: u64,
    /// Base timeout per expected agent replica
    pub agent_timeout_ms: u64,
    /// 1.0 keeps the interval fixed
    pub backoff_multiplier: f64,
    pub max_interval_ms: u64,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval_ms: 5_000,
            access_point_timeout_ms: 600_000,
            agent_timeout_ms: 120_000,
            backoff_multiplier: 1.0,
            max_interval_ms: 30_000,
        }
    }
}

/// Platform API connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ApiSettings {
    pub base_url: String,
    pub account_id: String,
    /// Environment variable holding the bearer token
    pub token_env: String,
    /// Per-request bound, connect to last body byte
    pub request_timeout_ms: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/api".to_string(),
            account_id: String::new(),
            token_env: "APGATE_API_TOKEN".to_string(),
            request_timeout_ms: 30_000,
        }
    }
}

impl ApiSettings {
    pub fn token(&self) -> Option<String> {
        std::env::var(&self.token_env).ok().filter(|t| !t.is_empty())
    }
}

impl WorkflowConfig {
    pub fn from_yaml_str(content: &str, origin: &str) -> Result<Self> {
        let config: WorkflowConfig =
            serde_yaml::from_str(content).map_err(|e| ConfigError::Invalid {
                path: origin.to_string(),
                message: e.to_string(),
            })?;
        config.validate(origin)?;
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_yaml_str(&content, &path.display().to_string())?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    fn validate(&self, origin: &str) -> Result<()> {
        let invalid = |message: &str| ConfigError::Invalid {
            path: origin.to_string(),
            message: message.to_string(),
        };
        if self.poll.interval_ms == 0 {
            return Err(invalid("poll.interval_ms must be greater than 0"));
        }
        if self.poll.backoff_multiplier < 1.0 {
            return Err(invalid("poll.backoff_multiplier must be at least 1.0"));
        }
        if self.poll.max_interval_ms < self.poll.interval_ms {
            return Err(invalid("poll.max_interval_ms must not be below poll.interval_ms"));
        }
        if self.api.request_timeout_ms == 0 {
            return Err(invalid("api.request_timeout_ms must be greater than 0"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = WorkflowConfig::from_yaml_str(
            "poll:\n  interval_ms: 1000\napi:\n  account_id: acct\n",
            "inline",
        )
        .unwrap();
        assert_eq!(config.poll.interval_ms, 1000);
        assert_eq!(config.poll.agent_timeout_ms, 120_000);
        assert_eq!(config.api.account_id, "acct");
        assert_eq!(config.debounce_ms, 500);
        assert_eq!(config.api.request_timeout_ms, 30_000);
    }

    #[test]
    fn test_zero_request_timeout_rejected() {
        let result =
            WorkflowConfig::from_yaml_str("api:\n  request_timeout_ms: 0\n", "inline");
        match result {
            Err(ConfigError::Invalid { message, .. }) => {
                assert!(message.contains("request_timeout_ms"))
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_key_rejected() {
        let result = WorkflowConfig::from_yaml_str("poll:\n  intervall_ms: 10\n", "inline");
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_backoff_below_one_rejected() {
        let result =
            WorkflowConfig::from_yaml_str("poll:\n  backoff_multiplier: 0.5\n", "inline");
        match result {
            Err(ConfigError::Invalid { message, .. }) => {
                assert!(message.contains("backoff_multiplier"))
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_token_from_env() {
        let api = ApiSettings {
            token_env: "APGATE_TEST_TOKEN".to_string(),
            ..Default::default()
        };
        temp_env::with_var("APGATE_TEST_TOKEN", Some("t0k"), || {
            assert_eq!(api.token().as_deref(), Some("t0k"));
        });
        temp_env::with_var("APGATE_TEST_TOKEN", None::<&str>, || {
            assert!(api.token().is_none());
        });
    }
}

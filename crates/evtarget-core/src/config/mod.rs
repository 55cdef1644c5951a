//! Configuration system for evtarget.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::{EventError, EventResult};

/// Environment variable selecting the [`FailurePolicy`].
pub const ENV_FAILURE_POLICY: &str = "EVTARGET_FAILURE_POLICY";

/// Environment variable overriding [`TargetConfig::max_listeners`].
pub const ENV_MAX_LISTENERS: &str = "EVTARGET_MAX_LISTENERS";

/// Default per-type listener count above which a leak warning is logged.
pub const DEFAULT_MAX_LISTENERS: usize = 10;

/// How dispatch reacts to a failing listener.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum FailurePolicy {
    /// The first failure aborts the fan-out and is returned to the caller.
    #[default]
    FailFast,
    /// Every listener runs; failures are collected and returned together.
    Isolate,
}

/// Configuration shared by every event target created from one cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    /// Failure handling during dispatch.
    pub failure_policy: FailurePolicy,
    /// Per-type listener count that triggers a warning. `0` disables it.
    pub max_listeners: usize,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            failure_policy: FailurePolicy::FailFast,
            max_listeners: DEFAULT_MAX_LISTENERS,
        }
    }
}

impl TargetConfig {
    /// Load configuration from a file (TOML, JSON, or YAML).
    pub fn from_file(path: impl AsRef<std::path::Path>) -> EventResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let ext = path.as_ref().extension().and_then(|e| e.to_str());

        match ext {
            Some("toml") => {
                toml::from_str(&content).map_err(|e| EventError::configuration(e.to_string()))
            }
            Some("json") => {
                serde_json::from_str(&content).map_err(|e| EventError::configuration(e.to_string()))
            }
            Some("yaml" | "yml") => {
                serde_yaml::from_str(&content).map_err(|e| EventError::configuration(e.to_string()))
            }
            _ => Err(EventError::configuration(
                "Unsupported config file format. Use .toml, .json, or .yaml",
            )),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Unparseable values are ignored with a warning and the default is kept.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(policy) = lookup(ENV_FAILURE_POLICY) {
            match policy.trim().parse::<FailurePolicy>() {
                Ok(policy) => config.failure_policy = policy,
                Err(_) => tracing::warn!(
                    value = %policy,
                    "Ignoring invalid {}", ENV_FAILURE_POLICY
                ),
            }
        }

        if let Some(max) = lookup(ENV_MAX_LISTENERS) {
            match max.trim().parse::<usize>() {
                Ok(max) => config.max_listeners = max,
                Err(_) => tracing::warn!(
                    value = %max,
                    "Ignoring invalid {}", ENV_MAX_LISTENERS
                ),
            }
        }

        config
    }

    /// Build configuration using builder pattern.
    pub fn builder() -> TargetConfigBuilder {
        TargetConfigBuilder::default()
    }
}

/// Builder for TargetConfig.
#[derive(Default)]
pub struct TargetConfigBuilder {
    config: TargetConfig,
}

impl TargetConfigBuilder {
    /// Set the failure policy.
    pub fn failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.config.failure_policy = policy;
        self
    }

    /// Set the per-type listener warning threshold.
    pub fn max_listeners(mut self, max: usize) -> Self {
        self.config.max_listeners = max;
        self
    }

    /// Build the configuration.
    pub fn build(self) -> TargetConfig {
        self.config
    }
}

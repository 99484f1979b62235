use anyhow::{Context, Result};
use declarative::{BoxedExecutor, Configs, PollConfig, PollingExecutor, TerminationCheck};
use schemakit::Schema;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// Settings
// ============================================================================

/// Provider settings shared by every resource
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Values handed to executors whose configs schema declares them
    #[serde(default)]
    pub configs: Configs,
    #[serde(default)]
    pub timeouts: Timeouts,
    #[serde(default)]
    pub polling: Polling,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timeouts {
    /// Limit for a single executor call; no limit when unset
    #[serde(default)]
    pub operation_secs: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Polling {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

fn default_max_retries() -> u32 {
    PollConfig::default().max_retries
}

fn default_interval_secs() -> u64 {
    PollConfig::default().interval.as_secs()
}

impl Default for Polling {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            interval_secs: default_interval_secs(),
        }
    }
}

impl Settings {
    /// Load settings from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Invalid settings in {}", path.display()))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Invalid settings format")
    }

    /// Configs for an executor: the configured value of each declared
    /// property, else its schema default
    pub fn configs_for(&self, schema: &Schema) -> Configs {
        let mut configs = Configs::new();
        for (name, property) in &schema.properties {
            if let Some(value) = self.configs.get(name) {
                configs.insert(name.clone(), value.clone());
            } else if let Some(default) = &property.default {
                configs.insert(name.clone(), default.clone());
            }
        }
        configs
    }

    pub fn operation_timeout(&self) -> Option<Duration> {
        self.timeouts.operation_secs.map(Duration::from_secs)
    }

    /// Polling defaults; zero values fall back to the built-in ones
    pub fn poll_config(&self) -> PollConfig {
        PollConfig::new(
            self.polling.max_retries,
            Duration::from_secs(self.polling.interval_secs),
        )
    }

    /// Wrap `inner` so each call is repeated until `check` accepts the result
    pub fn polling_executor(&self, inner: BoxedExecutor, check: TerminationCheck) -> BoxedExecutor {
        Arc::new(PollingExecutor::new(inner, self.poll_config(), check))
    }
}

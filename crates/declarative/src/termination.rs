//! Polling until a call reaches its terminal state
//!
//! Long-running service operations return immediately with an in-progress
//! status. [`PollingExecutor`] repeats the call at a fixed interval until a
//! check function accepts the result, or gives up after a bounded number of
//! attempts.

use crate::error::Error;
use crate::executor::{BoxedExecutor, Executor, Links, TerminatorExecutor};
use crate::types::{Configs, ExecutionResult, Parameters, ResultSource};
use async_trait::async_trait;
use schemakit::Schema;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Decides whether a result is terminal
pub type TerminationCheck = Arc<dyn Fn(&ExecutionResult) -> anyhow::Result<bool> + Send + Sync>;

/// Retry bounds for polling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    /// Maximum number of calls
    pub max_retries: u32,
    /// Fixed delay between calls
    pub interval: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            max_retries: 30,
            interval: Duration::from_secs(5),
        }
    }
}

impl PollConfig {
    /// Create a config, falling back to the defaults for zero values
    pub fn new(max_retries: u32, interval: Duration) -> Self {
        let defaults = Self::default();
        Self {
            max_retries: if max_retries == 0 {
                defaults.max_retries
            } else {
                max_retries
            },
            interval: if interval.is_zero() {
                defaults.interval
            } else {
                interval
            },
        }
    }
}

/// Executor wrapper that polls until `check` accepts the result
pub struct PollingExecutor {
    inner: BoxedExecutor,
    config: PollConfig,
    check: TerminationCheck,
}

impl PollingExecutor {
    pub fn new(inner: BoxedExecutor, config: PollConfig, check: TerminationCheck) -> Self {
        Self {
            inner,
            config,
            check,
        }
    }

    pub fn config(&self) -> PollConfig {
        self.config
    }
}

impl fmt::Debug for PollingExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PollingExecutor")
            .field("inner", &self.inner)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Executor for PollingExecutor {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn parameters_schema(&self) -> &Schema {
        self.inner.parameters_schema()
    }

    fn configs_schema(&self) -> &Schema {
        self.inner.configs_schema()
    }

    fn result_schema(&self) -> &Schema {
        self.inner.result_schema()
    }

    fn links(&self) -> Links {
        self.inner.links()
    }

    async fn execute(&self, parameters: &Parameters, configs: &Configs) -> anyhow::Result<Value> {
        self.inner.execute(parameters, configs).await
    }

    fn as_terminator(&self) -> Option<&dyn TerminatorExecutor> {
        Some(self)
    }
}

#[async_trait]
impl TerminatorExecutor for PollingExecutor {
    async fn execute_until_termination(
        &self,
        parameters: &Parameters,
        configs: &Configs,
    ) -> anyhow::Result<Value> {
        let max = self.config.max_retries;
        for attempt in 1..=max {
            let value = self.inner.execute(parameters, configs).await?;
            let result = ExecutionResult::new(
                ResultSource {
                    executor: self.inner.name().to_string(),
                    parameters: parameters.clone(),
                    configs: configs.clone(),
                },
                value,
            );
            if (self.check)(&result)? {
                log::debug!("{} terminated after {attempt}/{max} attempt(s)", self.name());
                return Ok(result.value);
            }

            if attempt < max {
                log::debug!(
                    "{} not terminated (attempt {attempt}/{max}), retrying in {}s",
                    self.name(),
                    self.config.interval.as_secs()
                );
                tokio::time::sleep(self.config.interval).await;
            }
        }

        Err(Error::TerminationNotReached {
            executor: self.name().to_string(),
            attempts: max,
        }
        .into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RunContext;
    use crate::executor::run_executor;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Reports "pending" until the configured call number
    #[derive(Debug)]
    struct CountingExecutor {
        schema: Schema,
        calls: AtomicU32,
        ready_at: u32,
    }

    impl CountingExecutor {
        fn new(ready_at: u32) -> Self {
            Self {
                schema: Schema::empty_object(),
                calls: AtomicU32::new(0),
                ready_at,
            }
        }
    }

    #[async_trait]
    impl Executor for CountingExecutor {
        fn name(&self) -> &str {
            "get_instance"
        }
        fn parameters_schema(&self) -> &Schema {
            &self.schema
        }
        fn configs_schema(&self) -> &Schema {
            &self.schema
        }
        fn result_schema(&self) -> &Schema {
            &self.schema
        }
        async fn execute(&self, _parameters: &Parameters, _configs: &Configs) -> anyhow::Result<Value> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            let status = if call >= self.ready_at { "running" } else { "pending" };
            Ok(json!({"status": status}))
        }
    }

    fn status_is_running() -> TerminationCheck {
        Arc::new(|result: &ExecutionResult| Ok(result.value["status"] == "running"))
    }

    fn fast(max_retries: u32) -> PollConfig {
        PollConfig::new(max_retries, Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_polls_until_terminated() {
        let inner = Arc::new(CountingExecutor::new(3));
        let exec = PollingExecutor::new(inner.clone(), fast(5), status_is_running());

        let value = exec
            .execute_until_termination(&Parameters::new(), &Configs::new())
            .await
            .unwrap();
        assert_eq!(value["status"], "running");
        assert_eq!(inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let inner = Arc::new(CountingExecutor::new(100));
        let exec = PollingExecutor::new(inner.clone(), fast(2), status_is_running());

        let err = exec
            .execute_until_termination(&Parameters::new(), &Configs::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("did not terminate after 2 attempts"));
        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_run_executor_uses_polling_variant() {
        let inner = Arc::new(CountingExecutor::new(2));
        let exec = PollingExecutor::new(inner.clone(), fast(5), status_is_running());
        let ctx = RunContext::new("test_vm");

        let result = run_executor(&ctx, "read", &exec, Parameters::new(), Configs::new())
            .await
            .unwrap();
        assert_eq!(result.value["status"], "running");
        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_poll_config_zero_falls_back() {
        let config = PollConfig::new(0, Duration::ZERO);
        assert_eq!(config, PollConfig::default());
    }
}

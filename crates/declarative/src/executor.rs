//! Executor contracts - the service calls operations are built on

use crate::context::RunContext;
use crate::error::{Error, Result};
use crate::types::{Configs, ExecutionResult, Parameters, ResultSource};
use async_trait::async_trait;
use schemakit::Schema;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Secondary operations declared against an executor's result, keyed by name
pub type Links = BTreeMap<String, Arc<dyn Linker>>;

/// Shared executor handle
pub type BoxedExecutor = Arc<dyn Executor>;

/// One schema-described service call
///
/// Every operation of a REST resource (create, read, update, delete, list)
/// is exposed through this trait:
/// - Schemas for its parameters, configs and result
/// - Links to secondary operations bound to its result
/// - The call itself
#[async_trait]
pub trait Executor: Send + Sync + fmt::Debug {
    /// Name used in logs and diagnostics
    fn name(&self) -> &str;

    fn parameters_schema(&self) -> &Schema;

    fn configs_schema(&self) -> &Schema;

    fn result_schema(&self) -> &Schema;

    /// Secondary operations that can be created from this executor's result
    fn links(&self) -> Links {
        Links::new()
    }

    /// Perform the call
    async fn execute(&self, parameters: &Parameters, configs: &Configs) -> anyhow::Result<Value>;

    /// Polling variant of this executor, if it has one
    fn as_terminator(&self) -> Option<&dyn TerminatorExecutor> {
        None
    }
}

/// Executor that can wait until the remote side reaches a terminal state
#[async_trait]
pub trait TerminatorExecutor: Executor {
    async fn execute_until_termination(
        &self,
        parameters: &Parameters,
        configs: &Configs,
    ) -> anyhow::Result<Value>;
}

/// Secondary operation bound to the result of a primary call
pub trait Linker: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    /// Parameters the caller must supply beyond what the original result provides
    fn additional_parameters_schema(&self) -> &Schema;

    fn additional_configs_schema(&self) -> &Schema;

    /// Result schema of the executor this link creates
    fn result_schema(&self) -> &Schema;

    /// Create the executor bound to `original`
    fn create_executor(&self, original: &ExecutionResult) -> anyhow::Result<BoxedExecutor>;
}

/// Executor with empty schemas that does nothing
///
/// Stands in for operations a resource does not have.
#[derive(Debug, Clone)]
pub struct NoOpExecutor {
    schema: Schema,
}

impl NoOpExecutor {
    pub fn new() -> Self {
        Self {
            schema: Schema::empty_object(),
        }
    }
}

impl Default for NoOpExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Executor for NoOpExecutor {
    fn name(&self) -> &str {
        "noop"
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
        Ok(Value::Object(serde_json::Map::new()))
    }
}

/// Run `executor` under the context's cancellation token and timeout
///
/// The polling variant is used whenever the executor provides one.
pub async fn run_executor(
    ctx: &RunContext,
    operation: &str,
    executor: &dyn Executor,
    parameters: Parameters,
    configs: Configs,
) -> Result<ExecutionResult> {
    if ctx.is_cancelled() {
        return Err(cancelled(ctx, operation));
    }

    log::debug!(
        "{}: {} calling {} with {} parameter(s)",
        ctx.resource(),
        operation,
        executor.name(),
        parameters.len()
    );

    let call = async {
        match executor.as_terminator() {
            Some(terminator) => {
                terminator
                    .execute_until_termination(&parameters, &configs)
                    .await
            }
            None => executor.execute(&parameters, &configs).await,
        }
    };

    let guarded = async {
        tokio::select! {
            biased;
            () = ctx.cancellation().cancelled() => Err(cancelled(ctx, operation)),
            outcome = call => outcome.map_err(|source| Error::Execution {
                resource: ctx.resource().to_string(),
                operation: operation.to_string(),
                source,
            }),
        }
    };

    let value = match ctx.timeout() {
        Some(limit) => match tokio::time::timeout(limit, guarded).await {
            Ok(outcome) => outcome?,
            Err(_) => {
                return Err(Error::TimedOut {
                    resource: ctx.resource().to_string(),
                    operation: operation.to_string(),
                    after: limit,
                });
            }
        },
        None => guarded.await?,
    };

    let source = ResultSource {
        executor: executor.name().to_string(),
        parameters,
        configs,
    };
    Ok(ExecutionResult::new(source, value))
}

fn cancelled(ctx: &RunContext, operation: &str) -> Error {
    Error::Cancelled {
        resource: ctx.resource().to_string(),
        operation: operation.to_string(),
    }
}

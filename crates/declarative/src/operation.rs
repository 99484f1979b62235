//! Operation trait - one step of a lifecycle call

use crate::context::RunContext;
use crate::diagnostics::Diagnostics;
use crate::state::State;
use crate::types::{Configs, ExecutionResult, Parameters};
use async_trait::async_trait;
use schemakit::Schema;

/// Boxed operation, as returned by [`Operation::chain_operations`]
pub type BoxedOperation = Box<dyn Operation>;

/// Follow-up operations requested by a finished step
pub struct Chain {
    pub operations: Vec<BoxedOperation>,
    /// Run `operations` even when the step produced no result
    pub run_if_empty: bool,
    pub diagnostics: Diagnostics,
}

impl Chain {
    /// No follow-up
    pub fn done() -> Self {
        Self {
            operations: Vec::new(),
            run_if_empty: false,
            diagnostics: Diagnostics::new(),
        }
    }

    pub fn then(operations: Vec<BoxedOperation>) -> Self {
        Self {
            operations,
            run_if_empty: true,
            diagnostics: Diagnostics::new(),
        }
    }
}

/// A single step the runner drives through
/// collect → run → validate → merge → chain
///
/// Instances are created per lifecycle call and discarded afterwards, so
/// implementations carry only call-local data plus shared read-only models.
#[async_trait]
pub trait Operation: Send + Sync {
    /// Name used in logs, progress reports and diagnostics
    fn name(&self) -> &str;

    /// Declared schema of the run result, checked before merging
    fn result_schema(&self) -> Option<&Schema> {
        None
    }

    /// Parameters for the run step, read from state
    fn collect_parameters(&self, current: &State, planned: &State) -> (Parameters, Diagnostics);

    fn collect_configs(&self, current: &State, planned: &State) -> Configs;

    /// Whether the run step should happen at all
    fn should_run(&self, _parameters: &Parameters, _configs: &Configs) -> bool {
        true
    }

    /// Perform the step; `None` means nothing was produced
    async fn run(
        &self,
        ctx: &RunContext,
        parameters: Parameters,
        configs: Configs,
    ) -> (Option<ExecutionResult>, Diagnostics);

    /// Merge the result into `target`; returns whether to continue the chain
    fn post_run(
        &self,
        result: &ExecutionResult,
        current: &State,
        planned: &State,
        target: &mut State,
    ) -> (bool, Diagnostics);

    /// Follow-up operations; `result` is `None` when the step was skipped
    fn chain_operations(
        &self,
        result: Option<&ExecutionResult>,
        current: &State,
        planned: &State,
    ) -> Chain;
}

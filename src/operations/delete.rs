use super::{ResourceBinding, execute};
use async_trait::async_trait;
use declarative::{
    Chain, Configs, Diagnostics, ExecutionResult, Operation, Parameters, RunContext, State,
};
use schemakit::Schema;

/// Delete the resource and clear its state
pub struct DeleteOperation {
    binding: ResourceBinding,
}

impl DeleteOperation {
    pub fn new(binding: ResourceBinding) -> Self {
        Self { binding }
    }
}

#[async_trait]
impl Operation for DeleteOperation {
    fn name(&self) -> &str {
        "delete"
    }

    fn result_schema(&self) -> Option<&Schema> {
        Some(self.binding.executors.delete.result_schema())
    }

    fn collect_parameters(&self, current: &State, _planned: &State) -> (Parameters, Diagnostics) {
        self.binding
            .load_parameters(self.binding.executors.delete.parameters_schema(), current)
    }

    fn collect_configs(&self, _current: &State, _planned: &State) -> Configs {
        self.binding.configs(self.binding.executors.delete.as_ref())
    }

    async fn run(
        &self,
        ctx: &RunContext,
        parameters: Parameters,
        configs: Configs,
    ) -> (Option<ExecutionResult>, Diagnostics) {
        execute(
            ctx,
            self.name(),
            self.binding.executors.delete.as_ref(),
            parameters,
            configs,
        )
        .await
    }

    fn post_run(
        &self,
        _result: &ExecutionResult,
        _current: &State,
        _planned: &State,
        target: &mut State,
    ) -> (bool, Diagnostics) {
        log::info!("{}: resource deleted", self.binding.name);
        *target = State::new();
        (true, Diagnostics::new())
    }

    fn chain_operations(
        &self,
        _result: Option<&ExecutionResult>,
        _current: &State,
        _planned: &State,
    ) -> Chain {
        Chain::done()
    }
}

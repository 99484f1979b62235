use super::{ReadOperation, ResourceBinding, execute};
use async_trait::async_trait;
use declarative::{
    Chain, Configs, Diagnostics, ExecutionResult, Operation, Parameters, RunContext, State,
};
use schemakit::Schema;

/// Create the resource, then read it back and apply property setters
pub struct CreateOperation {
    binding: ResourceBinding,
}

impl CreateOperation {
    pub fn new(binding: ResourceBinding) -> Self {
        Self { binding }
    }
}

#[async_trait]
impl Operation for CreateOperation {
    fn name(&self) -> &str {
        "create"
    }

    fn result_schema(&self) -> Option<&Schema> {
        Some(self.binding.executors.create.result_schema())
    }

    fn collect_parameters(&self, _current: &State, planned: &State) -> (Parameters, Diagnostics) {
        self.binding
            .load_parameters(self.binding.executors.create.parameters_schema(), planned)
    }

    fn collect_configs(&self, _current: &State, _planned: &State) -> Configs {
        self.binding.configs(self.binding.executors.create.as_ref())
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
            self.binding.executors.create.as_ref(),
            parameters,
            configs,
        )
        .await
    }

    fn post_run(
        &self,
        result: &ExecutionResult,
        _current: &State,
        _planned: &State,
        target: &mut State,
    ) -> (bool, Diagnostics) {
        log::info!("{}: resource created", self.binding.name);
        let diagnostics = self.binding.apply(result, target);
        (!diagnostics.has_error(), diagnostics)
    }

    fn chain_operations(
        &self,
        _result: Option<&ExecutionResult>,
        _current: &State,
        _planned: &State,
    ) -> Chain {
        Chain::then(vec![Box::new(ReadOperation::with_setters(self.binding.clone()))])
    }
}

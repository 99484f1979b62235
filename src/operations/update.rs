use super::{ReadOperation, ResourceBinding, execute};
use async_trait::async_trait;
use declarative::{
    Chain, Configs, Diagnostics, ExecutionResult, Operation, Parameters, RunContext, State,
};
use schemakit::Schema;
use std::sync::atomic::{AtomicBool, Ordering};

/// Update the resource when its update parameters changed, then read it back
pub struct UpdateOperation {
    binding: ResourceBinding,
    changed: AtomicBool,
}

impl UpdateOperation {
    pub fn new(binding: ResourceBinding) -> Self {
        Self {
            binding,
            changed: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl Operation for UpdateOperation {
    fn name(&self) -> &str {
        "update"
    }

    fn result_schema(&self) -> Option<&Schema> {
        Some(self.binding.executors.update.result_schema())
    }

    fn collect_parameters(&self, current: &State, planned: &State) -> (Parameters, Diagnostics) {
        let schema = self.binding.executors.update.parameters_schema();
        let (parameters, diagnostics) = self.binding.load_parameters(schema, planned);
        if diagnostics.has_error() {
            return (parameters, diagnostics);
        }

        let (previous, _) = self.binding.load_parameters(schema, current);
        let changed = parameters != previous;
        if changed {
            let keys: Vec<&String> = parameters
                .iter()
                .filter(|(k, v)| previous.get(*k) != Some(*v))
                .map(|(k, _)| k)
                .collect();
            log::debug!("{}: update parameters changed: {keys:?}", self.binding.name);
        }
        self.changed.store(changed, Ordering::Relaxed);
        (parameters, diagnostics)
    }

    fn collect_configs(&self, _current: &State, _planned: &State) -> Configs {
        self.binding.configs(self.binding.executors.update.as_ref())
    }

    fn should_run(&self, _parameters: &Parameters, _configs: &Configs) -> bool {
        self.changed.load(Ordering::Relaxed)
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
            self.binding.executors.update.as_ref(),
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
        log::info!("{}: resource updated", self.binding.name);
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

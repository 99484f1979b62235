use async_trait::async_trait;
use declarative::{
    Chain, Configs, Diagnostics, ExecutionResult, Operation, Parameters, RunContext, State,
};
use std::sync::Arc;

/// Replace every value still unknown after a read with a typed null
///
/// The host rejects unknowns in applied state; whatever the server did not
/// report is known to be absent.
pub struct PopulateUnknownOperation {
    resource: Arc<str>,
}

impl PopulateUnknownOperation {
    pub fn new(resource: Arc<str>) -> Self {
        Self { resource }
    }
}

#[async_trait]
impl Operation for PopulateUnknownOperation {
    fn name(&self) -> &str {
        "populate-unknown"
    }

    fn collect_parameters(&self, _current: &State, _planned: &State) -> (Parameters, Diagnostics) {
        (Parameters::new(), Diagnostics::new())
    }

    fn collect_configs(&self, _current: &State, _planned: &State) -> Configs {
        Configs::new()
    }

    async fn run(
        &self,
        _ctx: &RunContext,
        _parameters: Parameters,
        _configs: Configs,
    ) -> (Option<ExecutionResult>, Diagnostics) {
        (Some(ExecutionResult::empty(self.name())), Diagnostics::new())
    }

    fn post_run(
        &self,
        _result: &ExecutionResult,
        _current: &State,
        _planned: &State,
        target: &mut State,
    ) -> (bool, Diagnostics) {
        let replaced = target.replace_unknowns();
        if replaced > 0 {
            log::debug!("{}: {replaced} unknown value(s) set to null", self.resource);
        }
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

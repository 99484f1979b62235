use super::{ResourceBinding, execute};
use crate::convert::to_external;
use crate::error::PropertySetterError;
use crate::setter::SetterTarget;
use async_trait::async_trait;
use declarative::{
    AttributePath, BoxedExecutor, Chain, Configs, Diagnostics, ExecutionResult, Operation,
    Parameters, RunContext, State,
};
use schemakit::Schema;
use serde_json::Value;
use std::sync::OnceLock;

/// Change one attribute through its property setter link
pub struct PropertySetOperation {
    binding: ResourceBinding,
    name: String,
    /// Api name of the attribute being set
    attribute: String,
    target: SetterTarget,
    /// Result the link is bound to
    original: ExecutionResult,
    desired: Value,
    executor: OnceLock<BoxedExecutor>,
}

impl PropertySetOperation {
    pub fn new(
        binding: ResourceBinding,
        attribute: String,
        target: SetterTarget,
        original: ExecutionResult,
        desired: Value,
    ) -> Self {
        Self {
            binding,
            name: format!("set {attribute}"),
            attribute,
            target,
            original,
            desired,
            executor: OnceLock::new(),
        }
    }

    fn path(&self) -> AttributePath {
        let external = self
            .binding
            .tree()
            .lookup(&self.attribute)
            .map_or_else(|| self.attribute.clone(), |a| a.external_name.clone());
        AttributePath::root().attribute(external)
    }

    /// Executor created from the link, once per operation
    fn executor(&self) -> Result<BoxedExecutor, PropertySetterError> {
        if let Some(executor) = self.executor.get() {
            return Ok(executor.clone());
        }
        let executor = self
            .target
            .linker
            .create_executor(&self.original)
            .map_err(|source| PropertySetterError::Link {
                attribute: self.attribute.clone(),
                source,
            })?;
        Ok(self.executor.get_or_init(|| executor).clone())
    }
}

#[async_trait]
impl Operation for PropertySetOperation {
    fn name(&self) -> &str {
        &self.name
    }

    fn result_schema(&self) -> Option<&Schema> {
        Some(self.target.linker.result_schema())
    }

    fn collect_parameters(&self, _current: &State, planned: &State) -> (Parameters, Diagnostics) {
        if let Err(e) = self.executor() {
            return (Parameters::new(), e.to_diagnostic(self.path()).into());
        }

        let from_state = self.target.state_parameters_schema(&self.attribute);
        let (mut parameters, diagnostics) = self.binding.load_parameters(&from_state, planned);
        let schema = self.target.linker.additional_parameters_schema();
        if schema.properties.contains_key(&self.attribute) {
            parameters.insert(self.attribute.clone(), self.desired.clone());
        }
        parameters.extend(self.target.parameters.clone());
        (parameters, diagnostics)
    }

    fn collect_configs(&self, _current: &State, _planned: &State) -> Configs {
        self.binding
            .settings
            .configs_for(self.target.linker.additional_configs_schema())
    }

    async fn run(
        &self,
        ctx: &RunContext,
        parameters: Parameters,
        configs: Configs,
    ) -> (Option<ExecutionResult>, Diagnostics) {
        let executor = match self.executor() {
            Ok(executor) => executor,
            Err(e) => return (None, e.to_diagnostic(self.path()).into()),
        };
        execute(ctx, &self.name, executor.as_ref(), parameters, configs).await
    }

    fn post_run(
        &self,
        _result: &ExecutionResult,
        _current: &State,
        _planned: &State,
        target: &mut State,
    ) -> (bool, Diagnostics) {
        let Some(attr) = self.binding.tree().lookup_output(&self.attribute) else {
            return (true, Diagnostics::new());
        };
        let path = AttributePath::root().attribute(attr.external_name.clone());
        match to_external(&self.desired, attr, target, &path) {
            Ok(()) => {
                log::info!(
                    "{}: {} set to {}",
                    self.binding.name,
                    self.attribute,
                    self.desired
                );
                (true, Diagnostics::new())
            }
            Err(e) => (false, e.to_diagnostic().into()),
        }
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

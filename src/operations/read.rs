use super::{PopulateUnknownOperation, PropertySetOperation, ResourceBinding, execute};
use crate::convert::{Internal, to_internal};
use async_trait::async_trait;
use declarative::{
    AttributePath, BoxedOperation, Chain, Configs, Diagnostics, ExecutionResult, Operation,
    Parameters, RunContext, State,
};
use schemakit::Schema;
use serde_json::Value;

/// Read the resource into the target state
///
/// After a create or update, the read result is also compared with the
/// planned values and a property setter is chained for each attribute
/// that still differs.
pub struct ReadOperation {
    binding: ResourceBinding,
    apply_setters: bool,
}

impl ReadOperation {
    pub fn new(binding: ResourceBinding) -> Self {
        Self {
            binding,
            apply_setters: false,
        }
    }

    pub fn with_setters(binding: ResourceBinding) -> Self {
        Self {
            binding,
            apply_setters: true,
        }
    }

    /// Property setter operations moving the read values to the planned ones
    fn setter_operations(
        &self,
        result: &ExecutionResult,
        planned: &State,
        diagnostics: &mut Diagnostics,
    ) -> Vec<BoxedOperation> {
        let model = &self.binding.model;
        let mut operations: Vec<BoxedOperation> = Vec::new();

        for (api_name, setter) in &model.setters {
            let Some(attr) = model.tree.lookup(api_name) else {
                continue;
            };
            let Some(planned_value) = planned.get_attribute(&attr.external_name) else {
                continue;
            };
            let path = AttributePath::root().attribute(attr.external_name.clone());
            let desired = match to_internal(attr, planned_value, &path, true, false) {
                Ok(Internal::Known(Value::Null) | Internal::Unknown) => continue,
                Ok(Internal::Known(v)) => v,
                Err(e) => {
                    diagnostics.push(e.to_diagnostic());
                    continue;
                }
            };

            let current = result.value.get(api_name).cloned().unwrap_or(Value::Null);
            if current == desired {
                continue;
            }

            match setter.resolve(api_name, &current, &desired) {
                Ok(target) => {
                    log::debug!(
                        "{}: {api_name} is {current}, setting it to {desired} with {}",
                        self.binding.name,
                        target.link
                    );
                    operations.push(Box::new(PropertySetOperation::new(
                        self.binding.clone(),
                        api_name.clone(),
                        target,
                        result.clone(),
                        desired,
                    )));
                }
                Err(e) => diagnostics.push(e.to_diagnostic(path)),
            }
        }
        operations
    }
}

#[async_trait]
impl Operation for ReadOperation {
    fn name(&self) -> &str {
        "read"
    }

    fn result_schema(&self) -> Option<&Schema> {
        Some(self.binding.executors.read.result_schema())
    }

    fn collect_parameters(&self, current: &State, _planned: &State) -> (Parameters, Diagnostics) {
        self.binding
            .load_parameters(self.binding.executors.read.parameters_schema(), current)
    }

    fn collect_configs(&self, _current: &State, _planned: &State) -> Configs {
        self.binding.configs(self.binding.executors.read.as_ref())
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
            self.binding.executors.read.as_ref(),
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
        let diagnostics = self.binding.apply(result, target);
        (!diagnostics.has_error(), diagnostics)
    }

    fn chain_operations(
        &self,
        result: Option<&ExecutionResult>,
        _current: &State,
        planned: &State,
    ) -> Chain {
        let mut diagnostics = Diagnostics::new();
        let mut operations = match result {
            Some(result) if self.apply_setters => {
                self.setter_operations(result, planned, &mut diagnostics)
            }
            _ => Vec::new(),
        };
        operations.push(Box::new(PopulateUnknownOperation::new(self.binding.name.clone())));

        Chain {
            diagnostics,
            ..Chain::then(operations)
        }
    }
}

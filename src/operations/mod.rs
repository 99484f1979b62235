//! Lifecycle operations of a REST resource
//!
//! Each lifecycle call builds one root operation; follow-ups are chained by
//! the operations themselves:
//!
//! ```text
//! create ─┐
//!         ├─> read ─> [set <attr>]* ─> populate-unknown
//! update ─┘
//! read ─> populate-unknown
//! delete
//! ```

mod create;
mod delete;
mod populate_unknown;
mod property_set;
mod read;
mod update;

pub use create::CreateOperation;
pub use delete::DeleteOperation;
pub use populate_unknown::PopulateUnknownOperation;
pub use property_set::PropertySetOperation;
pub use read::ReadOperation;
pub use update::UpdateOperation;

use crate::attribute::AttributeTree;
use crate::config::Settings;
use crate::convert::{self, apply_result};
use crate::error::ConversionError;
use crate::resource::{ResourceExecutors, ResourceModel};
use declarative::{
    Configs, Diagnostics, ExecutionResult, Executor, Parameters, RunContext, State, run_executor,
};
use schemakit::Schema;
use std::sync::Arc;

/// Read-only data shared by the operations of one resource type
#[derive(Clone)]
pub struct ResourceBinding {
    pub name: Arc<str>,
    pub model: Arc<ResourceModel>,
    pub executors: Arc<ResourceExecutors>,
    pub settings: Arc<Settings>,
}

impl ResourceBinding {
    pub fn tree(&self) -> &AttributeTree {
        &self.model.tree
    }

    /// Parameters for `schema`, read from `state`
    pub(crate) fn load_parameters(&self, schema: &Schema, state: &State) -> (Parameters, Diagnostics) {
        match convert::load_parameters(schema, self.tree(), state) {
            Ok(parameters) => (parameters, Diagnostics::new()),
            Err(e) => {
                log::warn!("{}: unable to load parameters: {e}", self.name);
                (Parameters::new(), e.to_diagnostic().into())
            }
        }
    }

    pub(crate) fn configs(&self, executor: &dyn Executor) -> Configs {
        self.settings.configs_for(executor.configs_schema())
    }

    /// Merge a result into the output attributes of `target`
    pub(crate) fn apply(&self, result: &ExecutionResult, target: &mut State) -> Diagnostics {
        match apply_result(&result.value, &self.tree().output, target) {
            Ok(()) => Diagnostics::new(),
            Err(e) => conversion_failed(&self.name, &e),
        }
    }
}

pub(crate) fn conversion_failed(resource: &str, e: &ConversionError) -> Diagnostics {
    log::warn!("{resource}: unable to merge result: {e}");
    e.to_diagnostic().into()
}

/// Run `executor`, reporting failures as diagnostics
pub(crate) async fn execute(
    ctx: &RunContext,
    operation: &str,
    executor: &dyn Executor,
    parameters: Parameters,
    configs: Configs,
) -> (Option<ExecutionResult>, Diagnostics) {
    match run_executor(ctx, operation, executor, parameters, configs).await {
        Ok(result) => (Some(result), Diagnostics::new()),
        Err(e) => {
            log::error!("{e}");
            (None, e.to_diagnostic().into())
        }
    }
}

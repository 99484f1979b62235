//! REST resource - binds executors to the declarative lifecycle
//!
//! A [`RestResource`] owns the executors of one resource type. Its
//! [`ResourceModel`] (attribute tree, property setters, host schema) is
//! built on first use and shared by every later call, including concurrent
//! ones.

use crate::attribute::AttributeTree;
use crate::classifier::{ClassifierInput, build_attribute_tree};
use crate::config::Settings;
use crate::error::{ClassificationError, Error, Result};
use crate::host_schema::{HostSchema, generate_host_schema};
use crate::operations::{
    CreateOperation, DeleteOperation, ReadOperation, ResourceBinding, UpdateOperation,
};
use crate::read_from_list::ReadFromListExecutor;
use crate::setter::{SetterMap, resolve_property_setters};
use declarative::{
    BoxedExecutor, BoxedOperation, Diagnostics, NoOpExecutor, RunContext, State, TerminationCheck,
    run_operation,
};
use schemakit::Schema;
use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

/// Lifecycle call an executor serves
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LifecycleStep {
    Create,
    Read,
    Update,
    Delete,
}

/// Executors of one resource type, as handed over by the caller
#[derive(Clone)]
pub struct ResourceOperations {
    create: BoxedExecutor,
    delete: BoxedExecutor,
    read: Option<BoxedExecutor>,
    update: Option<BoxedExecutor>,
    list: Option<BoxedExecutor>,
    /// Steps whose calls repeat until the check accepts the result
    poll_until: BTreeMap<LifecycleStep, TerminationCheck>,
}

impl ResourceOperations {
    pub fn new(create: BoxedExecutor, delete: BoxedExecutor) -> Self {
        Self {
            create,
            delete,
            read: None,
            update: None,
            list: None,
            poll_until: BTreeMap::new(),
        }
    }

    pub fn with_read(mut self, read: BoxedExecutor) -> Self {
        self.read = Some(read);
        self
    }

    pub fn with_update(mut self, update: BoxedExecutor) -> Self {
        self.update = Some(update);
        self
    }

    /// List executor, used to synthesize a read when there is none
    pub fn with_list(mut self, list: BoxedExecutor) -> Self {
        self.list = Some(list);
        self
    }

    /// Poll `step` until `check` accepts its result
    ///
    /// Retry bounds come from the `[polling]` settings.
    pub fn poll_until(mut self, step: LifecycleStep, check: TerminationCheck) -> Self {
        self.poll_until.insert(step, check);
        self
    }

    fn into_executors(self, resource: &str, settings: &Settings) -> Result<ResourceExecutors> {
        let read = match (self.read, self.list) {
            (Some(read), _) => read,
            (None, Some(list)) => {
                let read = ReadFromListExecutor::new(
                    list,
                    self.create.result_schema(),
                    self.delete.parameters_schema(),
                )
                .map_err(|e| {
                    log::warn!("{resource}: unable to generate read from list: {e:#}");
                    Error::Registration {
                        resource: resource.to_string(),
                        reason: format!("misses read: {e:#}"),
                    }
                })?;
                log::debug!("{resource}: generated read from list");
                Arc::new(read)
            }
            (None, None) => {
                return Err(Error::Registration {
                    resource: resource.to_string(),
                    reason: "misses read".to_string(),
                });
            }
        };

        let update = self
            .update
            .unwrap_or_else(|| Arc::new(NoOpExecutor::new()));
        let polled = |step: LifecycleStep, executor: BoxedExecutor| match self.poll_until.get(&step) {
            Some(check) => {
                log::debug!("{resource}: {} polls until terminated", executor.name());
                settings.polling_executor(executor, check.clone())
            }
            None => executor,
        };

        Ok(ResourceExecutors {
            create: polled(LifecycleStep::Create, self.create),
            read: polled(LifecycleStep::Read, read),
            update: polled(LifecycleStep::Update, update),
            delete: polled(LifecycleStep::Delete, self.delete),
        })
    }
}

impl std::fmt::Debug for ResourceOperations {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceOperations")
            .field("create", &self.create)
            .field("delete", &self.delete)
            .field("read", &self.read)
            .field("update", &self.update)
            .field("list", &self.list)
            .field("poll_until", &self.poll_until.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Executors the lifecycle operations call
#[derive(Debug, Clone)]
pub struct ResourceExecutors {
    pub create: BoxedExecutor,
    pub read: BoxedExecutor,
    pub update: BoxedExecutor,
    pub delete: BoxedExecutor,
}

/// Everything derived from a resource type's schemas
#[derive(Debug)]
pub struct ResourceModel {
    pub tree: AttributeTree,
    pub setters: SetterMap,
    pub host_schema: HostSchema,
}

/// Outcome of a lifecycle call: the new state, possibly partial
#[derive(Debug, Clone)]
pub struct LifecycleResponse {
    pub state: State,
    pub diagnostics: Diagnostics,
}

impl LifecycleResponse {
    pub fn is_success(&self) -> bool {
        !self.diagnostics.has_error()
    }
}

pub struct RestResource {
    name: Arc<str>,
    description: String,
    executors: Arc<ResourceExecutors>,
    settings: Arc<Settings>,
    model: OnceLock<std::result::Result<Arc<ResourceModel>, ClassificationError>>,
    #[cfg(test)]
    builds: std::sync::atomic::AtomicUsize,
}

impl RestResource {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        operations: ResourceOperations,
        settings: Arc<Settings>,
    ) -> Result<Self> {
        let name: String = name.into();
        let executors = operations.into_executors(&name, &settings)?;
        Ok(Self {
            name: name.into(),
            description: description.into(),
            executors: Arc::new(executors),
            settings,
            model: OnceLock::new(),
            #[cfg(test)]
            builds: std::sync::atomic::AtomicUsize::new(0),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// The resource model, built on first use
    pub fn model(&self) -> std::result::Result<Arc<ResourceModel>, ClassificationError> {
        self.model
            .get_or_init(|| self.build_model().map(Arc::new))
            .clone()
    }

    /// Host-facing schema of this resource type
    pub fn schema(&self) -> std::result::Result<HostSchema, ClassificationError> {
        self.model().map(|model| model.host_schema.clone())
    }

    fn build_model(&self) -> std::result::Result<ResourceModel, ClassificationError> {
        #[cfg(test)]
        self.builds
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);

        log::debug!("{}: building resource model", self.name);
        let executors = &self.executors;

        let mut links = executors.create.links();
        links.extend(executors.read.links());
        let setters = resolve_property_setters(&self.name, &links)?;
        let (setter_params, setter_results): (Vec<Schema>, Vec<Schema>) = setters
            .iter()
            .flat_map(|(attribute, setter)| {
                setter.targets().into_iter().map(move |target| {
                    (
                        target.state_parameters_schema(attribute),
                        target.linker.result_schema().clone(),
                    )
                })
            })
            .unzip();

        let tree = build_attribute_tree(
            &self.name,
            &ClassifierInput {
                create_params: executors.create.parameters_schema(),
                update_params: executors.update.parameters_schema(),
                delete_params: executors.delete.parameters_schema(),
                read_params: executors.read.parameters_schema(),
                create_result: executors.create.result_schema(),
                read_result: executors.read.result_schema(),
                setters: setters.keys().cloned().collect(),
                setter_params,
                setter_results,
            },
        )
        .inspect_err(|e| log::error!("{e}"))?;

        let host_schema = generate_host_schema(&self.name, &self.description, &tree);
        Ok(ResourceModel {
            tree,
            setters,
            host_schema,
        })
    }

    /// Run context bounded by the configured operation timeout
    pub fn context(&self) -> RunContext {
        RunContext::new(self.name.as_ref()).with_timeout(self.settings.operation_timeout())
    }

    async fn run(
        &self,
        ctx: &RunContext,
        build: impl FnOnce(ResourceBinding) -> BoxedOperation,
        current: &State,
        planned: &State,
        mut target: State,
    ) -> LifecycleResponse {
        let model = match self.model() {
            Ok(model) => model,
            Err(e) => {
                return LifecycleResponse {
                    state: target,
                    diagnostics: e.to_diagnostic().into(),
                };
            }
        };

        let operation = build(ResourceBinding {
            name: self.name.clone(),
            model,
            executors: self.executors.clone(),
            settings: self.settings.clone(),
        });
        let summary = run_operation(ctx, operation, current, planned, &mut target).await;
        log::debug!(
            "{}: {} operation(s) run, {} skipped",
            self.name,
            summary.completed,
            summary.skipped
        );
        LifecycleResponse {
            state: target,
            diagnostics: summary.diagnostics,
        }
    }

    /// Create the resource described by `planned`
    pub async fn create(&self, ctx: &RunContext, current: &State, planned: &State) -> LifecycleResponse {
        self.run(
            ctx,
            |binding| Box::new(CreateOperation::new(binding)),
            current,
            planned,
            planned.clone(),
        )
        .await
    }

    /// Refresh `current` from the server
    pub async fn read(&self, ctx: &RunContext, current: &State, planned: &State) -> LifecycleResponse {
        self.run(
            ctx,
            |binding| Box::new(ReadOperation::new(binding)),
            current,
            planned,
            current.clone(),
        )
        .await
    }

    /// Move the resource from `current` to `planned`
    pub async fn update(&self, ctx: &RunContext, current: &State, planned: &State) -> LifecycleResponse {
        self.run(
            ctx,
            |binding| Box::new(UpdateOperation::new(binding)),
            current,
            planned,
            planned.clone(),
        )
        .await
    }

    /// Delete the resource; the returned state is empty on success
    pub async fn delete(&self, ctx: &RunContext, current: &State, planned: &State) -> LifecycleResponse {
        self.run(
            ctx,
            |binding| Box::new(DeleteOperation::new(binding)),
            current,
            planned,
            current.clone(),
        )
        .await
    }
}

impl std::fmt::Debug for RestResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestResource")
            .field("name", &self.name)
            .field("executors", &self.executors)
            .finish_non_exhaustive()
    }
}

//! Scripted executors and linkers for lifecycle tests

#![allow(dead_code)]

use async_trait::async_trait;
use restform::declarative::{
    BoxedExecutor, Configs, ExecutionResult, Executor, Linker, Links, Parameters,
};
use restform::schemakit::Schema;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Executor returning canned values and recording its calls
#[derive(Debug)]
pub struct MockExecutor {
    name: String,
    parameters: Schema,
    configs: Schema,
    result: Schema,
    links: Links,
    /// Consumed first, one per call
    scripted: Mutex<VecDeque<Result<Value, String>>>,
    /// Returned once the script is exhausted
    fallback: Value,
    calls: Mutex<Vec<Parameters>>,
    received_configs: Mutex<Vec<Configs>>,
}

impl MockExecutor {
    pub fn new(name: &str, parameters: Schema, result: Schema) -> Self {
        Self {
            name: name.to_string(),
            parameters,
            configs: Schema::empty_object(),
            result,
            links: Links::new(),
            scripted: Mutex::new(VecDeque::new()),
            fallback: Value::Object(serde_json::Map::new()),
            calls: Mutex::new(Vec::new()),
            received_configs: Mutex::new(Vec::new()),
        }
    }

    pub fn returning(mut self, value: Value) -> Self {
        self.fallback = value;
        self
    }

    pub fn then_return(self, value: Value) -> Self {
        self.scripted.lock().unwrap().push_back(Ok(value));
        self
    }

    pub fn then_fail(self, message: &str) -> Self {
        self.scripted
            .lock()
            .unwrap()
            .push_back(Err(message.to_string()));
        self
    }

    pub fn with_configs(mut self, configs: Schema) -> Self {
        self.configs = configs;
        self
    }

    pub fn with_link(mut self, linker: Arc<dyn Linker>) -> Self {
        self.links.insert(linker.name().to_string(), linker);
        self
    }

    pub fn calls(&self) -> Vec<Parameters> {
        self.calls.lock().unwrap().clone()
    }

    pub fn received_configs(&self) -> Vec<Configs> {
        self.received_configs.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Executor for MockExecutor {
    fn name(&self) -> &str {
        &self.name
    }

    fn parameters_schema(&self) -> &Schema {
        &self.parameters
    }

    fn configs_schema(&self) -> &Schema {
        &self.configs
    }

    fn result_schema(&self) -> &Schema {
        &self.result
    }

    fn links(&self) -> Links {
        self.links.clone()
    }

    async fn execute(&self, parameters: &Parameters, configs: &Configs) -> anyhow::Result<Value> {
        self.calls.lock().unwrap().push(parameters.clone());
        self.received_configs.lock().unwrap().push(configs.clone());
        match self.scripted.lock().unwrap().pop_front() {
            Some(Ok(value)) => Ok(value),
            Some(Err(message)) => Err(anyhow::anyhow!(message)),
            None => Ok(self.fallback.clone()),
        }
    }
}

/// Linker handing out one shared executor
#[derive(Debug)]
pub struct MockLinker {
    name: String,
    parameters: Schema,
    empty: Schema,
    pub executor: Arc<MockExecutor>,
    originals: Mutex<Vec<Value>>,
}

impl MockLinker {
    pub fn new(name: &str, parameters: Schema) -> Self {
        Self {
            name: name.to_string(),
            parameters,
            empty: Schema::empty_object(),
            executor: Arc::new(MockExecutor::new(
                name,
                Schema::empty_object(),
                Schema::empty_object(),
            )),
            originals: Mutex::new(Vec::new()),
        }
    }

    /// Values of the results executors were created from
    pub fn originals(&self) -> Vec<Value> {
        self.originals.lock().unwrap().clone()
    }
}

impl Linker for MockLinker {
    fn name(&self) -> &str {
        &self.name
    }

    fn additional_parameters_schema(&self) -> &Schema {
        &self.parameters
    }

    fn additional_configs_schema(&self) -> &Schema {
        &self.empty
    }

    fn result_schema(&self) -> &Schema {
        &self.empty
    }

    fn create_executor(&self, original: &ExecutionResult) -> anyhow::Result<BoxedExecutor> {
        self.originals.lock().unwrap().push(original.value.clone());
        Ok(self.executor.clone())
    }
}

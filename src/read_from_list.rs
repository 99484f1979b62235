//! Read executor synthesized from a list executor
//!
//! Resources without a read operation can still be refreshed when they have
//! a list operation: the list is fetched (page by page when it supports
//! `_offset`/`_limit`) and the single element whose identifiers match the
//! parameters is returned.

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use declarative::{BoxedExecutor, Configs, Executor, Parameters};
use schemakit::{Schema, SchemaType};
use serde_json::Value;

const OFFSET_PARAM: &str = "_offset";
const LIMIT_PARAM: &str = "_limit";
const PAGE_SIZE: u64 = 50;

#[derive(Debug)]
pub struct ReadFromListExecutor {
    name: String,
    list: BoxedExecutor,
    /// Properties identifying one element: delete parameters also in the create result
    identifiers: Vec<String>,
    parameters_schema: Schema,
    result_schema: Schema,
    /// Property of the list result holding the elements, when it is not a bare array
    items_key: Option<String>,
}

impl ReadFromListExecutor {
    pub fn new(list: BoxedExecutor, create_result: &Schema, delete_params: &Schema) -> Result<Self> {
        let identifiers: Vec<String> = delete_params
            .properties
            .keys()
            .filter(|name| create_result.properties.contains_key(*name))
            .cloned()
            .collect();
        if identifiers.is_empty() {
            bail!(
                "no delete parameter of {} is part of the create result",
                list.name()
            );
        }

        let (items_key, item_schema) = list_items(list.result_schema())
            .with_context(|| format!("{} does not return a list", list.name()))?;

        let parameters_schema = Schema::object(identifiers.iter().map(|id| {
            let schema = create_result
                .property(id)
                .cloned()
                .unwrap_or_else(Schema::string);
            (id.clone(), schema)
        }))
        .with_required(identifiers.clone());

        Ok(Self {
            name: format!("{}-read", list.name()),
            list,
            identifiers,
            parameters_schema,
            result_schema: item_schema,
            items_key,
        })
    }

    fn is_paginated(&self) -> bool {
        let params = &self.list.parameters_schema().properties;
        params.contains_key(OFFSET_PARAM) && params.contains_key(LIMIT_PARAM)
    }

    fn matches(&self, item: &Value, parameters: &Parameters) -> bool {
        self.identifiers
            .iter()
            .all(|id| item.get(id).is_some() && item.get(id) == parameters.get(id))
    }

    fn page_items(&self, page: Value) -> Result<Vec<Value>> {
        let items = match (&self.items_key, page) {
            (None, Value::Array(items)) => items,
            (Some(key), Value::Object(mut map)) => match map.remove(key) {
                Some(Value::Array(items)) => items,
                Some(Value::Null) | None => Vec::new(),
                Some(_) => bail!("{}: {key:?} is not an array", self.list.name()),
            },
            (_, Value::Null) => Vec::new(),
            _ => bail!("{}: unexpected list result", self.list.name()),
        };
        Ok(items)
    }
}

/// Where the elements of a list result live, and their schema
fn list_items(result: &Schema) -> Option<(Option<String>, Schema)> {
    match result.schema_type()? {
        SchemaType::Array => Some((None, result.items.as_deref()?.clone())),
        SchemaType::Object => {
            let mut arrays = result
                .properties
                .iter()
                .filter(|(_, p)| p.schema_type() == Some(SchemaType::Array));
            let (key, property) = arrays.next()?;
            if arrays.next().is_some() {
                return None;
            }
            Some((Some(key.clone()), property.items.as_deref()?.clone()))
        }
        _ => None,
    }
}

#[async_trait]
impl Executor for ReadFromListExecutor {
    fn name(&self) -> &str {
        &self.name
    }

    fn parameters_schema(&self) -> &Schema {
        &self.parameters_schema
    }

    fn configs_schema(&self) -> &Schema {
        self.list.configs_schema()
    }

    fn result_schema(&self) -> &Schema {
        &self.result_schema
    }

    async fn execute(&self, parameters: &Parameters, configs: &Configs) -> Result<Value> {
        let declared = &self.list.parameters_schema().properties;
        let mut list_params: Parameters = parameters
            .iter()
            .filter(|(k, _)| declared.contains_key(*k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let paginated = self.is_paginated();
        let mut offset = 0;
        let mut found = Vec::new();
        loop {
            if paginated {
                list_params.insert(OFFSET_PARAM.to_string(), Value::from(offset));
                list_params.insert(LIMIT_PARAM.to_string(), Value::from(PAGE_SIZE));
            }
            let page = self.list.execute(&list_params, configs).await?;
            let items = self.page_items(page)?;
            let count = items.len() as u64;
            found.extend(items.into_iter().filter(|item| self.matches(item, parameters)));

            if !paginated || count < PAGE_SIZE {
                break;
            }
            offset += PAGE_SIZE;
            log::debug!("{}: fetching next page at offset {offset}", self.name);
        }

        match found.len() {
            0 => bail!("{}: no element matches {:?}", self.name, self.identifiers),
            1 => Ok(found.remove(0)),
            n => bail!("{}: {n} elements match {:?}", self.name, self.identifiers),
        }
    }
}

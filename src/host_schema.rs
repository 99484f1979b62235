//! Typed attribute schema handed to the declarative host

use crate::attribute::{AttributeInfo, AttributeMap, AttributeTree};
use schemakit::SchemaType;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostAttributeKind {
    String,
    Number,
    Integer,
    Bool,
    /// List of scalars or of lists
    List { element: Box<HostAttributeKind> },
    /// List whose elements are objects with their own attributes
    ListNested { attributes: BTreeMap<String, HostAttribute> },
    Object { attributes: BTreeMap<String, HostAttribute> },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HostAttribute {
    #[serde(flatten)]
    pub kind: HostAttributeKind,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub required: bool,
    pub optional: bool,
    pub computed: bool,
    pub use_state_for_unknown: bool,
    pub requires_replace: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HostSchema {
    pub description: String,
    pub attributes: BTreeMap<String, HostAttribute>,
}

impl HostSchema {
    pub fn attribute(&self, name: &str) -> Option<&HostAttribute> {
        self.attributes.get(name)
    }
}

/// Host schema of a resource type
///
/// Inputs are emitted first. An output is only emitted when no input
/// already claims its external name.
pub fn generate_host_schema(resource: &str, description: &str, tree: &AttributeTree) -> HostSchema {
    let mut attributes = BTreeMap::new();
    for attr in tree.input.values() {
        attributes.insert(attr.external_name.clone(), host_attribute(attr));
    }
    for attr in tree.output.values() {
        attributes
            .entry(attr.external_name.clone())
            .or_insert_with(|| host_attribute(attr));
    }

    log::debug!(
        "{resource}: host schema has attributes {:?}",
        attributes.keys().collect::<Vec<_>>()
    );
    HostSchema {
        description: description.to_string(),
        attributes,
    }
}

fn host_attribute(attr: &AttributeInfo) -> HostAttribute {
    let m = &attr.modifiers;
    HostAttribute {
        kind: host_kind(attr),
        description: attr.schema.description.clone().unwrap_or_default(),
        required: m.is_required,
        optional: m.is_optional,
        computed: m.is_computed,
        use_state_for_unknown: m.use_state_for_unknown,
        requires_replace: m.requires_replace,
        default: host_default(attr),
    }
}

fn host_kind(attr: &AttributeInfo) -> HostAttributeKind {
    match attr.schema_type() {
        Some(SchemaType::Number) => HostAttributeKind::Number,
        Some(SchemaType::Integer) => HostAttributeKind::Integer,
        Some(SchemaType::Boolean) => HostAttributeKind::Bool,
        Some(SchemaType::Array) => match attr.item() {
            Some(item) if item.schema_type() == Some(SchemaType::Object) => {
                HostAttributeKind::ListNested {
                    attributes: nested(&item.children),
                }
            }
            Some(item) => HostAttributeKind::List {
                element: Box::new(host_kind(item)),
            },
            None => HostAttributeKind::List {
                element: Box::new(HostAttributeKind::String),
            },
        },
        Some(SchemaType::Object) => HostAttributeKind::Object {
            attributes: nested(&attr.children),
        },
        _ => HostAttributeKind::String,
    }
}

fn nested(children: &AttributeMap) -> BTreeMap<String, HostAttribute> {
    children
        .values()
        .map(|child| (child.external_name.clone(), host_attribute(child)))
        .collect()
}

/// Schema default, when the host is allowed to fill it in
fn host_default(attr: &AttributeInfo) -> Option<Value> {
    if !attr.modifiers.is_computed || attr.modifiers.ignore_default {
        return None;
    }
    let default = attr.schema.default.as_ref()?;
    if default.is_null() {
        return None;
    }
    match schemakit::validate(&attr.schema, default) {
        Ok(()) => Some(default.clone()),
        Err(e) => {
            log::debug!("ignoring default of {:?}: {e}", attr.external_name);
            None
        }
    }
}

//! Attribute tree of a resource type
//!
//! Every settable or readable field of a resource becomes an
//! [`AttributeInfo`]. Input attributes come from the create, update and
//! delete parameters, output attributes from the create and read results.

use declarative::ValueType;
use schemakit::{Schema, SchemaType};
use std::collections::BTreeMap;

/// Key of the synthetic child describing array elements
pub const ITEM_KEY: &str = "item";

/// How the host should treat an attribute during planning
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub is_required: bool,
    pub is_optional: bool,
    pub is_computed: bool,
    /// Keep the prior state value while the new one is unknown
    pub use_state_for_unknown: bool,
    /// Changing the value replaces the resource
    pub requires_replace: bool,
    /// Do not advertise the schema default to the host
    pub ignore_default: bool,
    /// External name to use instead of the converted api name
    pub name_override: Option<String>,
}

/// Attributes keyed by api name
pub type AttributeMap = BTreeMap<String, AttributeInfo>;

#[derive(Debug, Clone, PartialEq)]
pub struct AttributeInfo {
    /// Property name on the wire
    pub api_name: String,
    /// Name in the declarative state
    pub external_name: String,
    /// Flattened schema the attribute was derived from
    pub schema: Schema,
    pub modifiers: Modifiers,
    /// Object properties, or the single [`ITEM_KEY`] child of an array
    pub children: AttributeMap,
    /// Api name of the output attribute holding the server's view, when split
    pub current_counterpart: Option<String>,
}

impl AttributeInfo {
    pub fn schema_type(&self) -> Option<SchemaType> {
        self.schema.schema_type()
    }

    /// Element attribute of an array
    pub fn item(&self) -> Option<&Self> {
        self.children.get(ITEM_KEY)
    }

    pub fn is_nullable(&self) -> bool {
        self.schema.is_nullable()
    }

    /// Static type of the attribute's state slot
    pub fn value_type(&self) -> ValueType {
        match self.schema_type() {
            Some(SchemaType::Number) => ValueType::Number,
            Some(SchemaType::Integer) => ValueType::Integer,
            Some(SchemaType::Boolean) => ValueType::Bool,
            Some(SchemaType::Array) => ValueType::List(Box::new(
                self.item().map_or(ValueType::String, Self::value_type),
            )),
            Some(SchemaType::Object) => ValueType::Object(
                self.children
                    .values()
                    .map(|child| (child.external_name.clone(), child.value_type()))
                    .collect(),
            ),
            _ => ValueType::String,
        }
    }
}

/// Input and output attributes of one resource type
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeTree {
    pub input: AttributeMap,
    pub output: AttributeMap,
}

impl AttributeTree {
    /// Attribute by api name, inputs first
    pub fn lookup(&self, api_name: &str) -> Option<&AttributeInfo> {
        self.input
            .get(api_name)
            .or_else(|| self.output.get(api_name))
    }

    /// Output attribute by api name, falling back to inputs
    pub fn lookup_output(&self, api_name: &str) -> Option<&AttributeInfo> {
        self.output
            .get(api_name)
            .or_else(|| self.input.get(api_name))
    }

    /// Attribute by external name, inputs first
    pub fn find_external(&self, external_name: &str) -> Option<&AttributeInfo> {
        self.input
            .values()
            .chain(self.output.values())
            .find(|attr| attr.external_name == external_name)
    }

    /// Output twin of a split input attribute
    pub fn counterpart(&self, input: &AttributeInfo) -> Option<&AttributeInfo> {
        input
            .current_counterpart
            .as_deref()
            .and_then(|key| self.output.get(key))
    }
}

//! Schema node model

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Type tag of a schema node
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SchemaType {
    String,
    Number,
    Integer,
    Boolean,
    Array,
    Object,
    Null,
    /// Any type name outside the supported set, kept verbatim for error reporting
    Unsupported(String),
}

impl SchemaType {
    /// Parse a JSON-Schema type name
    pub fn from_name(name: &str) -> Self {
        match name {
            "string" => Self::String,
            "number" => Self::Number,
            "integer" => Self::Integer,
            "boolean" => Self::Boolean,
            "array" => Self::Array,
            "object" => Self::Object,
            "null" => Self::Null,
            other => Self::Unsupported(other.to_string()),
        }
    }

    /// JSON-Schema type name
    pub fn name(&self) -> &str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
            Self::Null => "null",
            Self::Unsupported(name) => name,
        }
    }

    /// Check if this is a scalar type (string, number, integer, boolean)
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            Self::String | Self::Number | Self::Integer | Self::Boolean
        )
    }
}

impl fmt::Display for SchemaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for SchemaType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for SchemaType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(Self::from_name(&name))
    }
}

/// The `type` keyword: a single type or a list of types (`["string", "null"]`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TypeDecl {
    Single(SchemaType),
    Union(Vec<SchemaType>),
}

/// A JSON-Schema node
///
/// Only the keywords relevant to attribute classification are modeled;
/// anything else in the source document is ignored on deserialization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_decl: Option<TypeDecl>,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub nullable: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, Schema>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<Schema>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,

    #[serde(rename = "enum", default, skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<Value>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub one_of: Vec<Schema>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub any_of: Vec<Schema>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub all_of: Vec<Schema>,

    /// Set by flattening on properties that only some `oneOf`/`anyOf` alternatives declare
    #[serde(skip)]
    pub promoted: bool,
}

impl Schema {
    /// Schema with the given type and nothing else
    pub fn of_type(schema_type: SchemaType) -> Self {
        Self {
            type_decl: Some(TypeDecl::Single(schema_type)),
            ..Self::default()
        }
    }

    pub fn string() -> Self {
        Self::of_type(SchemaType::String)
    }

    pub fn integer() -> Self {
        Self::of_type(SchemaType::Integer)
    }

    pub fn number() -> Self {
        Self::of_type(SchemaType::Number)
    }

    pub fn boolean() -> Self {
        Self::of_type(SchemaType::Boolean)
    }

    /// Array schema with the given item schema
    pub fn array(items: Self) -> Self {
        Self {
            items: Some(Box::new(items)),
            ..Self::of_type(SchemaType::Array)
        }
    }

    /// Object schema from `(name, schema)` pairs
    pub fn object<I, K>(properties: I) -> Self
    where
        I: IntoIterator<Item = (K, Self)>,
        K: Into<String>,
    {
        Self {
            properties: properties
                .into_iter()
                .map(|(k, v)| (k.into(), v))
                .collect(),
            ..Self::of_type(SchemaType::Object)
        }
    }

    /// Empty object schema, used by executors with no parameters or results
    pub fn empty_object() -> Self {
        Self::of_type(SchemaType::Object)
    }

    pub fn with_required<I, S>(mut self, required: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required = required.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    pub fn with_enum<I: IntoIterator<Item = Value>>(mut self, values: I) -> Self {
        self.enum_values = values.into_iter().collect();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Effective type: the declared type without `null`, or one inferred
    /// from `properties`/`items` when no type is declared
    pub fn schema_type(&self) -> Option<SchemaType> {
        match &self.type_decl {
            Some(TypeDecl::Single(t)) => Some(t.clone()),
            Some(TypeDecl::Union(types)) => types
                .iter()
                .find(|t| **t != SchemaType::Null)
                .cloned()
                .or_else(|| types.first().cloned()),
            None if !self.properties.is_empty() => Some(SchemaType::Object),
            None if self.items.is_some() => Some(SchemaType::Array),
            None => None,
        }
    }

    /// Whether `null` is an accepted value for this node
    pub fn is_nullable(&self) -> bool {
        if self.nullable {
            return true;
        }
        if let Some(TypeDecl::Union(types)) = &self.type_decl {
            if types.contains(&SchemaType::Null) {
                return true;
            }
        }
        if let Some(TypeDecl::Single(SchemaType::Null)) = &self.type_decl {
            return true;
        }
        self.one_of
            .iter()
            .chain(&self.any_of)
            .any(Self::is_nullable)
    }

    /// Whether the node has `oneOf`/`anyOf`/`allOf` alternatives
    pub fn has_combinators(&self) -> bool {
        !self.one_of.is_empty() || !self.any_of.is_empty() || !self.all_of.is_empty()
    }

    pub fn is_required(&self, property: &str) -> bool {
        self.required.iter().any(|r| r == property)
    }

    pub fn property(&self, name: &str) -> Option<&Self> {
        self.properties.get(name)
    }
}

//! Flattening of `oneOf`/`anyOf`/`allOf` combinators
//!
//! Classification works on plain nodes, so every combinator is resolved into
//! a single equivalent node first:
//!
//! - `allOf` merges properties and required lists of every alternative.
//! - `oneOf`/`anyOf` over objects unions the properties, intersects the
//!   required lists and marks properties that not every alternative declares
//!   as [`Schema::promoted`].
//! - `null` alternatives only make the result nullable.

use crate::error::{Error, Result};
use crate::schema::{Schema, SchemaType, TypeDecl};
use std::borrow::Cow;
use std::collections::BTreeSet;

/// Resolve the combinators of `schema`, borrowing when there are none
pub fn flatten(schema: &Schema) -> Result<Cow<'_, Schema>> {
    flatten_at(schema, "$")
}

fn flatten_at<'a>(schema: &'a Schema, path: &str) -> Result<Cow<'a, Schema>> {
    if !schema.has_combinators() {
        return Ok(Cow::Borrowed(schema));
    }

    let mut base = Schema {
        one_of: Vec::new(),
        any_of: Vec::new(),
        all_of: Vec::new(),
        ..schema.clone()
    };

    for alternative in &schema.all_of {
        let alternative = flatten_at(alternative, path)?;
        merge_all_of(&mut base, &alternative, path)?;
    }

    let alternatives: Vec<&Schema> = schema.one_of.iter().chain(&schema.any_of).collect();
    if !alternatives.is_empty() {
        let merged = merge_alternatives(&alternatives, path)?;
        merge_all_of(&mut base, &merged, path)?;
        base.nullable |= merged.nullable;
    }

    Ok(Cow::Owned(base))
}

/// Merge `other` into `base` as `allOf` does
fn merge_all_of(base: &mut Schema, other: &Schema, path: &str) -> Result<()> {
    match (base.schema_type(), other.schema_type()) {
        (None, Some(_)) => base.type_decl = other.type_decl.clone(),
        (Some(a), Some(b)) if a != b => {
            return Err(Error::IncompatibleCombinator {
                path: path.to_string(),
                reason: format!("type {a} conflicts with {b}"),
            });
        }
        _ => {}
    }

    for (name, prop) in &other.properties {
        base.properties
            .entry(name.clone())
            .or_insert_with(|| prop.clone());
    }
    for name in &other.required {
        if !base.is_required(name) {
            base.required.push(name.clone());
        }
    }
    if base.items.is_none() {
        base.items = other.items.clone();
    }
    if base.default.is_none() {
        base.default = other.default.clone();
    }
    if base.description.is_none() {
        base.description = other.description.clone();
    }
    if base.enum_values.is_empty() {
        base.enum_values = other.enum_values.clone();
    }
    Ok(())
}

/// Collapse `oneOf`/`anyOf` alternatives into a single node
fn merge_alternatives(alternatives: &[&Schema], path: &str) -> Result<Schema> {
    let mut nullable = false;
    let mut concrete = Vec::with_capacity(alternatives.len());
    for alternative in alternatives {
        if alternative.schema_type() == Some(SchemaType::Null) {
            nullable = true;
            continue;
        }
        let flat = flatten_at(alternative, path)?.into_owned();
        nullable |= flat.is_nullable();
        concrete.push(flat);
    }

    let Some(first) = concrete.first() else {
        return Ok(Schema {
            type_decl: Some(TypeDecl::Single(SchemaType::Null)),
            nullable: true,
            ..Schema::default()
        });
    };

    if concrete.len() == 1 {
        let mut only = first.clone();
        only.nullable |= nullable;
        return Ok(only);
    }

    let types: BTreeSet<String> = concrete
        .iter()
        .map(|s| s.schema_type().map_or_else(String::new, |t| t.to_string()))
        .collect();
    if types.len() > 1 {
        return Err(Error::IncompatibleCombinator {
            path: path.to_string(),
            reason: format!(
                "alternatives have different types: {}",
                types.into_iter().collect::<Vec<_>>().join(", ")
            ),
        });
    }

    let mut merged = Schema {
        type_decl: first.type_decl.clone(),
        nullable,
        description: first.description.clone(),
        items: first.items.clone(),
        ..Schema::default()
    };

    if first.schema_type() == Some(SchemaType::Object) {
        for alternative in &concrete {
            for (name, prop) in &alternative.properties {
                if merged.properties.contains_key(name) {
                    continue;
                }
                let mut prop = prop.clone();
                prop.promoted = !concrete
                    .iter()
                    .all(|other| other.properties.contains_key(name));
                merged.properties.insert(name.clone(), prop);
            }
        }
        merged.required = first
            .required
            .iter()
            .filter(|name| concrete.iter().all(|alt| alt.is_required(name)))
            .cloned()
            .collect();
    } else {
        for alternative in &concrete {
            for value in &alternative.enum_values {
                if !merged.enum_values.contains(value) {
                    merged.enum_values.push(value.clone());
                }
            }
        }
        // An alternative without enum accepts anything of the type
        if concrete.iter().any(|alt| alt.enum_values.is_empty()) {
            merged.enum_values.clear();
        }
    }

    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema(value: serde_json::Value) -> Schema {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_plain_schema_is_borrowed() {
        let s = Schema::string();
        assert!(matches!(flatten(&s).unwrap(), Cow::Borrowed(_)));
    }

    #[test]
    fn test_all_of_merges_properties_and_required() {
        let s = schema(json!({
            "allOf": [
                {"type": "object", "properties": {"a": {"type": "string"}}, "required": ["a"]},
                {"type": "object", "properties": {"b": {"type": "integer"}}, "required": ["b"]}
            ]
        }));
        let flat = flatten(&s).unwrap();
        assert_eq!(flat.schema_type(), Some(SchemaType::Object));
        assert_eq!(flat.properties.len(), 2);
        assert!(flat.is_required("a"));
        assert!(flat.is_required("b"));
    }

    #[test]
    fn test_one_of_promotes_partial_properties() {
        let s = schema(json!({
            "oneOf": [
                {"type": "object", "properties": {"id": {"type": "string"}, "cidr": {"type": "string"}}, "required": ["id", "cidr"]},
                {"type": "object", "properties": {"id": {"type": "string"}, "pool": {"type": "string"}}, "required": ["id"]}
            ]
        }));
        let flat = flatten(&s).unwrap();
        assert!(!flat.properties["id"].promoted);
        assert!(flat.properties["cidr"].promoted);
        assert!(flat.properties["pool"].promoted);
        assert_eq!(flat.required, vec!["id".to_string()]);
    }

    #[test]
    fn test_null_alternative_makes_nullable() {
        let s = schema(json!({"anyOf": [{"type": "string"}, {"type": "null"}]}));
        let flat = flatten(&s).unwrap();
        assert_eq!(flat.schema_type(), Some(SchemaType::String));
        assert!(flat.is_nullable());
    }

    #[test]
    fn test_mixed_types_are_rejected() {
        let s = schema(json!({"oneOf": [{"type": "string"}, {"type": "integer"}]}));
        let err = flatten(&s).unwrap_err();
        assert!(matches!(err, Error::IncompatibleCombinator { .. }));
    }

    #[test]
    fn test_scalar_enums_are_unioned() {
        let s = schema(json!({
            "oneOf": [
                {"type": "string", "enum": ["on"]},
                {"type": "string", "enum": ["off"]}
            ]
        }));
        let flat = flatten(&s).unwrap();
        assert_eq!(flat.enum_values, vec![json!("on"), json!("off")]);
    }
}

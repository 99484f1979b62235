//! Structural schema comparison
//!
//! Two flavours are offered: [`compare`] is strict and tells whether two
//! nodes describe exactly the same values, [`similar`] only checks the shape
//! (type, required set, property names, recursively). Neither looks at
//! `title`, `description` or `default`.

use crate::error::{Error, Result, child_path};
use crate::flatten::flatten;
use crate::schema::{Schema, SchemaType};
use std::collections::BTreeSet;

/// Compare two schemas strictly, reporting the first difference
pub fn compare(a: &Schema, b: &Schema) -> Result<()> {
    compare_at(a, b, "$")
}

fn mismatch(path: &str, reason: impl Into<String>) -> Error {
    Error::Mismatch {
        path: path.to_string(),
        reason: reason.into(),
    }
}

fn compare_at(a: &Schema, b: &Schema, path: &str) -> Result<()> {
    let a = flatten(a)?;
    let b = flatten(b)?;

    let (ta, tb) = (a.schema_type(), b.schema_type());
    if ta != tb {
        return Err(mismatch(
            path,
            format!("type {} != {}", type_label(ta.as_ref()), type_label(tb.as_ref())),
        ));
    }
    if a.is_nullable() != b.is_nullable() {
        return Err(mismatch(path, "nullability differs"));
    }
    if !same_set(&a.enum_values, &b.enum_values) {
        return Err(mismatch(path, "enum values differ"));
    }

    match ta {
        Some(SchemaType::Object) => {
            if !same_set(&a.required, &b.required) {
                return Err(mismatch(path, "required properties differ"));
            }
            let keys_a: BTreeSet<_> = a.properties.keys().collect();
            let keys_b: BTreeSet<_> = b.properties.keys().collect();
            if keys_a != keys_b {
                let missing: Vec<_> = keys_a.symmetric_difference(&keys_b).collect();
                return Err(mismatch(path, format!("properties differ: {missing:?}")));
            }
            for (name, prop) in &a.properties {
                compare_at(prop, &b.properties[name], &child_path(path, name))?;
            }
        }
        Some(SchemaType::Array) => match (&a.items, &b.items) {
            (Some(ia), Some(ib)) => compare_at(ia, ib, &child_path(path, "item"))?,
            (None, None) => {}
            _ => return Err(mismatch(path, "only one array declares items")),
        },
        _ => {}
    }
    Ok(())
}

/// Whether two schemas have the same structural shape
///
/// Nullability and enum literals are not part of the shape.
pub fn similar(a: &Schema, b: &Schema) -> bool {
    let (Ok(a), Ok(b)) = (flatten(a), flatten(b)) else {
        return false;
    };

    let ta = a.schema_type();
    if ta != b.schema_type() {
        return false;
    }

    match ta {
        Some(SchemaType::Object) => {
            same_set(&a.required, &b.required)
                && a.properties.len() == b.properties.len()
                && a.properties.iter().all(|(name, prop)| {
                    b.properties
                        .get(name)
                        .is_some_and(|other| similar(prop, other))
                })
        }
        Some(SchemaType::Array) => match (&a.items, &b.items) {
            (Some(ia), Some(ib)) => similar(ia, ib),
            (None, None) => true,
            _ => false,
        },
        _ => true,
    }
}

fn same_set<T: PartialEq>(a: &[T], b: &[T]) -> bool {
    a.len() == b.len() && a.iter().all(|x| b.contains(x))
}

fn type_label(t: Option<&SchemaType>) -> String {
    t.map_or_else(|| "<none>".to_string(), ToString::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_compare_ignores_description_and_default() {
        let a = Schema::string().with_description("the name");
        let b = Schema::string().with_default(json!("x"));
        assert!(compare(&a, &b).is_ok());
    }

    #[test]
    fn test_compare_detects_type_change() {
        let err = compare(&Schema::string(), &Schema::integer()).unwrap_err();
        assert!(err.to_string().contains("string != integer"));
    }

    #[test]
    fn test_compare_nested_path() {
        let a = Schema::object([("machine", Schema::object([("size", Schema::integer())]))]);
        let b = Schema::object([("machine", Schema::object([("size", Schema::string())]))]);
        let err = compare(&a, &b).unwrap_err();
        assert_eq!(err.path(), "$.machine.size");
    }

    #[test]
    fn test_compare_nullability_differs() {
        assert!(compare(&Schema::string(), &Schema::string().nullable()).is_err());
    }

    #[test]
    fn test_similar_ignores_nullable_and_enum() {
        let a = Schema::string().with_enum([json!("a")]);
        let b = Schema::string().nullable();
        assert!(similar(&a, &b));
    }

    #[test]
    fn test_similar_objects_require_same_required_set() {
        let a = Schema::object([("id", Schema::string())]).with_required(["id"]);
        let b = Schema::object([("id", Schema::string())]);
        assert!(!similar(&a, &b));
        assert!(similar(&a, &a.clone()));
    }

    #[test]
    fn test_similar_arrays_compare_items() {
        let a = Schema::array(Schema::string());
        let b = Schema::array(Schema::integer());
        assert!(!similar(&a, &b));
    }
}

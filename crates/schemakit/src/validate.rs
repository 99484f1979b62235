//! Value validation against a schema

use crate::error::{Error, Result, child_path};
use crate::flatten::flatten;
use crate::schema::{Schema, SchemaType};
use serde_json::Value;

/// Check that `value` conforms to `schema`
///
/// Undeclared object keys are accepted; they are simply not looked at.
pub fn validate(schema: &Schema, value: &Value) -> Result<()> {
    validate_at(schema, value, "$")
}

fn invalid(path: &str, reason: impl Into<String>) -> Error {
    Error::Validation {
        path: path.to_string(),
        reason: reason.into(),
    }
}

fn validate_at(schema: &Schema, value: &Value, path: &str) -> Result<()> {
    let schema = flatten(schema)?;

    if value.is_null() {
        if schema.is_nullable() {
            return Ok(());
        }
        return Err(invalid(path, "null is not allowed"));
    }

    if !schema.enum_values.is_empty() && !schema.enum_values.contains(value) {
        return Err(invalid(path, format!("{value} is not one of the enum values")));
    }

    let Some(schema_type) = schema.schema_type() else {
        return Ok(());
    };

    match schema_type {
        SchemaType::String if value.is_string() => Ok(()),
        SchemaType::Number if value.is_number() => Ok(()),
        SchemaType::Integer if is_integral(value) => Ok(()),
        SchemaType::Boolean if value.is_boolean() => Ok(()),
        SchemaType::Array => {
            let Some(items) = value.as_array() else {
                return Err(invalid(path, "expected an array"));
            };
            if let Some(item_schema) = &schema.items {
                for (i, item) in items.iter().enumerate() {
                    validate_at(item_schema, item, &format!("{path}[{i}]"))?;
                }
            }
            Ok(())
        }
        SchemaType::Object => {
            let Some(map) = value.as_object() else {
                return Err(invalid(path, "expected an object"));
            };
            for name in &schema.required {
                if !map.contains_key(name) {
                    return Err(invalid(
                        path,
                        format!("missing required property {name:?}"),
                    ));
                }
            }
            for (name, prop) in &schema.properties {
                if let Some(v) = map.get(name) {
                    validate_at(prop, v, &child_path(path, name))?;
                }
            }
            Ok(())
        }
        SchemaType::Unsupported(name) => Err(Error::UnsupportedType {
            path: path.to_string(),
            type_name: name,
        }),
        other => Err(invalid(path, format!("expected {other}, got {value}"))),
    }
}

/// Integers may arrive as floats without a fractional part
fn is_integral(value: &Value) -> bool {
    value.is_i64()
        || value.is_u64()
        || value.as_f64().is_some_and(|f| f.fract() == 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn server_schema() -> Schema {
        Schema::object([
            ("id", Schema::string()),
            ("size", Schema::integer()),
            ("tags", Schema::array(Schema::string())),
        ])
        .with_required(["id"])
    }

    #[test]
    fn test_validate_accepts_conforming_value() {
        let value = json!({"id": "abc", "size": 3, "tags": ["a"], "extra": true});
        assert!(validate(&server_schema(), &value).is_ok());
    }

    #[test]
    fn test_validate_missing_required() {
        let err = validate(&server_schema(), &json!({"size": 1})).unwrap_err();
        assert!(err.to_string().contains("\"id\""));
    }

    #[test]
    fn test_validate_reports_item_path() {
        let err = validate(&server_schema(), &json!({"id": "a", "tags": ["x", 1]})).unwrap_err();
        assert_eq!(err.path(), "$.tags[1]");
    }

    #[test]
    fn test_validate_integer_as_float() {
        assert!(validate(&Schema::integer(), &json!(2.0)).is_ok());
        assert!(validate(&Schema::integer(), &json!(2.5)).is_err());
    }

    #[test]
    fn test_validate_null() {
        assert!(validate(&Schema::string(), &Value::Null).is_err());
        assert!(validate(&Schema::string().nullable(), &Value::Null).is_ok());
    }

    #[test]
    fn test_validate_enum() {
        let schema = Schema::string().with_enum([json!("on"), json!("off")]);
        assert!(validate(&schema, &json!("on")).is_ok());
        assert!(validate(&schema, &json!("paused")).is_err());
    }
}

//! Conversion between declarative state and executor values
//!
//! State values are typed and tri-state (unknown, null, known); executor
//! values are plain JSON keyed by api name. [`to_internal`] reads state into
//! JSON, [`to_external`] writes JSON back into state with typed nulls.

use crate::attribute::{AttributeInfo, AttributeMap, AttributeTree};
use crate::error::ConversionError;
use declarative::{AttributePath, Parameters, State, StateValue, ValueType};
use schemakit::{Schema, SchemaType};
use serde_json::{Number, Value};

/// Executor-side value read from state
#[derive(Debug, Clone, PartialEq)]
pub enum Internal {
    Known(Value),
    /// Not produced by the server yet
    Unknown,
}

impl Internal {
    pub fn is_known(&self) -> bool {
        matches!(self, Self::Known(_))
    }
}

/// Convert one state value to its executor representation
///
/// With `ignore_unknown`, unknown values are reported as [`Internal::Unknown`]
/// instead of failing. With `filter_unset`, null object properties are left
/// out of the produced map.
pub fn to_internal(
    attr: &AttributeInfo,
    value: &StateValue,
    path: &AttributePath,
    ignore_unknown: bool,
    filter_unset: bool,
) -> Result<Internal, ConversionError> {
    match value {
        StateValue::Unknown(_) if ignore_unknown => return Ok(Internal::Unknown),
        StateValue::Unknown(_) => {
            return Err(ConversionError::UnknownValue { path: path.clone() });
        }
        StateValue::Null(_) => {
            if attr.modifiers.is_required && !attr.is_nullable() {
                return Err(ConversionError::NullNotAllowed { path: path.clone() });
            }
            return Ok(Internal::Known(Value::Null));
        }
        _ => {}
    }

    let mismatch = |expected: &str| ConversionError::TypeMismatch {
        path: path.clone(),
        expected: expected.to_string(),
        found: kind_name(value).to_string(),
    };

    let known = match (attr.schema_type(), value) {
        (Some(SchemaType::String), StateValue::String(s)) => Value::String(s.clone()),
        (Some(SchemaType::Number), StateValue::Number(n)) => Value::Number(
            Number::from_f64(*n).ok_or(ConversionError::LostPrecision {
                path: path.clone(),
                value: *n,
            })?,
        ),
        (Some(SchemaType::Number), StateValue::Integer(i)) => Value::from(*i),
        (Some(SchemaType::Integer), StateValue::Integer(i)) => Value::from(*i),
        (Some(SchemaType::Integer), StateValue::Number(n)) => Value::from(exact_integer(*n, path)?),
        (Some(SchemaType::Boolean), StateValue::Bool(b)) => Value::Bool(*b),
        (Some(SchemaType::Array), StateValue::List(_, items)) => {
            return array_to_internal(attr, items, path, ignore_unknown, filter_unset);
        }
        (Some(SchemaType::Object), StateValue::Object(fields)) => {
            let mut map = serde_json::Map::new();
            for child in attr.children.values() {
                let child_path = path.attribute(child.external_name.clone());
                let Some(child_value) = fields.get(&child.external_name) else {
                    if child.modifiers.is_required {
                        return Err(ConversionError::MissingRequired { path: child_path });
                    }
                    continue;
                };
                match to_internal(child, child_value, &child_path, ignore_unknown, filter_unset)? {
                    Internal::Unknown => {}
                    Internal::Known(Value::Null) if filter_unset => {}
                    Internal::Known(v) => {
                        map.insert(child.api_name.clone(), v);
                    }
                }
            }
            Value::Object(map)
        }
        (Some(t), _) => return Err(mismatch(t.name())),
        (None, _) => return Err(mismatch("a typed schema")),
    };
    Ok(Internal::Known(known))
}

fn array_to_internal(
    attr: &AttributeInfo,
    items: &[StateValue],
    path: &AttributePath,
    ignore_unknown: bool,
    filter_unset: bool,
) -> Result<Internal, ConversionError> {
    let Some(item_attr) = attr.item() else {
        return Err(ConversionError::MissingAttribute {
            path: path.clone(),
            property: crate::attribute::ITEM_KEY.to_string(),
        });
    };

    let mut converted = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        match to_internal(item_attr, item, &path.index(i), ignore_unknown, filter_unset)? {
            // A partially known list cannot be sent
            Internal::Unknown => {
                log::debug!("{path}: item {i} is unknown, treating the whole list as unknown");
                return Ok(Internal::Unknown);
            }
            Internal::Known(v) => converted.push(v),
        }
    }
    Ok(Internal::Known(Value::Array(converted)))
}

fn exact_integer(n: f64, path: &AttributePath) -> Result<i64, ConversionError> {
    if n.fract() == 0.0 && n >= i64::MIN as f64 && n <= i64::MAX as f64 {
        Ok(n as i64)
    } else {
        Err(ConversionError::LostPrecision {
            path: path.clone(),
            value: n,
        })
    }
}

fn kind_name(value: &StateValue) -> &'static str {
    match value {
        StateValue::Unknown(_) => "unknown",
        StateValue::Null(_) => "null",
        StateValue::String(_) => "string",
        StateValue::Number(_) => "number",
        StateValue::Integer(_) => "integer",
        StateValue::Bool(_) => "boolean",
        StateValue::List(..) => "array",
        StateValue::Object(_) => "object",
    }
}

fn json_kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Write an executor value into `target` at `path`
///
/// Nulls are written typed after the attribute's schema.
pub fn to_external(
    value: &Value,
    attr: &AttributeInfo,
    target: &mut State,
    path: &AttributePath,
) -> Result<(), ConversionError> {
    if value.is_null() {
        return set(target, path, StateValue::Null(attr.value_type()));
    }

    let mismatch = |expected: &str| ConversionError::TypeMismatch {
        path: path.clone(),
        expected: expected.to_string(),
        found: json_kind_name(value).to_string(),
    };

    match (attr.schema_type(), value) {
        (Some(SchemaType::String), Value::String(s)) => {
            set(target, path, StateValue::String(s.clone()))
        }
        (Some(SchemaType::Number), Value::Number(n)) => {
            let n = n.as_f64().ok_or_else(|| mismatch("number"))?;
            set(target, path, StateValue::Number(n))
        }
        (Some(SchemaType::Integer), Value::Number(n)) => {
            let i = match n.as_i64() {
                Some(i) => i,
                None => exact_integer(n.as_f64().ok_or_else(|| mismatch("integer"))?, path)?,
            };
            set(target, path, StateValue::Integer(i))
        }
        (Some(SchemaType::Boolean), Value::Bool(b)) => set(target, path, StateValue::Bool(*b)),
        (Some(SchemaType::Array), Value::Array(items)) => {
            let Some(item_attr) = attr.item() else {
                return Err(ConversionError::MissingAttribute {
                    path: path.clone(),
                    property: crate::attribute::ITEM_KEY.to_string(),
                });
            };
            set(target, path, StateValue::List(item_attr.value_type(), Vec::new()))?;
            for (i, item) in items.iter().enumerate() {
                to_external(item, item_attr, target, &path.index(i))?;
            }
            Ok(())
        }
        (Some(SchemaType::Object), Value::Object(map)) => {
            let ValueType::Object(fields) = attr.value_type() else {
                return Err(mismatch("object"));
            };
            set(target, path, StateValue::null_fields(&fields))?;
            for (key, child_value) in map {
                let Some(child) = attr.children.get(key) else {
                    log::debug!("{path}: ignoring undeclared property {key:?}");
                    continue;
                };
                to_external(
                    child_value,
                    child,
                    target,
                    &path.attribute(child.external_name.clone()),
                )?;
            }
            Ok(())
        }
        (Some(t), _) => Err(mismatch(t.name())),
        (None, _) => Err(mismatch("a typed schema")),
    }
}

fn set(target: &mut State, path: &AttributePath, value: StateValue) -> Result<(), ConversionError> {
    target.set(path, value).map_err(|e| ConversionError::State {
        path: path.clone(),
        reason: e.to_string(),
    })
}

/// Read the parameters described by `schema` out of `state`
///
/// Unknown and null values are left out, so the executor only receives
/// what is actually set. Properties without attribute information are
/// skipped unless the schema requires them, and a property the schema
/// requires must have a value.
pub fn load_parameters(
    schema: &Schema,
    tree: &AttributeTree,
    state: &State,
) -> Result<Parameters, ConversionError> {
    let schema = schemakit::flatten(schema).map_err(|e| ConversionError::State {
        path: AttributePath::root(),
        reason: e.to_string(),
    })?;

    let mut parameters = Parameters::new();
    for name in schema.properties.keys() {
        let required = schema.is_required(name);
        let Some(attr) = tree.lookup(name) else {
            if required {
                return Err(ConversionError::MissingAttribute {
                    path: AttributePath::root().attribute(name.clone()),
                    property: name.clone(),
                });
            }
            log::debug!("no attribute information for parameter {name:?}, skipping");
            continue;
        };

        let path = AttributePath::root().attribute(attr.external_name.clone());
        let Some(value) = state.get_attribute(&attr.external_name) else {
            if required || attr.modifiers.is_required {
                return Err(ConversionError::MissingRequired { path });
            }
            continue;
        };

        match to_internal(attr, value, &path, true, true)? {
            Internal::Unknown if required => {
                return Err(ConversionError::UnknownValue { path });
            }
            Internal::Known(Value::Null) if required => {
                return Err(ConversionError::MissingRequired { path });
            }
            Internal::Unknown | Internal::Known(Value::Null) => {}
            Internal::Known(v) => {
                parameters.insert(name.clone(), v);
            }
        }
    }
    Ok(parameters)
}

/// Merge an executor result into `target`
///
/// Every property of the result with attribute information in `attributes`
/// overwrites its state slot; other properties are ignored.
pub fn apply_result(
    value: &Value,
    attributes: &AttributeMap,
    target: &mut State,
) -> Result<(), ConversionError> {
    let map = match value {
        Value::Null => return Ok(()),
        Value::Object(map) => map,
        other => {
            return Err(ConversionError::TypeMismatch {
                path: AttributePath::root(),
                expected: "object".to_string(),
                found: json_kind_name(other).to_string(),
            });
        }
    };

    for (api_name, attr) in attributes {
        let Some(v) = map.get(api_name) else {
            continue;
        };
        let path = AttributePath::root().attribute(attr.external_name.clone());
        to_external(v, attr, target, &path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::{ITEM_KEY, Modifiers};
    use serde_json::json;
    use std::collections::BTreeMap;

    fn attr(name: &str, schema: Schema) -> AttributeInfo {
        let children = match schema.schema_type() {
            Some(SchemaType::Object) => schema
                .properties
                .iter()
                .map(|(k, s)| {
                    let mut child = attr(k, s.clone());
                    child.modifiers.is_required = schema.is_required(k);
                    (k.clone(), child)
                })
                .collect(),
            Some(SchemaType::Array) => schema
                .items
                .as_deref()
                .map(|items| BTreeMap::from([(ITEM_KEY.to_string(), attr(ITEM_KEY, items.clone()))]))
                .unwrap_or_default(),
            _ => AttributeMap::new(),
        };
        AttributeInfo {
            api_name: name.to_string(),
            external_name: crate::names::to_external_name(name),
            schema,
            modifiers: Modifiers::default(),
            children,
            current_counterpart: None,
        }
    }

    fn root(name: &str) -> AttributePath {
        AttributePath::root().attribute(name)
    }

    fn round_trip(a: &AttributeInfo, value: &Value) -> Value {
        let mut state = State::new();
        to_external(value, a, &mut state, &root(&a.external_name)).unwrap();
        let stored = state.get_attribute(&a.external_name).unwrap();
        match to_internal(a, stored, &root(&a.external_name), false, false).unwrap() {
            Internal::Known(v) => v,
            Internal::Unknown => panic!("value should be known"),
        }
    }

    #[test]
    fn test_scalars_round_trip() {
        assert_eq!(round_trip(&attr("name", Schema::string()), &json!("web")), json!("web"));
        assert_eq!(round_trip(&attr("size", Schema::integer()), &json!(4)), json!(4));
        assert_eq!(round_trip(&attr("ratio", Schema::number()), &json!(0.5)), json!(0.5));
        assert_eq!(round_trip(&attr("on", Schema::boolean()), &json!(true)), json!(true));
    }

    #[test]
    fn test_nested_round_trip() {
        let rule = Schema::object([("port", Schema::integer()), ("cidrBlock", Schema::string())]);
        let a = attr("rules", Schema::array(rule));
        let value = json!([{"port": 22, "cidrBlock": "10.0.0.0/8"}, {"port": 443, "cidrBlock": "0.0.0.0/0"}]);
        assert_eq!(round_trip(&a, &value), value);

        let mut state = State::new();
        to_external(&value, &a, &mut state, &root("rules")).unwrap();
        let cidr = root("rules").index(1).attribute("cidr_block");
        assert_eq!(state.get(&cidr), Some(&StateValue::from("0.0.0.0/0")));
    }

    #[test]
    fn test_null_is_typed() {
        let mut state = State::new();
        to_external(&Value::Null, &attr("name", Schema::string()), &mut state, &root("name")).unwrap();
        assert_eq!(
            state.get_attribute("name"),
            Some(&StateValue::Null(ValueType::String))
        );

        let machine = attr("machine", Schema::object([("size", Schema::integer())]));
        to_external(&Value::Null, &machine, &mut state, &root("machine")).unwrap();
        assert_eq!(
            state.get_attribute("machine"),
            Some(&StateValue::Null(ValueType::Object(BTreeMap::from([(
                "size".to_string(),
                ValueType::Integer
            )]))))
        );
    }

    #[test]
    fn test_type_mismatch() {
        let err = to_internal(
            &attr("size", Schema::integer()),
            &StateValue::from("big"),
            &root("size"),
            false,
            false,
        )
        .unwrap_err();
        assert!(matches!(err, ConversionError::TypeMismatch { .. }));

        let mut state = State::new();
        let err = to_external(&json!("big"), &attr("size", Schema::integer()), &mut state, &root("size"))
            .unwrap_err();
        assert_eq!(err.path(), &root("size"));
    }

    #[test]
    fn test_integer_from_fractional_number_loses_precision() {
        let err = to_internal(
            &attr("size", Schema::integer()),
            &StateValue::Number(1.5),
            &root("size"),
            false,
            false,
        )
        .unwrap_err();
        assert!(matches!(err, ConversionError::LostPrecision { .. }));
    }

    #[test]
    fn test_unknown_handling() {
        let a = attr("id", Schema::string());
        let unknown = StateValue::Unknown(ValueType::String);
        assert_eq!(
            to_internal(&a, &unknown, &root("id"), true, false).unwrap(),
            Internal::Unknown
        );
        assert!(matches!(
            to_internal(&a, &unknown, &root("id"), false, false),
            Err(ConversionError::UnknownValue { .. })
        ));

        let tags = attr("tags", Schema::array(Schema::string()));
        let partial = StateValue::List(
            ValueType::String,
            vec!["a".into(), StateValue::Unknown(ValueType::String)],
        );
        assert_eq!(
            to_internal(&tags, &partial, &root("tags"), true, false).unwrap(),
            Internal::Unknown
        );
    }

    #[test]
    fn test_null_for_required_non_nullable() {
        let mut a = attr("name", Schema::string());
        a.modifiers.is_required = true;
        let null = StateValue::Null(ValueType::String);
        assert!(matches!(
            to_internal(&a, &null, &root("name"), false, false),
            Err(ConversionError::NullNotAllowed { .. })
        ));

        a.schema = Schema::string().nullable();
        assert_eq!(
            to_internal(&a, &null, &root("name"), false, false).unwrap(),
            Internal::Known(Value::Null)
        );
    }

    #[test]
    fn test_object_missing_properties() {
        let machine = attr(
            "machine",
            Schema::object([("size", Schema::integer()), ("zone", Schema::string())])
                .with_required(["size"]),
        );
        let only_zone = StateValue::Object(BTreeMap::from([("zone".to_string(), "a".into())]));
        assert!(matches!(
            to_internal(&machine, &only_zone, &root("machine"), false, false),
            Err(ConversionError::MissingRequired { .. })
        ));

        let only_size = StateValue::Object(BTreeMap::from([
            ("size".to_string(), 2.into()),
            ("zone".to_string(), StateValue::Null(ValueType::String)),
        ]));
        assert_eq!(
            to_internal(&machine, &only_size, &root("machine"), false, true).unwrap(),
            Internal::Known(json!({"size": 2}))
        );
        assert_eq!(
            to_internal(&machine, &only_size, &root("machine"), false, false).unwrap(),
            Internal::Known(json!({"size": 2, "zone": null}))
        );
    }

    #[test]
    fn test_load_parameters_skips_unset() {
        let mut tree = AttributeTree::default();
        let mut name = attr("name", Schema::string());
        name.modifiers.is_required = true;
        tree.input.insert("name".into(), name);
        tree.input.insert("size".into(), attr("size", Schema::integer()));
        tree.input.insert("id".into(), attr("id", Schema::string()));

        let state: State = [
            ("name", StateValue::from("web")),
            ("size", StateValue::Null(ValueType::Integer)),
            ("id", StateValue::Unknown(ValueType::String)),
        ]
        .into_iter()
        .collect();
        let schema = Schema::object([
            ("name", Schema::string()),
            ("size", Schema::integer()),
            ("id", Schema::string()),
            ("expand", Schema::string()),
        ]);

        let params = load_parameters(&schema, &tree, &state).unwrap();
        assert_eq!(Value::Object(params), json!({"name": "web"}));

        let err = load_parameters(&schema, &tree, &State::new()).unwrap_err();
        assert!(matches!(err, ConversionError::MissingRequired { .. }));
    }

    #[test]
    fn test_load_parameters_requires_what_the_schema_requires() {
        let mut tree = AttributeTree::default();
        let mut id = attr("vm_instance_id", Schema::string());
        id.external_name = "id".into();
        id.modifiers.is_optional = true;
        tree.input.insert("vm_instance_id".into(), id);

        let schema =
            Schema::object([("vm_instance_id", Schema::string())]).with_required(["vm_instance_id"]);

        let state: State = [("id", StateValue::from("vm-1"))].into_iter().collect();
        let params = load_parameters(&schema, &tree, &state).unwrap();
        assert_eq!(Value::Object(params), json!({"vm_instance_id": "vm-1"}));

        let err = load_parameters(&schema, &tree, &State::new()).unwrap_err();
        assert!(matches!(err, ConversionError::MissingRequired { .. }));
        assert_eq!(err.path().to_string(), "id");

        let unknown: State = [("id", StateValue::Unknown(ValueType::String))]
            .into_iter()
            .collect();
        let err = load_parameters(&schema, &tree, &unknown).unwrap_err();
        assert!(matches!(err, ConversionError::UnknownValue { .. }));

        let null: State = [("id", StateValue::Null(ValueType::String))].into_iter().collect();
        let err = load_parameters(&schema, &tree, &null).unwrap_err();
        assert!(matches!(err, ConversionError::MissingRequired { .. }));
    }

    #[test]
    fn test_missing_attribute_names_the_parameter() {
        let schema = Schema::object([("action", Schema::string())]).with_required(["action"]);
        let err = load_parameters(&schema, &AttributeTree::default(), &State::new()).unwrap_err();
        assert!(matches!(err, ConversionError::MissingAttribute { .. }));
        assert!(err.to_string().starts_with("action: "), "{err}");
    }

    #[test]
    fn test_apply_result_ignores_unknown_properties() {
        let mut attributes = AttributeMap::new();
        attributes.insert("status".into(), attr("status", Schema::string()));
        attributes.insert("createdAt".into(), attr("createdAt", Schema::string()));

        let mut target: State = [("name", StateValue::from("web"))].into_iter().collect();
        apply_result(
            &json!({"status": "running", "createdAt": "today", "extra": 1}),
            &attributes,
            &mut target,
        )
        .unwrap();

        assert_eq!(target.get_attribute("status"), Some(&StateValue::from("running")));
        assert_eq!(target.get_attribute("created_at"), Some(&StateValue::from("today")));
        assert_eq!(target.get_attribute("name"), Some(&StateValue::from("web")));
        assert!(target.get_attribute("extra").is_none());
    }
}

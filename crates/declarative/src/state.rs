//! Typed, path-addressable resource state
//!
//! State values distinguish "not yet known" from "known to be null", and
//! both carry the static type of the slot they occupy so a host can always
//! reconstruct a well-typed document.

use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::fmt;

/// Static type of a state slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueType {
    String,
    Number,
    Integer,
    Bool,
    List(Box<ValueType>),
    Object(BTreeMap<String, ValueType>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum StateValue {
    /// Value to be produced by the server
    Unknown(ValueType),
    /// Known absence of a value
    Null(ValueType),
    String(String),
    Number(f64),
    Integer(i64),
    Bool(bool),
    List(ValueType, Vec<StateValue>),
    Object(BTreeMap<String, StateValue>),
}

impl StateValue {
    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown(_))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null(_))
    }

    /// Object with every field set to a typed null
    pub fn null_fields(fields: &BTreeMap<String, ValueType>) -> Self {
        Self::Object(
            fields
                .iter()
                .map(|(k, t)| (k.clone(), Self::Null(t.clone())))
                .collect(),
        )
    }

    /// Replace every nested unknown with a typed null, returning how many were replaced
    pub fn replace_unknowns(&mut self) -> usize {
        match self {
            Self::Unknown(t) => {
                *self = Self::Null(t.clone());
                1
            }
            Self::List(_, items) => items.iter_mut().map(Self::replace_unknowns).sum(),
            Self::Object(fields) => fields.values_mut().map(Self::replace_unknowns).sum(),
            _ => 0,
        }
    }

    /// Whether the value contains any unknown, at any depth
    pub fn contains_unknown(&self) -> bool {
        match self {
            Self::Unknown(_) => true,
            Self::List(_, items) => items.iter().any(Self::contains_unknown),
            Self::Object(fields) => fields.values().any(Self::contains_unknown),
            _ => false,
        }
    }
}

impl From<&str> for StateValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for StateValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for StateValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for StateValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<bool> for StateValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathStep {
    Attribute(String),
    Index(usize),
}

/// Location of a value inside a [`State`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributePath(Vec<PathStep>);

impl AttributePath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn attribute(&self, name: impl Into<String>) -> Self {
        let mut steps = self.0.clone();
        steps.push(PathStep::Attribute(name.into()));
        Self(steps)
    }

    pub fn index(&self, index: usize) -> Self {
        let mut steps = self.0.clone();
        steps.push(PathStep::Index(index));
        Self(steps)
    }

    pub fn steps(&self) -> &[PathStep] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for AttributePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.0.iter().enumerate() {
            match step {
                PathStep::Attribute(name) if i == 0 => write!(f, "{name}")?,
                PathStep::Attribute(name) => write!(f, ".{name}")?,
                PathStep::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

/// Top-level attributes of one resource instance
#[derive(Debug, Clone, Default, PartialEq)]
pub struct State {
    attributes: BTreeMap<String, StateValue>,
}

impl State {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&String, &StateValue)> {
        self.attributes.iter()
    }

    pub fn get_attribute(&self, name: &str) -> Option<&StateValue> {
        self.attributes.get(name)
    }

    pub fn set_attribute(&mut self, name: impl Into<String>, value: StateValue) {
        self.attributes.insert(name.into(), value);
    }

    pub fn remove_attribute(&mut self, name: &str) -> Option<StateValue> {
        self.attributes.remove(name)
    }

    /// Value at `path`, if every step along it exists
    pub fn get(&self, path: &AttributePath) -> Option<&StateValue> {
        let (first, rest) = path.steps().split_first()?;
        let PathStep::Attribute(name) = first else {
            return None;
        };
        let mut current = self.attributes.get(name)?;
        for step in rest {
            current = match (step, current) {
                (PathStep::Attribute(name), StateValue::Object(fields)) => fields.get(name)?,
                (PathStep::Index(i), StateValue::List(_, items)) => items.get(*i)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Write `value` at `path`
    ///
    /// Top-level attributes are created on demand. Intermediate containers
    /// must exist, either materialized or as a typed null/unknown which is
    /// then materialized. A list index may address one past the end.
    pub fn set(&mut self, path: &AttributePath, value: StateValue) -> Result<()> {
        let Some((first, rest)) = path.steps().split_first() else {
            return Err(state_error(path, "cannot replace the state root"));
        };
        let PathStep::Attribute(name) = first else {
            return Err(state_error(path, "path must start with an attribute"));
        };

        if rest.is_empty() {
            self.attributes.insert(name.clone(), value);
            return Ok(());
        }
        let Some(slot) = self.attributes.get_mut(name) else {
            return Err(state_error(path, "parent attribute does not exist"));
        };
        set_in(slot, rest, value, path)
    }

    /// Replace every unknown with a typed null, returning how many were replaced
    pub fn replace_unknowns(&mut self) -> usize {
        self.attributes
            .values_mut()
            .map(StateValue::replace_unknowns)
            .sum()
    }
}

impl<K: Into<String>> FromIterator<(K, StateValue)> for State {
    fn from_iter<I: IntoIterator<Item = (K, StateValue)>>(iter: I) -> Self {
        Self {
            attributes: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

fn state_error(path: &AttributePath, reason: &str) -> Error {
    Error::State {
        path: path.to_string(),
        reason: reason.to_string(),
    }
}

fn set_in(
    slot: &mut StateValue,
    rest: &[PathStep],
    value: StateValue,
    path: &AttributePath,
) -> Result<()> {
    let Some((step, tail)) = rest.split_first() else {
        *slot = value;
        return Ok(());
    };

    materialize(slot);

    match (step, slot) {
        (PathStep::Attribute(name), StateValue::Object(fields)) => {
            if tail.is_empty() {
                fields.insert(name.clone(), value);
                return Ok(());
            }
            let Some(child) = fields.get_mut(name) else {
                return Err(state_error(path, "parent attribute does not exist"));
            };
            set_in(child, tail, value, path)
        }
        (PathStep::Index(i), StateValue::List(element, items)) => {
            if *i == items.len() {
                items.push(StateValue::Null(element.clone()));
            }
            let Some(child) = items.get_mut(*i) else {
                return Err(state_error(path, "list index out of range"));
            };
            set_in(child, tail, value, path)
        }
        _ => Err(state_error(path, "parent is not a container")),
    }
}

/// Turn a typed null/unknown container into an empty materialized one
fn materialize(slot: &mut StateValue) {
    let ty = match slot {
        StateValue::Null(t) | StateValue::Unknown(t) => t.clone(),
        _ => return,
    };
    match ty {
        ValueType::Object(fields) => *slot = StateValue::null_fields(&fields),
        ValueType::List(element) => *slot = StateValue::List(*element, Vec::new()),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn machine_type() -> ValueType {
        ValueType::Object(BTreeMap::from([
            ("size".to_string(), ValueType::Integer),
            ("zone".to_string(), ValueType::String),
        ]))
    }

    #[test]
    fn test_set_and_get_top_level() {
        let mut state = State::new();
        let path = AttributePath::root().attribute("name");
        state.set(&path, "web".into()).unwrap();
        assert_eq!(state.get(&path), Some(&StateValue::from("web")));
    }

    #[test]
    fn test_set_materializes_typed_null_object() {
        let mut state = State::new();
        state.set_attribute("machine", StateValue::Null(machine_type()));

        let size = AttributePath::root().attribute("machine").attribute("size");
        state.set(&size, 3.into()).unwrap();

        assert_eq!(state.get(&size), Some(&StateValue::Integer(3)));
        let zone = AttributePath::root().attribute("machine").attribute("zone");
        assert_eq!(state.get(&zone), Some(&StateValue::Null(ValueType::String)));
    }

    #[test]
    fn test_set_appends_list_items() {
        let mut state = State::new();
        state.set_attribute("tags", StateValue::List(ValueType::String, Vec::new()));
        let tags = AttributePath::root().attribute("tags");
        state.set(&tags.index(0), "a".into()).unwrap();
        state.set(&tags.index(1), "b".into()).unwrap();
        assert!(state.set(&tags.index(5), "c".into()).is_err());
        assert_eq!(state.get(&tags.index(1)), Some(&StateValue::from("b")));
    }

    #[test]
    fn test_set_missing_parent_fails() {
        let mut state = State::new();
        let path = AttributePath::root().attribute("machine").attribute("size");
        let err = state.set(&path, 1.into()).unwrap_err();
        assert!(err.to_string().contains("machine.size"));
    }

    #[test]
    fn test_replace_unknowns_keeps_types() {
        let mut state: State = [
            ("id", StateValue::Unknown(ValueType::String)),
            ("name", StateValue::from("web")),
        ]
        .into_iter()
        .collect();
        assert_eq!(state.replace_unknowns(), 1);
        assert_eq!(
            state.get_attribute("id"),
            Some(&StateValue::Null(ValueType::String))
        );
    }

    #[test]
    fn test_path_display() {
        let path = AttributePath::root().attribute("rules").index(2).attribute("port");
        assert_eq!(path.to_string(), "rules[2].port");
    }
}

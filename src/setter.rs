//! Property setters - side-channel calls that change one attribute
//!
//! Links named `set-<attribute>` (optionally `set-<attribute>/<variant>`)
//! are setter candidates. Besides the parameter named after the attribute,
//! which carries the desired value, a link declares zero, one or two extra
//! parameters, which decides how the setter is picked:
//!
//! | extra parameters            | setter       |
//! |-----------------------------|--------------|
//! | none                        | `Default`    |
//! | one enum                    | `Enum`       |
//! | two enums, `from*`/`to*`    | `Transition` |
//!
//! Anything else is left unresolved, which makes the attribute
//! replace-on-change.

use crate::error::{ClassificationError, PropertySetterError};
use declarative::{Linker, Links, Parameters};
use schemakit::Schema;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

const SETTER_PREFIX: &str = "set-";

/// Link to call, with the extra parameters that select its behavior
#[derive(Debug, Clone)]
pub struct SetterTarget {
    pub link: String,
    pub linker: Arc<dyn Linker>,
    pub parameters: Parameters,
}

impl SetterTarget {
    /// Whether the link parameter `name` is filled in without reading state
    pub fn fills(&self, attribute: &str, name: &str) -> bool {
        name == attribute || self.parameters.contains_key(name)
    }

    /// Link parameters that are read from the planned state
    pub fn state_parameters_schema(&self, attribute: &str) -> Schema {
        let mut schema = self.linker.additional_parameters_schema().clone();
        schema.properties.retain(|name, _| !self.fills(attribute, name));
        schema.required.retain(|name| !self.fills(attribute, name));
        schema
    }
}

#[derive(Debug, Clone)]
pub enum PropertySetter {
    /// Called whenever the value changes
    Default(SetterTarget),
    /// One link per target value
    Enum(BTreeMap<String, SetterTarget>),
    /// One link per `(current, target)` pair
    Transition(BTreeMap<(String, String), SetterTarget>),
}

impl PropertySetter {
    /// Every distinct link this setter may call
    pub fn targets(&self) -> Vec<&SetterTarget> {
        let all: Vec<&SetterTarget> = match self {
            Self::Default(entry) => vec![entry],
            Self::Enum(entries) => entries.values().collect(),
            Self::Transition(entries) => entries.values().collect(),
        };
        let mut seen = BTreeSet::new();
        all.into_iter()
            .filter(|target| seen.insert(target.link.as_str()))
            .collect()
    }

    /// Link able to move `attribute` from `current` to `target`
    pub fn resolve(
        &self,
        attribute: &str,
        current: &Value,
        target: &Value,
    ) -> Result<SetterTarget, PropertySetterError> {
        match self {
            Self::Default(entry) => Ok(entry.clone()),
            Self::Enum(entries) => entries.get(&literal_key(target)).cloned().ok_or_else(|| {
                PropertySetterError::MissingTarget {
                    attribute: attribute.to_string(),
                    target: target.to_string(),
                }
            }),
            Self::Transition(entries) => entries
                .get(&(literal_key(current), literal_key(target)))
                .cloned()
                .ok_or_else(|| PropertySetterError::MissingTransition {
                    attribute: attribute.to_string(),
                    from: current.to_string(),
                    to: target.to_string(),
                }),
        }
    }
}

/// Map key of an enum literal
fn literal_key(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Api names of the attributes with a setter
pub type SetterMap = BTreeMap<String, PropertySetter>;

struct Candidate {
    link: String,
    linker: Arc<dyn Linker>,
    extra: Vec<(String, Schema)>,
}

/// Attribute a setter link name refers to
fn setter_attribute(link: &str) -> Option<String> {
    let rest = link.strip_prefix(SETTER_PREFIX)?;
    let attribute = rest.split('/').next().unwrap_or(rest);
    (!attribute.is_empty()).then(|| attribute.replace('-', "_"))
}

/// Build the setters declared by `links`
///
/// Links of one attribute must agree on their number of extra parameters.
pub fn resolve_property_setters(
    resource: &str,
    links: &Links,
) -> Result<SetterMap, ClassificationError> {
    let mut candidates: BTreeMap<String, Vec<Candidate>> = BTreeMap::new();
    for (link, linker) in links {
        let Some(attribute) = setter_attribute(link) else {
            continue;
        };
        let extra = linker
            .additional_parameters_schema()
            .properties
            .iter()
            .filter(|(name, _)| **name != attribute)
            .map(|(name, schema)| (name.clone(), schema.clone()))
            .collect();
        candidates.entry(attribute).or_default().push(Candidate {
            link: link.clone(),
            linker: linker.clone(),
            extra,
        });
    }

    let mut setters = SetterMap::new();
    for (attribute, group) in candidates {
        let counts: BTreeSet<usize> = group.iter().map(|c| c.extra.len()).collect();
        if counts.len() > 1 {
            return Err(ClassificationError::SetterArity {
                resource: resource.to_string(),
                attribute,
                counts: counts.into_iter().collect(),
            });
        }

        let setter = match counts.first().copied().unwrap_or(0) {
            0 => default_setter(group),
            1 => enum_setter(group),
            2 => transition_setter(group),
            n => {
                log::debug!("{resource}: setters for {attribute:?} take {n} parameters, ignoring");
                None
            }
        };
        match setter {
            Some(setter) => {
                log::debug!("{resource}: {attribute:?} has a property setter");
                setters.insert(attribute, setter);
            }
            None => log::debug!("{resource}: no usable setter for {attribute:?}"),
        }
    }
    Ok(setters)
}

fn default_setter(group: Vec<Candidate>) -> Option<PropertySetter> {
    let candidate = group.into_iter().next()?;
    Some(PropertySetter::Default(SetterTarget {
        link: candidate.link,
        linker: candidate.linker,
        parameters: Parameters::new(),
    }))
}

fn enum_setter(group: Vec<Candidate>) -> Option<PropertySetter> {
    let mut entries = BTreeMap::new();
    for candidate in group {
        let Some((param, schema)) = candidate.extra.first() else {
            continue;
        };
        if schema.enum_values.is_empty() {
            return None;
        }
        for literal in &schema.enum_values {
            let mut parameters = Parameters::new();
            parameters.insert(param.clone(), literal.clone());
            entries
                .entry(literal_key(literal))
                .or_insert_with(|| SetterTarget {
                    link: candidate.link.clone(),
                    linker: candidate.linker.clone(),
                    parameters,
                });
        }
    }
    (!entries.is_empty()).then_some(PropertySetter::Enum(entries))
}

fn is_from_param(name: &str) -> bool {
    let name = name.to_lowercase();
    name.starts_with("from") || name.starts_with("current")
}

fn is_to_param(name: &str) -> bool {
    let name = name.to_lowercase();
    name.starts_with("to") || name.starts_with("target")
}

fn transition_setter(group: Vec<Candidate>) -> Option<PropertySetter> {
    let mut entries = BTreeMap::new();
    for candidate in group {
        let from = candidate.extra.iter().find(|(name, _)| is_from_param(name))?;
        let to = candidate.extra.iter().find(|(name, _)| is_to_param(name))?;
        if from.1.enum_values.is_empty() || to.1.enum_values.is_empty() {
            return None;
        }

        for from_literal in &from.1.enum_values {
            for to_literal in &to.1.enum_values {
                let mut parameters = Parameters::new();
                parameters.insert(from.0.clone(), from_literal.clone());
                parameters.insert(to.0.clone(), to_literal.clone());
                entries
                    .entry((literal_key(from_literal), literal_key(to_literal)))
                    .or_insert_with(|| SetterTarget {
                        link: candidate.link.clone(),
                        linker: candidate.linker.clone(),
                        parameters,
                    });
            }
        }
    }
    (!entries.is_empty()).then_some(PropertySetter::Transition(entries))
}

//! Attribute naming
//!
//! Api names come straight from the operation schemas and may be camelCase
//! or kebab-case. External names are always snake_case.

use regex::Regex;
use std::sync::LazyLock;

/// Prefix of the output-only twin of a split attribute
pub const CURRENT_PREFIX: &str = "current_";

static ACRONYM_BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([A-Z]+)([A-Z][a-z])").expect("valid regex"));

static WORD_BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([a-z0-9])([A-Z])").expect("valid regex"));

/// snake_case form of an api name
pub fn to_external_name(api_name: &str) -> String {
    let name = ACRONYM_BOUNDARY.replace_all(api_name, "${1}_${2}");
    let name = WORD_BOUNDARY.replace_all(&name, "${1}_${2}");
    name.replace(['-', ' ', '.'], "_").to_lowercase()
}

/// External name of the output-only twin of `name`
pub fn current_name(name: &str) -> String {
    format!("{CURRENT_PREFIX}{name}")
}

/// Naive singular of a resource name (`vm_instances` → `vm_instance`)
pub fn singular(resource_name: &str) -> &str {
    resource_name.strip_suffix('s').unwrap_or(resource_name)
}

/// Names `api_name` may stand for once the resource prefix is removed
///
/// For `vm_instances`, `vm_instance_id` yields `id`. The underscore-free
/// spelling is tried too, so `vminstanceid` also yields `id`. Callers keep
/// the first candidate that actually names a resource property.
pub fn resource_prefix_candidates(resource_name: &str, api_name: &str) -> Vec<String> {
    let singular = singular(resource_name);
    let mut candidates = Vec::new();
    if let Some(rest) = api_name
        .strip_prefix(singular)
        .and_then(|rest| rest.strip_prefix('_'))
        .filter(|rest| !rest.is_empty())
    {
        candidates.push(rest.to_string());
    }

    let compact = api_name.replace('_', "");
    let compact_singular = singular.replace('_', "");
    if let Some(rest) = compact
        .strip_prefix(&compact_singular)
        .filter(|rest| !rest.is_empty())
    {
        if !candidates.iter().any(|c| c == rest) {
            candidates.push(rest.to_string());
        }
    }
    candidates
}

/// `<x>` for a `new_<x>` parameter
pub fn strip_new_prefix(api_name: &str) -> Option<&str> {
    api_name.strip_prefix("new_").filter(|rest| !rest.is_empty())
}

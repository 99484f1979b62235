//! Schema classification - operation schemas to attribute tree
//!
//! Each source schema is walked in a fixed order (create, update, delete
//! parameters for inputs; create, read results for outputs) and every
//! property not seen yet gets modifiers from the rule of its source. The
//! first source to declare a property wins.
//!
//! Once both maps exist, inputs and outputs sharing an external name are
//! compared. When their schemas differ, the output is renamed to
//! `current_<name>` so the desired and the observed value can live side by
//! side.

use crate::attribute::{AttributeInfo, AttributeMap, AttributeTree, ITEM_KEY, Modifiers};
use crate::error::ClassificationError;
use crate::names::{current_name, resource_prefix_candidates, strip_new_prefix, to_external_name};
use schemakit::{Schema, SchemaType, compare, flatten, similar};
use std::collections::BTreeSet;

/// Result properties the server may change on its own
const UPDATABLE_BY_SERVER: &[&str] = &["error", "updated_at", "updated"];

/// Result properties the server never changes after creation
const NOT_UPDATABLE_BY_SERVER: &[&str] = &["created_at"];

/// Schemas of one resource type's operations
pub struct ClassifierInput<'a> {
    pub create_params: &'a Schema,
    pub update_params: &'a Schema,
    pub delete_params: &'a Schema,
    pub read_params: &'a Schema,
    pub create_result: &'a Schema,
    pub read_result: &'a Schema,
    /// Api names of attributes that have a property setter
    pub setters: BTreeSet<String>,
    /// Parameters setter links read from state
    pub setter_params: Vec<Schema>,
    /// Results of setter links
    pub setter_results: Vec<Schema>,
}

/// Which rule computes the modifiers of a property
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source {
    CreateParams,
    UpdateParams,
    DeleteParams,
    Result,
    NestedInput,
    NestedResult,
}

impl Source {
    fn child(self) -> Self {
        match self {
            Self::Result | Self::NestedResult => Self::NestedResult,
            _ => Self::NestedInput,
        }
    }
}

struct Classifier<'a> {
    resource: &'a str,
    update_params: Schema,
    read_params: Schema,
    create_result: Schema,
    read_result: Schema,
    setters: &'a BTreeSet<String>,
}

/// Build the attribute tree of `resource` from its operation schemas
pub fn build_attribute_tree(
    resource: &str,
    input: &ClassifierInput<'_>,
) -> Result<AttributeTree, ClassificationError> {
    let flat = |schema: &Schema| {
        flatten(schema)
            .map(std::borrow::Cow::into_owned)
            .map_err(|source| ClassificationError::Schema {
                resource: resource.to_string(),
                attribute: String::new(),
                source,
            })
    };

    let classifier = Classifier {
        resource,
        update_params: flat(input.update_params)?,
        read_params: flat(input.read_params)?,
        create_result: flat(input.create_result)?,
        read_result: flat(input.read_result)?,
        setters: &input.setters,
    };

    let mut tree = AttributeTree::default();
    classifier.add_properties(&mut tree.input, input.create_params, Source::CreateParams, "")?;
    classifier.add_properties(&mut tree.input, input.update_params, Source::UpdateParams, "")?;
    classifier.add_properties(&mut tree.input, input.delete_params, Source::DeleteParams, "")?;
    for schema in &input.setter_params {
        classifier.add_properties(&mut tree.input, schema, Source::UpdateParams, "")?;
    }
    classifier.add_properties(&mut tree.output, input.create_result, Source::Result, "")?;
    classifier.add_properties(&mut tree.output, input.read_result, Source::Result, "")?;
    for schema in &input.setter_results {
        classifier.add_properties(&mut tree.output, schema, Source::Result, "")?;
    }

    classifier.split_incompatible(&mut tree)?;

    log::debug!(
        "{resource}: built {} input and {} output attribute(s)",
        tree.input.len(),
        tree.output.len()
    );
    Ok(tree)
}

impl Classifier<'_> {
    fn has_update_param(&self, name: &str) -> bool {
        self.update_params.properties.contains_key(name)
    }

    fn has_read_param(&self, name: &str) -> bool {
        self.read_params.properties.contains_key(name)
    }

    fn in_create_result(&self, name: &str) -> bool {
        self.create_result.properties.contains_key(name)
    }

    /// Whether the value can change after creation without replacing the resource
    fn is_updatable(&self, name: &str) -> bool {
        self.setters.contains(name) || (self.has_update_param(name) && !self.has_read_param(name))
    }

    /// Create result property a resource-prefixed parameter refers to
    fn resource_override(&self, name: &str) -> Option<String> {
        resource_prefix_candidates(self.resource, name)
            .into_iter()
            .find(|candidate| self.in_create_result(candidate))
    }

    fn update_modifiers(&self, parent: &Schema, name: &str) -> Modifiers {
        let is_required = parent.is_required(name);
        let mut is_computed = self.in_create_result(name);
        let name_override = match self.resource_override(name) {
            Some(identifier) => {
                is_computed = true;
                Some(identifier)
            }
            None => strip_new_prefix(name)
                .filter(|rest| self.read_result.properties.contains_key(*rest))
                .map(ToString::to_string),
        };
        Modifiers {
            is_required: is_required && !is_computed,
            is_optional: !is_required && !is_computed,
            is_computed: !is_required || is_computed,
            use_state_for_unknown: true,
            name_override,
            ..Modifiers::default()
        }
    }

    fn modifiers(&self, source: Source, parent: &Schema, name: &str) -> Modifiers {
        let is_required = parent.is_required(name);
        match source {
            Source::CreateParams => {
                let is_computed = !is_required
                    && match (self.read_result.property(name), parent.property(name)) {
                        (Some(read), Some(created)) => similar(read, created),
                        _ => false,
                    };
                let has_default = parent.property(name).is_some_and(|p| p.default.is_some());
                Modifiers {
                    is_required,
                    is_optional: !is_required,
                    is_computed,
                    requires_replace: !self.is_updatable(name) && !has_default,
                    ..Modifiers::default()
                }
            }
            Source::UpdateParams => self.update_modifiers(parent, name),
            // The server does not echo delete parameters back, so they can
            // never be required
            Source::DeleteParams if self.has_read_param(name) || self.has_update_param(name) => {
                Modifiers {
                    is_required: false,
                    is_optional: true,
                    ..self.update_modifiers(parent, name)
                }
            }
            Source::DeleteParams => {
                let name_override = self.resource_override(name);
                Modifiers {
                    is_optional: true,
                    is_computed: self.in_create_result(name) || name_override.is_some(),
                    use_state_for_unknown: true,
                    name_override,
                    ..Modifiers::default()
                }
            }
            Source::Result => {
                let is_optional = self.is_updatable(name);
                let external = to_external_name(name);
                let use_state_for_unknown = (is_optional
                    || NOT_UPDATABLE_BY_SERVER.contains(&external.as_str()))
                    && !UPDATABLE_BY_SERVER.contains(&external.as_str());
                Modifiers {
                    is_optional,
                    is_computed: true,
                    use_state_for_unknown,
                    ignore_default: true,
                    ..Modifiers::default()
                }
            }
            Source::NestedInput => Modifiers {
                is_required,
                is_optional: !is_required,
                use_state_for_unknown: true,
                ..Modifiers::default()
            },
            Source::NestedResult => Modifiers {
                is_computed: true,
                ..Modifiers::default()
            },
        }
    }

    fn add_properties(
        &self,
        dst: &mut AttributeMap,
        schema: &Schema,
        source: Source,
        path: &str,
    ) -> Result<(), ClassificationError> {
        let parent = flatten(schema).map_err(|e| self.schema_error(path, e))?;

        for (api_name, prop) in &parent.properties {
            let attr_path = join(path, api_name);

            if let Some(existing) = dst.get(api_name) {
                if let Err(e) = compare(&existing.schema, prop) {
                    log::warn!(
                        "{}: {attr_path} declared differently by another operation, keeping the first: {e}",
                        self.resource
                    );
                }
                continue;
            }

            let mut modifiers = self.modifiers(source, &parent, api_name);
            if prop.promoted {
                modifiers.is_required = false;
                if !modifiers.is_computed {
                    modifiers.is_optional = true;
                }
            }

            let attr = self.build_attribute(api_name, prop, modifiers, source.child(), &attr_path)?;

            if let Some(alias) = dst
                .values()
                .find(|other| other.external_name == attr.external_name)
            {
                if compare(&alias.schema, &attr.schema).is_err() {
                    return Err(ClassificationError::Conflict {
                        resource: self.resource.to_string(),
                        external_name: attr.external_name,
                        first: alias.api_name.clone(),
                        second: api_name.clone(),
                    });
                }
            }

            dst.insert(api_name.clone(), attr);
        }
        Ok(())
    }

    fn build_attribute(
        &self,
        api_name: &str,
        schema: &Schema,
        modifiers: Modifiers,
        child_source: Source,
        path: &str,
    ) -> Result<AttributeInfo, ClassificationError> {
        let schema = flatten(schema)
            .map_err(|e| self.schema_error(path, e))?
            .into_owned();
        let external_name = modifiers
            .name_override
            .clone()
            .unwrap_or_else(|| to_external_name(api_name));

        let mut children = AttributeMap::new();
        match schema.schema_type() {
            None => {
                return Err(ClassificationError::MissingType {
                    resource: self.resource.to_string(),
                    attribute: path.to_string(),
                });
            }
            Some(SchemaType::Unsupported(type_name)) => {
                return Err(ClassificationError::UnsupportedType {
                    resource: self.resource.to_string(),
                    attribute: path.to_string(),
                    type_name,
                });
            }
            Some(SchemaType::Null) => {
                return Err(ClassificationError::UnsupportedType {
                    resource: self.resource.to_string(),
                    attribute: path.to_string(),
                    type_name: "null".to_string(),
                });
            }
            Some(SchemaType::Array) => {
                let Some(items) = schema.items.as_deref() else {
                    return Err(ClassificationError::MissingItems {
                        resource: self.resource.to_string(),
                        attribute: path.to_string(),
                    });
                };
                let item_modifiers = self.modifiers(child_source, &schema, ITEM_KEY);
                let item = self.build_attribute(
                    ITEM_KEY,
                    items,
                    item_modifiers,
                    child_source,
                    &join(path, ITEM_KEY),
                )?;
                children.insert(ITEM_KEY.to_string(), item);
            }
            Some(SchemaType::Object) => {
                self.add_properties(&mut children, &schema, child_source, path)?;
            }
            Some(_) => {}
        }

        Ok(AttributeInfo {
            api_name: api_name.to_string(),
            external_name,
            schema,
            modifiers,
            children,
            current_counterpart: None,
        })
    }

    /// Rename outputs whose schema disagrees with the input of the same name
    fn split_incompatible(&self, tree: &mut AttributeTree) -> Result<(), ClassificationError> {
        let mut splits = Vec::new();
        for (input_key, input) in &tree.input {
            let Some((output_key, output)) = tree
                .output
                .iter()
                .find(|(_, o)| o.external_name == input.external_name)
            else {
                continue;
            };
            if let Err(e) = compare(&input.schema, &output.schema) {
                log::debug!(
                    "{}: splitting {:?} into desired and current values: {e}",
                    self.resource,
                    input.external_name
                );
                splits.push((input_key.clone(), output_key.clone()));
            }
        }

        for (input_key, output_key) in splits {
            let Some(output) = tree.output.get(&output_key) else {
                continue;
            };
            let renamed = current_name(&output.external_name);

            if let Some(taken) = tree
                .input
                .values()
                .chain(tree.output.values())
                .find(|attr| attr.external_name == renamed)
            {
                return Err(ClassificationError::Conflict {
                    resource: self.resource.to_string(),
                    external_name: renamed,
                    first: taken.api_name.clone(),
                    second: output_key,
                });
            }

            if let Some(output) = tree.output.get_mut(&output_key) {
                output.external_name = renamed;
                output.modifiers.is_optional = false;
                output.modifiers.use_state_for_unknown = false;
            }
            if let Some(input) = tree.input.get_mut(&input_key) {
                input.current_counterpart = Some(output_key);
            }
        }
        Ok(())
    }

    fn schema_error(&self, path: &str, source: schemakit::Error) -> ClassificationError {
        ClassificationError::Schema {
            resource: self.resource.to_string(),
            attribute: path.to_string(),
            source,
        }
    }
}

fn join(path: &str, name: &str) -> String {
    if path.is_empty() {
        name.to_string()
    } else {
        format!("{path}.{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema(value: serde_json::Value) -> Schema {
        serde_json::from_value(value).unwrap()
    }

    struct Schemas {
        create_params: Schema,
        update_params: Schema,
        delete_params: Schema,
        read_params: Schema,
        create_result: Schema,
        read_result: Schema,
        setters: BTreeSet<String>,
        setter_params: Vec<Schema>,
    }

    impl Default for Schemas {
        fn default() -> Self {
            Self {
                create_params: Schema::empty_object(),
                update_params: Schema::empty_object(),
                delete_params: Schema::empty_object(),
                read_params: Schema::empty_object(),
                create_result: Schema::empty_object(),
                read_result: Schema::empty_object(),
                setters: BTreeSet::new(),
                setter_params: Vec::new(),
            }
        }
    }

    impl Schemas {
        fn build(&self) -> Result<AttributeTree, ClassificationError> {
            build_attribute_tree(
                "vm_instances",
                &ClassifierInput {
                    create_params: &self.create_params,
                    update_params: &self.update_params,
                    delete_params: &self.delete_params,
                    read_params: &self.read_params,
                    create_result: &self.create_result,
                    read_result: &self.read_result,
                    setters: self.setters.clone(),
                    setter_params: self.setter_params.clone(),
                    setter_results: Vec::new(),
                },
            )
        }
    }

    #[test]
    fn test_create_required_params() {
        let tree = Schemas {
            create_params: Schema::object([("name", Schema::string()), ("size", Schema::integer())])
                .with_required(["name"]),
            ..Schemas::default()
        }
        .build()
        .unwrap();

        let name = &tree.input["name"].modifiers;
        assert!(name.is_required);
        assert!(!name.is_optional);
        let size = &tree.input["size"].modifiers;
        assert!(!size.is_required);
        assert!(size.is_optional);
        assert!(!size.is_computed);
        assert!(size.requires_replace);
    }

    #[test]
    fn test_create_param_computed_when_read_has_similar() {
        let tree = Schemas {
            create_params: Schema::object([("zone", Schema::string())]),
            read_result: Schema::object([("zone", Schema::string().with_description("az"))]),
            ..Schemas::default()
        }
        .build()
        .unwrap();
        assert!(tree.input["zone"].modifiers.is_computed);
        assert!(tree.input["zone"].modifiers.is_optional);
    }

    #[test]
    fn test_create_param_with_default_or_update_is_not_replaced() {
        let tree = Schemas {
            create_params: Schema::object([
                ("name", Schema::string()),
                ("tier", Schema::string().with_default(json!("basic"))),
            ]),
            update_params: Schema::object([("name", Schema::string())]),
            ..Schemas::default()
        }
        .build()
        .unwrap();
        assert!(!tree.input["name"].modifiers.requires_replace);
        assert!(!tree.input["tier"].modifiers.requires_replace);
    }

    #[test]
    fn test_update_name_overrides() {
        let tree = Schemas {
            update_params: Schema::object([
                ("vm_instance_id", Schema::string()),
                ("new_name", Schema::string()),
                ("new_color", Schema::string()),
            ])
            .with_required(["vm_instance_id"]),
            create_result: Schema::object([("id", Schema::string())]),
            read_result: Schema::object([("name", Schema::string())]),
            ..Schemas::default()
        }
        .build()
        .unwrap();

        let id = &tree.input["vm_instance_id"];
        assert_eq!(id.external_name, "id");
        assert!(id.modifiers.is_computed);
        assert!(!id.modifiers.is_required && !id.modifiers.is_optional);
        assert_eq!(tree.input["new_name"].external_name, "name");
        // nothing named `color` is ever read back
        assert_eq!(tree.input["new_color"].external_name, "new_color");
    }

    #[test]
    fn test_resource_prefix_needs_create_result_property() {
        let tree = Schemas {
            update_params: Schema::object([
                ("vm_instance_id", Schema::string()),
                ("vminstancename", Schema::string()),
            ])
            .with_required(["vm_instance_id"]),
            create_result: Schema::object([("name", Schema::string())]),
            ..Schemas::default()
        }
        .build()
        .unwrap();

        let id = &tree.input["vm_instance_id"];
        assert_eq!(id.external_name, "vm_instance_id");
        assert!(id.modifiers.is_required);
        assert_eq!(tree.input["vminstancename"].external_name, "name");
    }

    #[test]
    fn test_delete_params_are_optional() {
        let tree = Schemas {
            delete_params: Schema::object([("id", Schema::string())]).with_required(["id"]),
            create_result: Schema::object([("id", Schema::string())]),
            ..Schemas::default()
        }
        .build()
        .unwrap();

        let id = &tree.input["id"].modifiers;
        assert!(id.is_optional);
        assert!(!id.is_required);
        assert!(id.is_computed);
    }

    #[test]
    fn test_delete_params_with_resource_prefix() {
        let tree = Schemas {
            delete_params: Schema::object([("vm_instance_id", Schema::string())])
                .with_required(["vm_instance_id"]),
            create_result: Schema::object([("id", Schema::string())]),
            ..Schemas::default()
        }
        .build()
        .unwrap();

        let id = &tree.input["vm_instance_id"];
        assert_eq!(id.external_name, "id");
        assert!(id.modifiers.is_optional && id.modifiers.is_computed);
        assert!(!id.modifiers.is_required);
    }

    #[test]
    fn test_delete_params_shared_with_read_follow_update_rule() {
        let tree = Schemas {
            read_params: Schema::object([("force", Schema::boolean())]),
            delete_params: Schema::object([
                ("force", Schema::boolean()),
                ("vm_instance_id", Schema::string()),
            ]),
            create_result: Schema::object([("id", Schema::string())]),
            ..Schemas::default()
        }
        .build()
        .unwrap();

        // update rule: an optional parameter is also computed
        let force = &tree.input["force"].modifiers;
        assert!(force.is_optional && force.is_computed && !force.is_required);
        assert_eq!(tree.input["vm_instance_id"].external_name, "id");
    }

    #[test]
    fn test_setter_link_parameters_become_inputs() {
        let tree = Schemas {
            create_params: Schema::object([("name", Schema::string())]).with_required(["name"]),
            setter_params: vec![
                Schema::object([("name", Schema::integer()), ("reason", Schema::string())])
                    .with_required(["reason"]),
            ],
            ..Schemas::default()
        }
        .build()
        .unwrap();

        // create declared `name` first
        assert!(tree.input["name"].modifiers.is_required);
        let reason = &tree.input["reason"].modifiers;
        assert!(reason.is_required && reason.use_state_for_unknown);
    }

    #[test]
    fn test_first_source_wins() {
        let tree = Schemas {
            create_params: Schema::object([("name", Schema::string())]).with_required(["name"]),
            delete_params: Schema::object([("name", Schema::string())]),
            ..Schemas::default()
        }
        .build()
        .unwrap();
        assert!(tree.input["name"].modifiers.is_required);
    }

    #[test]
    fn test_identical_results_are_not_split() {
        let status = Schema::object([("id", Schema::string()), ("status", Schema::string())]);
        let tree = Schemas {
            create_params: Schema::object([("status", Schema::string())]),
            create_result: status.clone(),
            read_result: status,
            ..Schemas::default()
        }
        .build()
        .unwrap();

        assert_eq!(tree.output.len(), 2);
        assert!(tree.input["status"].current_counterpart.is_none());
        assert!(tree.find_external("current_status").is_none());
    }

    #[test]
    fn test_incompatible_input_and_output_are_split() {
        let tree = Schemas {
            create_params: Schema::object([("image", Schema::string())]).with_required(["image"]),
            read_result: Schema::object([(
                "image",
                Schema::object([("id", Schema::string()), ("name", Schema::string())]),
            )]),
            ..Schemas::default()
        }
        .build()
        .unwrap();

        let input = &tree.input["image"];
        assert_eq!(input.external_name, "image");
        assert_eq!(input.current_counterpart.as_deref(), Some("image"));

        let current = tree.counterpart(input).unwrap();
        assert_eq!(current.external_name, "current_image");
        assert!(current.modifiers.is_computed);
        assert!(!current.modifiers.is_optional);
        assert!(!current.modifiers.use_state_for_unknown);
    }

    #[test]
    fn test_result_modifiers() {
        let tree = Schemas {
            update_params: Schema::object([("name", Schema::string())]),
            read_result: Schema::object([
                ("name", Schema::string()),
                ("created_at", Schema::string()),
                ("updated_at", Schema::string()),
                ("power", Schema::string()),
            ]),
            setters: BTreeSet::from(["power".to_string()]),
            ..Schemas::default()
        }
        .build()
        .unwrap();

        let power = &tree.output["power"].modifiers;
        assert!(power.is_optional && power.is_computed && power.use_state_for_unknown);
        assert!(tree.output["created_at"].modifiers.use_state_for_unknown);
        assert!(!tree.output["updated_at"].modifiers.use_state_for_unknown);
        assert!(tree.output["name"].modifiers.is_optional);
        assert!(tree.output["name"].modifiers.ignore_default);
    }

    #[test]
    fn test_nested_children_and_array_items() {
        let tree = Schemas {
            create_params: schema(json!({
                "type": "object",
                "properties": {
                    "network": {
                        "type": "object",
                        "properties": {
                            "vpc": {"type": "string"},
                            "ports": {"type": "array", "items": {"type": "integer"}}
                        },
                        "required": ["vpc"]
                    }
                }
            })),
            read_result: schema(json!({
                "type": "object",
                "properties": {"network": {"type": "object", "properties": {"vpc": {"type": "string"}}}}
            })),
            ..Schemas::default()
        }
        .build()
        .unwrap();

        let network = &tree.input["network"];
        let vpc = &network.children["vpc"].modifiers;
        assert!(vpc.is_required && !vpc.is_computed && vpc.use_state_for_unknown);
        let ports = &network.children["ports"];
        assert!(ports.children[ITEM_KEY].modifiers.is_optional);

        let read_vpc = &tree.output["network"].children["vpc"].modifiers;
        assert!(read_vpc.is_computed && !read_vpc.is_optional);
    }

    #[test]
    fn test_promoted_properties_become_optional() {
        let tree = Schemas {
            create_params: schema(json!({
                "anyOf": [
                    {"type": "object", "properties": {"name": {"type": "string"}, "cidr": {"type": "string"}}, "required": ["name", "cidr"]},
                    {"type": "object", "properties": {"name": {"type": "string"}, "pool": {"type": "string"}}, "required": ["name", "pool"]}
                ]
            })),
            ..Schemas::default()
        }
        .build()
        .unwrap();
        assert!(tree.input["name"].modifiers.is_required);
        let cidr = &tree.input["cidr"].modifiers;
        assert!(!cidr.is_required && cidr.is_optional);
    }

    #[test]
    fn test_unsupported_type_is_fatal() {
        let err = Schemas {
            create_params: schema(json!({"type": "object", "properties": {"blob": {"type": "file"}}})),
            ..Schemas::default()
        }
        .build()
        .unwrap_err();
        assert!(matches!(
            err,
            ClassificationError::UnsupportedType { ref type_name, .. } if type_name == "file"
        ));
    }

    #[test]
    fn test_conflicting_external_names() {
        let err = Schemas {
            create_params: Schema::object([("name", Schema::string())]),
            update_params: Schema::object([("new_name", Schema::integer())]),
            ..Schemas::default()
        }
        .build()
        .unwrap_err();
        assert!(matches!(err, ClassificationError::Conflict { .. }));
    }
}

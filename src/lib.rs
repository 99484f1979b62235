//! # Restform
//!
//! Map REST resources described only by the schemas of their operations onto
//! a declarative infrastructure resource model.
//!
//! Given executors for create, read, update and delete (and optionally list),
//! a [`RestResource`]:
//!
//! - Derives an attribute tree with required/optional/computed modifiers
//!   from the parameter and result schemas
//! - Exposes that tree as a typed [`HostSchema`]
//! - Drives the lifecycle through the `declarative` operation runner,
//!   reconciling planned values with what the server reports
//!
//! ## Example
//!
//! ```ignore
//! use restform::{ResourceOperations, RestResource, Settings};
//!
//! let settings = Arc::new(Settings::load(Path::new("provider.toml"))?);
//! let ops = ResourceOperations::new(create, delete)
//!     .with_read(read)
//!     .with_update(update);
//! let vm = RestResource::new("vm_instances", "Virtual machine", ops, settings)?;
//!
//! let response = vm.create(&vm.context(), &State::new(), &planned).await;
//! if !response.is_success() {
//!     for diagnostic in response.diagnostics.iter() {
//!         eprintln!("{diagnostic}");
//!     }
//! }
//! ```

pub mod attribute;
pub mod classifier;
pub mod config;
pub mod convert;
pub mod error;
pub mod host_schema;
pub mod names;
pub mod operations;
pub mod read_from_list;
pub mod registry;
pub mod resource;
pub mod setter;

pub use attribute::{AttributeInfo, AttributeMap, AttributeTree, Modifiers};
pub use classifier::{ClassifierInput, build_attribute_tree};
pub use config::Settings;
pub use convert::{Internal, to_external, to_internal};
pub use error::{ClassificationError, ConversionError, Error, PropertySetterError, Result};
pub use host_schema::{HostAttribute, HostAttributeKind, HostSchema, generate_host_schema};
pub use read_from_list::ReadFromListExecutor;
pub use registry::ResourceRegistry;
pub use resource::{
    LifecycleResponse, LifecycleStep, ResourceModel, ResourceOperations, RestResource,
};
pub use setter::{PropertySetter, SetterTarget, resolve_property_setters};

pub use declarative;
pub use schemakit;

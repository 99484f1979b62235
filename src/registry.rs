//! Registry of the resource types a provider exposes

use crate::error::{ClassificationError, Error, Result};
use crate::resource::RestResource;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Default)]
pub struct ResourceRegistry {
    resources: BTreeMap<String, Arc<RestResource>>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a resource; names must be unique
    pub fn register(&mut self, resource: RestResource) -> Result<()> {
        let name = resource.name().to_string();
        if self.resources.contains_key(&name) {
            return Err(Error::Registration {
                resource: name,
                reason: "already registered".to_string(),
            });
        }
        log::debug!("registered resource {name}");
        self.resources.insert(name, Arc::new(resource));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<RestResource>> {
        self.resources.get(name).cloned()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.resources.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Build every resource model in parallel
    ///
    /// Resources whose schemas cannot be classified are unregistered; their
    /// errors are returned keyed by resource name.
    pub fn validate(&mut self) -> BTreeMap<String, ClassificationError> {
        let failures: BTreeMap<String, ClassificationError> = self
            .resources
            .par_iter()
            .filter_map(|(name, resource)| resource.model().err().map(|e| (name.clone(), e)))
            .collect();

        for (name, e) in &failures {
            log::warn!("unregistering {name}: {e}");
            self.resources.remove(name);
        }
        failures
    }
}

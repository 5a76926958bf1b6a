//! Frozen service registry
//!
//! A [`Registry`] is what the collection phase produces and what a
//! [`ServiceContainer`](crate::ServiceContainer) is built from. It is never
//! mutated after it has been frozen; cloning one is cheap.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::descriptor::TypeDescriptor;
use crate::error::{ContainerError, ContainerResult};
use crate::factory::ErasedFactory;
use crate::key::{Instance, ServiceKey};
use crate::resolver::ArgumentResolver;

pub(crate) type Upcast = Arc<dyn Fn(Instance) -> ContainerResult<Instance> + Send + Sync>;

/// Alias from an abstract key to the key that provides it.
#[derive(Clone)]
pub(crate) struct Binding {
    pub(crate) target: ServiceKey,
    pub(crate) upcast: Upcast,
}

#[derive(Clone, Default)]
pub struct Registry {
    pub(crate) bindings: HashMap<ServiceKey, Binding>,
    pub(crate) factories: HashMap<ServiceKey, ErasedFactory>,
    pub(crate) resolvers: Vec<(ServiceKey, Arc<dyn ArgumentResolver>)>,
    pub(crate) scoped: HashSet<ServiceKey>,
    pub(crate) not_shared: HashSet<ServiceKey>,
    pub(crate) not_autowired: HashSet<ServiceKey>,
    pub(crate) descriptors: HashMap<ServiceKey, TypeDescriptor>,
}

impl Registry {
    pub fn alias_target(&self, key: ServiceKey) -> Option<ServiceKey> {
        self.bindings.get(&key).map(|binding| binding.target)
    }

    pub fn has_factory(&self, key: ServiceKey) -> bool {
        self.factories.contains_key(&key)
    }

    pub fn is_shared(&self, key: ServiceKey) -> bool {
        !self.not_shared.contains(&key)
    }

    pub fn is_scoped(&self, key: ServiceKey) -> bool {
        self.scoped.contains(&key)
    }

    pub fn is_autowired(&self, key: ServiceKey) -> bool {
        !self.not_autowired.contains(&key)
    }

    pub fn descriptor(&self, key: ServiceKey) -> Option<&TypeDescriptor> {
        self.descriptors.get(&key)
    }

    /// Marker keys with a resolver, in selection order.
    pub fn resolver_markers(&self) -> Vec<ServiceKey> {
        self.resolvers.iter().map(|(marker, _)| *marker).collect()
    }

    /// Fails when following aliases from any key leads back to a visited key.
    pub fn check_aliases(&self) -> ContainerResult<()> {
        let mut starts: Vec<&ServiceKey> = self.bindings.keys().collect();
        starts.sort();

        for start in starts {
            let mut chain = vec![*start];
            let mut current = *start;

            while let Some(target) = self.alias_target(current) {
                if chain.contains(&target) {
                    chain.push(target);
                    return Err(ContainerError::CircularAlias { chain });
                }
                chain.push(target);
                current = target;
            }
        }

        Ok(())
    }

    /// Mark the final target of every scoped alias as scoped too.
    ///
    /// Aliases are never cached themselves, so their instances live under the
    /// target key. Requires an alias graph without loops.
    pub(crate) fn propagate_scope(&mut self) {
        let targets: Vec<ServiceKey> = self
            .scoped
            .iter()
            .filter_map(|key| {
                let mut current = self.alias_target(*key)?;
                while let Some(target) = self.alias_target(current) {
                    current = target;
                }
                Some(current)
            })
            .collect();

        self.scoped.extend(targets);
    }

    /// Serializable summary of the registry, sorted for stable output.
    pub fn manifest(&self) -> RegistryManifest {
        RegistryManifest {
            aliases: self
                .bindings
                .iter()
                .map(|(key, binding)| (key.name().to_string(), binding.target.name().to_string()))
                .collect(),
            factories: sorted_names(self.factories.keys()),
            not_shared: sorted_names(self.not_shared.iter()),
            not_autowired: sorted_names(self.not_autowired.iter()),
            scoped: sorted_names(self.scoped.iter()),
            resolvers: self
                .resolvers
                .iter()
                .map(|(marker, _)| marker.name().to_string())
                .collect(),
            autowirable: sorted_names(
                self.descriptors
                    .values()
                    .filter(|descriptor| descriptor.is_constructible())
                    .map(|descriptor| descriptor.key())
                    .collect::<Vec<_>>()
                    .iter(),
            ),
        }
    }
}

fn sorted_names<'a>(keys: impl Iterator<Item = &'a ServiceKey>) -> Vec<String> {
    let mut names: Vec<String> = keys.map(|key| key.name().to_string()).collect();
    names.sort();
    names
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("bindings", &self.bindings.len())
            .field("factories", &self.factories.len())
            .field("resolvers", &self.resolvers.len())
            .field("scoped", &self.scoped)
            .field("not_shared", &self.not_shared)
            .field("not_autowired", &self.not_autowired)
            .field("descriptors", &self.descriptors.len())
            .finish()
    }
}

/// Type-name summary of a [`Registry`], written to the cache directory for
/// diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryManifest {
    pub aliases: BTreeMap<String, String>,
    pub factories: Vec<String>,
    pub not_shared: Vec<String>,
    pub not_autowired: Vec<String>,
    pub scoped: Vec<String>,
    pub resolvers: Vec<String>,
    pub autowirable: Vec<String>,
}

impl RegistryManifest {
    pub fn to_json(&self) -> ContainerResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| ContainerError::invalid_argument("manifest", e.to_string()))
    }

    pub fn from_json(json: &str) -> ContainerResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| ContainerError::invalid_argument("manifest", e.to_string()))
    }
}

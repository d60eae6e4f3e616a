//! Provider capability interface
//!
//! Providers are the engine's only window onto the host: the transaction
//! asks a provider what a resource currently looks like (`retrieve`),
//! drives single properties toward their desired values (`sync`), and
//! pokes subscribed resources after their dependencies change
//! (`refresh`). All three must be idempotent; the rollback path calls
//! `sync` again with recorded prior values.

use crate::error::ProviderError;
use crate::spec::ResourceSpec;
use crate::value::Value;
use std::collections::{BTreeMap, HashMap};

/// Observed property values of a live resource.
///
/// Missing keys mean the property has no current value (for example,
/// `content` of a file that does not exist).
pub type CurrentState = BTreeMap<String, Value>;

/// Synchronization capability for one resource type.
pub trait Provider {
    /// The resource type this provider handles, lowercase.
    fn type_name(&self) -> &'static str;

    /// Observe the current state of the resource's properties.
    fn retrieve(&self, spec: &ResourceSpec) -> Result<CurrentState, ProviderError>;

    /// Drive one property to the desired value. Syncing a property to
    /// `Undef` is a no-op unless the provider documents otherwise.
    fn sync(&self, spec: &ResourceSpec, property: &str, desired: &Value)
        -> Result<(), ProviderError>;

    /// React to a subscribed-to resource having changed. Default: nothing.
    fn refresh(&self, _spec: &ResourceSpec) -> Result<(), ProviderError> {
        Ok(())
    }
}

/// The set of providers available to a transaction, keyed by type name.
#[derive(Default)]
pub struct ProviderSet {
    providers: HashMap<String, Box<dyn Provider>>,
}

impl ProviderSet {
    /// An empty provider set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Providers for the built-in `file` and `exec` types.
    pub fn builtin() -> Self {
        let mut set = Self::new();
        set.register(Box::new(crate::file::FileProvider));
        set.register(Box::new(crate::exec::ExecProvider));
        set
    }

    pub fn register(&mut self, provider: Box<dyn Provider>) {
        self.providers
            .insert(provider.type_name().to_string(), provider);
    }

    pub fn get(&self, type_name: &str) -> Option<&dyn Provider> {
        self.providers
            .get(&type_name.to_lowercase())
            .map(|p| p.as_ref())
    }
}

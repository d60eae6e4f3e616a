//! Static type metadata
//!
//! The registry is the single source of truth for what a resource type
//! looks like: its synchronizable properties (in sync order), its
//! parameters, its namevar, and property default values. It is populated
//! at startup and only read afterwards; both the evaluator (validation)
//! and the transaction (sync decisions) query it.

use std::collections::HashMap;

/// Metaparameters recognized on every resource type.
pub const METAPARAMETERS: &[&str] = &["tag", "before", "require", "subscribe", "alias"];

/// Whether a name is a universal metaparameter.
pub fn is_metaparameter(name: &str) -> bool {
    METAPARAMETERS.contains(&name)
}

/// Metadata for one resource type. Immutable after registration.
#[derive(Debug, Clone)]
pub struct TypeMetadata {
    /// Type name, lowercase
    pub name: String,
    /// The parameter the title binds to
    pub namevar: String,
    /// Synchronizable state names, in the order they are synced
    pub properties: Vec<String>,
    /// Plain parameters (namevar included)
    pub parameters: Vec<String>,
    /// Default values merged in when a property is not declared,
    /// e.g. exec's `returns => 0`
    pub defaults: Vec<(String, String)>,
}

impl TypeMetadata {
    pub fn new(
        name: impl Into<String>,
        namevar: impl Into<String>,
        properties: &[&str],
        parameters: &[&str],
    ) -> Self {
        Self {
            name: name.into().to_lowercase(),
            namevar: namevar.into(),
            properties: properties.iter().map(|s| s.to_string()).collect(),
            parameters: parameters.iter().map(|s| s.to_string()).collect(),
            defaults: Vec::new(),
        }
    }

    /// Add a property default applied when the manifest omits it.
    pub fn with_default(mut self, property: &str, value: &str) -> Self {
        self.defaults.push((property.to_string(), value.to_string()));
        self
    }

    /// Whether `name` is a valid property or parameter of this type.
    pub fn has_attribute(&self, name: &str) -> bool {
        self.is_property(name) || self.parameters.iter().any(|p| p == name) || self.namevar == name
    }

    /// Whether `name` is a synchronizable property.
    pub fn is_property(&self, name: &str) -> bool {
        self.properties.iter().any(|p| p == name)
    }
}

/// Lookup table of registered resource types. Keys are lowercase, so
/// `File` and `file` name the same type.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    types: HashMap<String, TypeMetadata>,
}

impl TypeRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the built-in `file` and `exec` types.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(crate::file::FileProvider::metadata());
        registry.register(crate::exec::ExecProvider::metadata());
        registry
    }

    pub fn register(&mut self, metadata: TypeMetadata) {
        self.types.insert(metadata.name.clone(), metadata);
    }

    pub fn get(&self, name: &str) -> Option<&TypeMetadata> {
        self.types.get(&name.to_lowercase())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Iterate all registered types.
    pub fn iter(&self) -> impl Iterator<Item = &TypeMetadata> {
        self.types.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metaparameters() {
        assert!(is_metaparameter("tag"));
        assert!(is_metaparameter("require"));
        assert!(!is_metaparameter("mode"));
    }

    #[test]
    fn test_builtin_registry_is_case_insensitive() {
        let registry = TypeRegistry::builtin();
        assert!(registry.contains("file"));
        assert!(registry.contains("File"));
        assert!(!registry.contains("unknown"));
    }

    #[test]
    fn test_file_metadata_attributes() {
        let registry = TypeRegistry::builtin();
        let file = registry.get("file").unwrap();
        assert_eq!(file.namevar, "path");
        assert!(file.is_property("mode"));
        assert!(file.has_attribute("path"));
        assert!(!file.has_attribute("nonsense"));
    }

    #[test]
    fn test_exec_default_returns() {
        let registry = TypeRegistry::builtin();
        let exec = registry.get("exec").unwrap();
        assert!(exec
            .defaults
            .iter()
            .any(|(p, v)| p == "returns" && v == "0"));
    }
}

//! Resolved resource model
//!
//! The output of evaluation: a flat, ordered set of concrete resources
//! with an identity index and an alias table. Declaration order is
//! preserved so that graph ordering can fall back to it deterministically.

use std::collections::HashMap;
use steward_resource::{ResourceId, ResourceSpec};

/// The evaluated manifest: every concrete resource, in declaration order.
#[derive(Debug, Default)]
pub struct ResolvedModel {
    resources: Vec<ResourceSpec>,
    index: HashMap<ResourceId, usize>,
    aliases: HashMap<ResourceId, ResourceId>,
}

impl ResolvedModel {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Resources in declaration order.
    pub fn resources(&self) -> &[ResourceSpec] {
        &self.resources
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Look up a resource by id, following aliases.
    pub fn get(&self, id: &ResourceId) -> Option<&ResourceSpec> {
        self.position(id).map(|i| &self.resources[i])
    }

    /// Index of a resource by id, following aliases.
    pub(crate) fn position(&self, id: &ResourceId) -> Option<usize> {
        if let Some(i) = self.index.get(id) {
            return Some(*i);
        }
        let canonical = self.aliases.get(id)?;
        self.index.get(canonical).copied()
    }

    /// Resources carrying the given tag, in declaration order.
    pub fn tagged(&self, tag: &str) -> Vec<&ResourceSpec> {
        self.resources.iter().filter(|r| r.tagged(tag)).collect()
    }

    pub(crate) fn push(&mut self, spec: ResourceSpec) -> usize {
        let i = self.resources.len();
        self.index.insert(spec.id.clone(), i);
        self.resources.push(spec);
        i
    }

    pub(crate) fn get_mut(&mut self, i: usize) -> &mut ResourceSpec {
        &mut self.resources[i]
    }

    pub(crate) fn add_alias(&mut self, alias: ResourceId, canonical: ResourceId) {
        self.aliases.insert(alias, canonical);
    }

    pub(crate) fn has_alias(&self, alias: &ResourceId) -> bool {
        self.aliases.contains_key(alias) || self.index.contains_key(alias)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(type_name: &str, title: &str) -> ResourceSpec {
        ResourceSpec::new(ResourceId::new(type_name, title))
    }

    #[test]
    fn test_get_follows_aliases() {
        let mut model = ResolvedModel::new();
        model.push(spec("file", "/etc/motd"));
        model.add_alias(
            ResourceId::new("file", "motd"),
            ResourceId::new("file", "/etc/motd"),
        );

        let hit = model.get(&ResourceId::new("file", "motd"));
        assert_eq!(hit.map(|r| r.id.title.as_str()), Some("/etc/motd"));
        assert!(model.get(&ResourceId::new("file", "other")).is_none());
    }

    #[test]
    fn test_tagged_preserves_order() {
        let mut model = ResolvedModel::new();
        let mut a = spec("mem", "a");
        a.meta.tags.insert("wanted".into());
        let b = spec("mem", "b");
        let mut c = spec("mem", "c");
        c.meta.tags.insert("wanted".into());
        model.push(a);
        model.push(b);
        model.push(c);

        let hits = model.tagged("wanted");
        let titles: Vec<_> = hits.iter().map(|r| r.id.title.as_str()).collect();
        assert_eq!(titles, vec!["a", "c"]);
    }
}

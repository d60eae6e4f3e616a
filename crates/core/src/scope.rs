//! Hierarchical symbol tables
//!
//! Scopes form a tree: one node per class/define invocation, with the
//! root holding top-level bindings. The arena owns every node; parent
//! links are plain ids, so lookup walks the chain without any ownership
//! entanglement. Class scopes stay alive for the whole evaluation because
//! subclass scopes and later includes may still need to see them.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use steward_resource::Value;

/// Handle to one scope in a [`ScopeTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(usize);

#[derive(Debug, Default)]
struct ScopeNode {
    parent: Option<ScopeId>,
    vars: HashMap<String, Value>,
    /// type name -> parameter defaults declared at this scope
    defaults: HashMap<String, BTreeMap<String, Value>>,
    /// tags contributed by this scope (its class/define name)
    tags: BTreeSet<String>,
}

/// Arena of scopes with parent-chain resolution.
#[derive(Debug)]
pub struct ScopeTree {
    nodes: Vec<ScopeNode>,
}

impl Default for ScopeTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeTree {
    /// A tree containing only the root scope.
    pub fn new() -> Self {
        Self {
            nodes: vec![ScopeNode::default()],
        }
    }

    pub fn root(&self) -> ScopeId {
        ScopeId(0)
    }

    /// Create a child scope under `parent`.
    pub fn child(&mut self, parent: ScopeId) -> ScopeId {
        let id = ScopeId(self.nodes.len());
        self.nodes.push(ScopeNode {
            parent: Some(parent),
            ..ScopeNode::default()
        });
        id
    }

    /// Bind a variable in `scope`, shadowing any outer binding.
    pub fn set_var(&mut self, scope: ScopeId, name: impl Into<String>, value: Value) {
        self.nodes[scope.0].vars.insert(name.into(), value);
    }

    /// Resolve a variable, walking innermost to root; `None` if unbound.
    pub fn lookup(&self, scope: ScopeId, name: &str) -> Option<&Value> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let node = &self.nodes[id.0];
            if let Some(value) = node.vars.get(name) {
                return Some(value);
            }
            current = node.parent;
        }
        None
    }

    /// Add a tag contributed by this scope.
    pub fn add_tag(&mut self, scope: ScopeId, tag: impl Into<String>) {
        self.nodes[scope.0].tags.insert(tag.into());
    }

    /// All tags active in `scope`: its own plus every enclosing scope's.
    pub fn tags(&self, scope: ScopeId) -> BTreeSet<String> {
        let mut tags = BTreeSet::new();
        let mut current = Some(scope);
        while let Some(id) = current {
            let node = &self.nodes[id.0];
            tags.extend(node.tags.iter().cloned());
            current = node.parent;
        }
        tags
    }

    /// Record a type-level default at this scope.
    pub fn add_default(
        &mut self,
        scope: ScopeId,
        type_name: &str,
        param: impl Into<String>,
        value: Value,
    ) {
        self.nodes[scope.0]
            .defaults
            .entry(type_name.to_lowercase())
            .or_default()
            .insert(param.into(), value);
    }

    /// Merged defaults for a type as visible from `scope`: chain walked
    /// from the root down, so deeper declarations override outer ones.
    pub fn lookup_defaults(&self, scope: ScopeId, type_name: &str) -> BTreeMap<String, Value> {
        let type_name = type_name.to_lowercase();
        let mut chain = Vec::new();
        let mut current = Some(scope);
        while let Some(id) = current {
            chain.push(id);
            current = self.nodes[id.0].parent;
        }

        let mut merged = BTreeMap::new();
        for id in chain.into_iter().rev() {
            if let Some(defaults) = self.nodes[id.0].defaults.get(&type_name) {
                for (param, value) in defaults {
                    merged.insert(param.clone(), value.clone());
                }
            }
        }
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_walks_chain() {
        let mut tree = ScopeTree::new();
        let root = tree.root();
        tree.set_var(root, "outer", Value::from("o"));

        let child = tree.child(root);
        tree.set_var(child, "inner", Value::from("i"));

        assert_eq!(tree.lookup(child, "inner"), Some(&Value::from("i")));
        assert_eq!(tree.lookup(child, "outer"), Some(&Value::from("o")));
        assert_eq!(tree.lookup(root, "inner"), None);
        assert_eq!(tree.lookup(child, "unbound"), None);
    }

    #[test]
    fn test_shadowing() {
        let mut tree = ScopeTree::new();
        let root = tree.root();
        tree.set_var(root, "x", Value::from("outer"));
        let child = tree.child(root);
        tree.set_var(child, "x", Value::from("inner"));

        assert_eq!(tree.lookup(child, "x"), Some(&Value::from("inner")));
        assert_eq!(tree.lookup(root, "x"), Some(&Value::from("outer")));
    }

    #[test]
    fn test_tags_accumulate_down_the_chain() {
        let mut tree = ScopeTree::new();
        let root = tree.root();
        let foo = tree.child(root);
        tree.add_tag(foo, "foo");
        let bar = tree.child(foo);
        tree.add_tag(bar, "bar");

        let tags = tree.tags(bar);
        assert!(tags.contains("foo"));
        assert!(tags.contains("bar"));
        assert!(!tree.tags(foo).contains("bar"));
    }

    #[test]
    fn test_defaults_merge_deeper_wins() {
        let mut tree = ScopeTree::new();
        let root = tree.root();
        tree.add_default(root, "file", "mode", Value::from("644"));
        tree.add_default(root, "file", "ensure", Value::from("file"));

        let child = tree.child(root);
        tree.add_default(child, "File", "mode", Value::from("755"));

        let merged = tree.lookup_defaults(child, "file");
        assert_eq!(merged.get("mode"), Some(&Value::from("755")));
        assert_eq!(merged.get("ensure"), Some(&Value::from("file")));

        let at_root = tree.lookup_defaults(root, "file");
        assert_eq!(at_root.get("mode"), Some(&Value::from("644")));
    }
}

//! Resolved resource specifications
//!
//! A [`ResourceSpec`] is the evaluator's output for one declared resource:
//! type, title, resolved parameter values, metaparameters, and the
//! class/define call stack that produced it.

use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Unique identity of a resource: `(type, title)`.
///
/// Displays in reference form, e.g. `File[/tmp/x]`. Type names are stored
/// lowercase; display capitalizes the first letter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceId {
    pub type_name: String,
    pub title: String,
}

impl ResourceId {
    pub fn new(type_name: impl Into<String>, title: impl Into<String>) -> Self {
        let type_name: String = type_name.into();
        Self {
            type_name: type_name.to_lowercase(),
            title: title.into(),
        }
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut chars = self.type_name.chars();
        match chars.next() {
            Some(first) => write!(
                f,
                "{}{}[{}]",
                first.to_uppercase(),
                chars.as_str(),
                self.title
            ),
            None => write!(f, "[{}]", self.title),
        }
    }
}

/// Universal metaparameters carried by every resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metaparams {
    /// Tags: enclosing class/define names plus explicit `tag` values
    pub tags: BTreeSet<String>,
    /// Resources that must apply after this one
    pub before: Vec<ResourceId>,
    /// Resources that must apply before this one
    pub require: Vec<ResourceId>,
    /// Like `require`, and additionally refresh this resource when the
    /// named one changes
    pub subscribe: Vec<ResourceId>,
    /// Alternate titles under which references find this resource
    pub aliases: Vec<String>,
}

/// A fully-resolved resource: the unit the graph builder and transaction
/// operate on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceSpec {
    pub id: ResourceId,
    /// Resolved parameter and property values, namevar included
    pub params: BTreeMap<String, Value>,
    pub meta: Metaparams,
    /// Class/define call stack that declared this resource, innermost
    /// last; define frames render as `name[title]`
    pub provenance: Vec<String>,
    /// Position of the declaration in its manifest
    pub line: u32,
    pub column: u32,
    /// Declaration order within the compiled model; ties in the apply
    /// order are broken by this
    pub index: usize,
}

impl ResourceSpec {
    pub fn new(id: ResourceId) -> Self {
        Self {
            id,
            params: BTreeMap::new(),
            meta: Metaparams::default(),
            provenance: Vec::new(),
            line: 0,
            column: 0,
            index: 0,
        }
    }

    /// Qualified identity path, e.g.
    /// `//testing/component[componentname]/file=/tmp/classtest`.
    pub fn path(&self) -> String {
        let mut out = String::from("/");
        for segment in &self.provenance {
            out.push('/');
            out.push_str(segment);
        }
        out.push('/');
        out.push_str(&self.id.type_name);
        out.push('=');
        out.push_str(&self.id.title);
        out
    }

    /// Whether this resource carries the given tag.
    pub fn tagged(&self, name: &str) -> bool {
        self.meta.tags.contains(name)
    }

    pub fn param(&self, name: &str) -> Option<&Value> {
        self.params.get(name)
    }
}

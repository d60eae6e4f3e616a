//! Resolved manifest values

use crate::spec::ResourceId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A fully-resolved value in a resource specification.
///
/// Manifest scalars are strings: numbers like `755` stay as written and
/// are interpreted by whatever consumes them (the file provider parses
/// modes as octal). `Undef` is what an unbound variable resolves to; it
/// interpolates as the empty string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Value {
    String(String),
    Bool(bool),
    Array(Vec<Value>),
    /// Reference to a declared resource, `File["/tmp/x"]`
    Ref(ResourceId),
    Undef,
}

impl Value {
    /// Truthiness for `if` conditions and boolean contexts.
    ///
    /// Undef, `false`, the empty string, and the string `"false"` are
    /// false; everything else is true.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undef => false,
            Value::Bool(b) => *b,
            Value::String(s) => !s.is_empty() && s != "false",
            Value::Array(_) | Value::Ref(_) => true,
        }
    }

    /// Equality as used by case statements and selectors: values compare
    /// by their canonical string form, so `755`, `"755"`, and a variable
    /// holding either all match each other.
    pub fn matches(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Array(a), Value::Array(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.matches(y))
            }
            (Value::Undef, Value::Undef) => true,
            (Value::Undef, _) | (_, Value::Undef) => false,
            _ => self.to_string() == other.to_string(),
        }
    }

    pub fn is_undef(&self) -> bool {
        matches!(self, Value::Undef)
    }

    /// Flatten into scalar values; arrays of arrays flatten recursively.
    pub fn flatten(self) -> Vec<Value> {
        match self {
            Value::Array(items) => items.into_iter().flat_map(Value::flatten).collect(),
            other => vec![other],
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{s}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Array(items) => {
                let mut first = true;
                for item in items {
                    if !first {
                        write!(f, " ")?;
                    }
                    write!(f, "{item}")?;
                    first = false;
                }
                Ok(())
            }
            Value::Ref(id) => write!(f, "{id}"),
            Value::Undef => Ok(()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truthiness() {
        assert!(!Value::Undef.is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(!Value::from("").is_truthy());
        assert!(!Value::from("false").is_truthy());
        assert!(Value::Bool(true).is_truthy());
        assert!(Value::from("0").is_truthy());
        assert!(Value::Array(vec![]).is_truthy());
    }

    #[test]
    fn test_matches_across_representations() {
        assert!(Value::from("755").matches(&Value::from("755")));
        assert!(Value::Bool(true).matches(&Value::from("true")));
        assert!(!Value::from("a").matches(&Value::from("b")));
        assert!(!Value::Undef.matches(&Value::from("")));
        assert!(Value::Undef.matches(&Value::Undef));
    }

    #[test]
    fn test_display_interpolation_forms() {
        assert_eq!(Value::Undef.to_string(), "");
        assert_eq!(
            Value::Array(vec![Value::from("a"), Value::from("b")]).to_string(),
            "a b"
        );
    }

    #[test]
    fn test_flatten_nested_arrays() {
        let v = Value::Array(vec![
            Value::from("a"),
            Value::Array(vec![Value::from("b"), Value::from("c")]),
        ]);
        assert_eq!(
            v.flatten(),
            vec![Value::from("a"), Value::from("b"), Value::from("c")]
        );
    }
}

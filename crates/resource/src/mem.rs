//! In-memory provider for exercising the engine without touching the host
//!
//! `MemProvider` manages entries in a shared [`MemState`] map instead of
//! real system state, and can be told to fail syncing chosen titles, which
//! makes failure containment and rollback behavior testable. It is used
//! throughout steward-core's transaction tests.

use crate::error::ProviderError;
use crate::provider::{CurrentState, Provider};
use crate::registry::TypeMetadata;
use crate::spec::ResourceSpec;
use crate::value::Value;
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Debug, Default)]
struct MemInner {
    entries: BTreeMap<String, BTreeMap<String, Value>>,
    refreshed: Vec<String>,
}

/// Shared, observable state behind one or more `MemProvider`s.
#[derive(Debug, Clone, Default)]
pub struct MemState {
    inner: Arc<Mutex<MemInner>>,
}

impl MemState {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Seed an entry's property before an apply.
    pub fn seed(&self, title: &str, property: &str, value: Value) {
        self.lock()
            .entries
            .entry(title.to_string())
            .or_default()
            .insert(property.to_string(), value);
    }

    pub fn contains(&self, title: &str) -> bool {
        self.lock().entries.contains_key(title)
    }

    pub fn get(&self, title: &str, property: &str) -> Option<Value> {
        self.lock().entries.get(title)?.get(property).cloned()
    }

    /// Full copy of the state, for before/after equality assertions.
    pub fn snapshot(&self) -> BTreeMap<String, BTreeMap<String, Value>> {
        self.lock().entries.clone()
    }

    /// Titles that received a refresh call, in order.
    pub fn refreshed(&self) -> Vec<String> {
        self.lock().refreshed.clone()
    }
}

/// Test provider for the synthetic `mem` type.
pub struct MemProvider {
    state: MemState,
    fail_on: HashSet<String>,
    fail_refresh: HashSet<String>,
}

impl MemProvider {
    pub fn new(state: MemState) -> Self {
        Self {
            state,
            fail_on: HashSet::new(),
            fail_refresh: HashSet::new(),
        }
    }

    /// Make every sync of the given title fail.
    pub fn fail_on(mut self, title: &str) -> Self {
        self.fail_on.insert(title.to_string());
        self
    }

    /// Make every refresh of the given title fail.
    pub fn fail_refresh_on(mut self, title: &str) -> Self {
        self.fail_refresh.insert(title.to_string());
        self
    }

    /// Type metadata for `mem`. Entries exist (`ensure`) and hold one
    /// `value`; creation is the default, like `file`.
    pub fn metadata() -> TypeMetadata {
        TypeMetadata::new("mem", "name", &["ensure", "value"], &[])
            .with_default("ensure", "present")
    }
}

fn entry_name(spec: &ResourceSpec) -> String {
    match spec.param("name") {
        Some(v) => v.to_string(),
        None => spec.id.title.clone(),
    }
}

impl Provider for MemProvider {
    fn type_name(&self) -> &'static str {
        "mem"
    }

    fn retrieve(&self, spec: &ResourceSpec) -> Result<CurrentState, ProviderError> {
        let name = entry_name(spec);
        let mut state = CurrentState::new();
        match self.state.lock().entries.get(&name) {
            Some(entry) => {
                state.insert("ensure".into(), Value::from("present"));
                for (property, value) in entry {
                    if property != "ensure" {
                        state.insert(property.clone(), value.clone());
                    }
                }
            }
            None => {
                state.insert("ensure".into(), Value::from("absent"));
            }
        }
        Ok(state)
    }

    fn sync(
        &self,
        spec: &ResourceSpec,
        property: &str,
        desired: &Value,
    ) -> Result<(), ProviderError> {
        let name = entry_name(spec);
        if self.fail_on.contains(&name) {
            return Err(ProviderError::Failure(format!(
                "injected failure for '{name}'"
            )));
        }

        let mut inner = self.state.lock();
        match property {
            "ensure" => match desired.to_string().as_str() {
                "absent" => {
                    inner.entries.remove(&name);
                    Ok(())
                }
                _ => {
                    inner.entries.entry(name).or_default();
                    Ok(())
                }
            },
            _ => {
                let entry = inner.entries.entry(name).or_default();
                if desired.is_undef() {
                    // Undef reverses a property that had no prior value
                    entry.remove(property);
                } else {
                    entry.insert(property.to_string(), desired.clone());
                }
                Ok(())
            }
        }
    }

    fn refresh(&self, spec: &ResourceSpec) -> Result<(), ProviderError> {
        let name = entry_name(spec);
        if self.fail_refresh.contains(&name) {
            return Err(ProviderError::Failure(format!(
                "injected refresh failure for '{name}'"
            )));
        }
        self.state.lock().refreshed.push(name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::ResourceId;

    fn spec_for(name: &str) -> ResourceSpec {
        let mut spec = ResourceSpec::new(ResourceId::new("mem", name));
        spec.params.insert("name".into(), Value::from(name));
        spec
    }

    #[test]
    fn test_sync_and_retrieve() {
        let state = MemState::new();
        let provider = MemProvider::new(state.clone());
        let spec = spec_for("a");

        provider
            .sync(&spec, "ensure", &Value::from("present"))
            .unwrap();
        provider.sync(&spec, "value", &Value::from("v1")).unwrap();

        let current = provider.retrieve(&spec).unwrap();
        assert_eq!(current.get("ensure"), Some(&Value::from("present")));
        assert_eq!(current.get("value"), Some(&Value::from("v1")));

        provider
            .sync(&spec, "ensure", &Value::from("absent"))
            .unwrap();
        assert!(!state.contains("a"));
    }

    #[test]
    fn test_undef_clears_property() {
        let state = MemState::new();
        let provider = MemProvider::new(state.clone());
        let spec = spec_for("a");

        provider.sync(&spec, "value", &Value::from("v1")).unwrap();
        provider.sync(&spec, "value", &Value::Undef).unwrap();
        assert_eq!(state.get("a", "value"), None);
    }

    #[test]
    fn test_injected_failure() {
        let provider = MemProvider::new(MemState::new()).fail_on("bad");
        let err = provider
            .sync(&spec_for("bad"), "value", &Value::from("v"))
            .unwrap_err();
        assert!(matches!(err, ProviderError::Failure(_)));
    }

    #[test]
    fn test_injected_refresh_failure() {
        let state = MemState::new();
        let provider = MemProvider::new(state.clone()).fail_refresh_on("bad");
        let err = provider.refresh(&spec_for("bad")).unwrap_err();
        assert!(matches!(err, ProviderError::Failure(_)));
        assert!(state.refreshed().is_empty());
    }

    #[test]
    fn test_refresh_recorded() {
        let state = MemState::new();
        let provider = MemProvider::new(state.clone());
        provider.refresh(&spec_for("a")).unwrap();
        assert_eq!(state.refreshed(), vec!["a".to_string()]);
    }
}

//! Transactional apply with rollback
//!
//! Walks the graph in apply order, retrieves current state per resource,
//! and syncs only the properties that differ. Every successful property
//! sync is journaled with the value it replaced; `rollback` replays the
//! journal in reverse. A sync failure never aborts the run: the failed
//! resource is reported, everything downstream of it is skipped, and
//! independent resources still apply.

use crate::error::TransactionError;
use crate::graph::ResourceGraph;
use serde::{Deserialize, Serialize};
use std::mem;
use steward_resource::{ProviderSet, ResourceId, TypeRegistry, Value};
use tracing::{debug, info, warn};

/// One journaled property change: what `property` of `id` held before it
/// was synced. Replaying it (sync back to `prior`) undoes the change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub id: ResourceId,
    pub property: String,
    pub prior: Value,
}

/// A resource that could not be applied, with the provider's message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceEvent {
    pub id: ResourceId,
    pub message: String,
}

/// What an apply run did, resource by resource.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ApplyOutcome {
    /// Resources with at least one property synced
    pub applied: Vec<ResourceId>,
    /// Resources already in their desired state
    pub unchanged: Vec<ResourceId>,
    /// Resources whose provider failed, with the failure message
    pub failed: Vec<ResourceEvent>,
    /// Resources not attempted because a dependency failed or was skipped
    pub skipped: Vec<ResourceId>,
    /// Resources refreshed because something they subscribe to changed
    pub refreshed: Vec<ResourceId>,
}

impl ApplyOutcome {
    /// Whether every resource was applied or already in sync.
    pub fn is_success(&self) -> bool {
        self.failed.is_empty() && self.skipped.is_empty()
    }
}

/// A journaled change that could not be reversed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedReversal {
    pub record: ChangeRecord,
    pub message: String,
}

/// What a rollback managed to undo.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RollbackOutcome {
    pub reversed: Vec<ChangeRecord>,
    pub unreversed: Vec<FailedReversal>,
}

impl RollbackOutcome {
    pub fn is_clean(&self) -> bool {
        self.unreversed.is_empty()
    }
}

/// A completed apply run holding its change journal.
pub struct Transaction<'a> {
    graph: &'a ResourceGraph<'a>,
    providers: &'a ProviderSet,
    records: Vec<ChangeRecord>,
    outcome: ApplyOutcome,
    rolled_back: bool,
}

impl<'a> Transaction<'a> {
    /// Run the graph against the host and journal every change made.
    pub fn apply(
        graph: &'a ResourceGraph<'a>,
        registry: &TypeRegistry,
        providers: &'a ProviderSet,
    ) -> Transaction<'a> {
        let n = graph.model().len();
        info!(resources = n, "applying configuration");
        let mut records = Vec::new();
        let mut outcome = ApplyOutcome::default();
        // Per resource index: whether it failed or was skipped, and
        // whether a subscribed-to resource changed before it ran.
        let mut blocked = vec![false; n];
        let mut needs_refresh = vec![false; n];

        for &i in graph.order() {
            let spec = graph.spec(i);
            if graph.dependencies_of(i).iter().any(|&d| blocked[d]) {
                debug!(resource = %spec.id, "skipped, dependency not satisfied");
                blocked[i] = true;
                outcome.skipped.push(spec.id.clone());
                continue;
            }

            let Some(provider) = providers.get(&spec.id.type_name) else {
                warn!(resource = %spec.id, "no provider for type");
                blocked[i] = true;
                outcome.failed.push(ResourceEvent {
                    id: spec.id.clone(),
                    message: format!("no provider for type '{}'", spec.id.type_name),
                });
                continue;
            };
            let Some(metadata) = registry.get(&spec.id.type_name) else {
                blocked[i] = true;
                outcome.failed.push(ResourceEvent {
                    id: spec.id.clone(),
                    message: format!("unknown type '{}'", spec.id.type_name),
                });
                continue;
            };

            let current = match provider.retrieve(spec) {
                Ok(current) => current,
                Err(err) => {
                    warn!(resource = %spec.id, error = %err, "retrieve failed");
                    blocked[i] = true;
                    outcome.failed.push(ResourceEvent {
                        id: spec.id.clone(),
                        message: err.to_string(),
                    });
                    continue;
                }
            };

            let mut changed = false;
            let mut failed = false;
            for property in &metadata.properties {
                let Some(desired) = spec.param(property) else {
                    continue;
                };
                let prior = current.get(property).cloned().unwrap_or(Value::Undef);
                if desired.matches(&prior) {
                    continue;
                }
                debug!(resource = %spec.id, property = %property, "syncing");
                match provider.sync(spec, property, desired) {
                    Ok(()) => {
                        records.push(ChangeRecord {
                            id: spec.id.clone(),
                            property: property.clone(),
                            prior,
                        });
                        changed = true;
                    }
                    Err(err) => {
                        warn!(resource = %spec.id, property = %property, error = %err, "sync failed");
                        outcome.failed.push(ResourceEvent {
                            id: spec.id.clone(),
                            message: err.to_string(),
                        });
                        failed = true;
                        break;
                    }
                }
            }
            if failed {
                // Changes made before the failure stay journaled so a
                // rollback can still reverse them.
                blocked[i] = true;
                continue;
            }

            if needs_refresh[i] {
                match provider.refresh(spec) {
                    Ok(()) => outcome.refreshed.push(spec.id.clone()),
                    Err(err) => {
                        warn!(resource = %spec.id, error = %err, "refresh failed");
                        blocked[i] = true;
                        outcome.failed.push(ResourceEvent {
                            id: spec.id.clone(),
                            message: err.to_string(),
                        });
                        // Property changes before the refresh stay
                        // journaled; the resource reports as failed only.
                        continue;
                    }
                }
            }

            if changed {
                outcome.applied.push(spec.id.clone());
                for &w in graph.subscribers_of(i) {
                    needs_refresh[w] = true;
                }
            } else {
                outcome.unchanged.push(spec.id.clone());
            }
        }

        info!(
            applied = outcome.applied.len(),
            unchanged = outcome.unchanged.len(),
            failed = outcome.failed.len(),
            skipped = outcome.skipped.len(),
            "apply finished"
        );
        Transaction {
            graph,
            providers,
            records,
            outcome,
            rolled_back: false,
        }
    }

    pub fn outcome(&self) -> &ApplyOutcome {
        &self.outcome
    }

    /// The change journal, in the order changes were made.
    pub fn changes(&self) -> &[ChangeRecord] {
        &self.records
    }

    /// Undo the journal, newest change first. Reversal failures are
    /// collected, never fatal; the remaining records are still attempted.
    pub fn rollback(&mut self) -> Result<RollbackOutcome, TransactionError> {
        if self.rolled_back {
            return Err(TransactionError::AlreadyRolledBack);
        }
        self.rolled_back = true;
        let records = mem::take(&mut self.records);
        info!(changes = records.len(), "rolling back");
        let mut outcome = RollbackOutcome::default();
        for record in records.into_iter().rev() {
            let Some(spec) = self.graph.model().get(&record.id) else {
                outcome.unreversed.push(FailedReversal {
                    message: format!("{} is not in the model", record.id),
                    record,
                });
                continue;
            };
            let Some(provider) = self.providers.get(&record.id.type_name) else {
                outcome.unreversed.push(FailedReversal {
                    message: format!("no provider for type '{}'", record.id.type_name),
                    record,
                });
                continue;
            };
            debug!(resource = %record.id, property = %record.property, "reversing");
            match provider.sync(spec, &record.property, &record.prior) {
                Ok(()) => outcome.reversed.push(record),
                Err(err) => {
                    warn!(resource = %record.id, error = %err, "reversal failed");
                    outcome.unreversed.push(FailedReversal {
                        record,
                        message: err.to_string(),
                    });
                }
            }
        }
        Ok(outcome)
    }
}

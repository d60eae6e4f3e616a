//! Resource dependency graph
//!
//! Resolves `before`/`require`/`subscribe` references against the model
//! and produces a total apply order. Ordering is deterministic: among
//! resources whose dependencies are all satisfied, declaration order
//! wins. A reference to an undeclared resource or a dependency cycle is
//! fatal before anything is applied.

use crate::error::GraphError;
use crate::model::ResolvedModel;
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::collections::BTreeSet;
use steward_resource::{ResourceId, ResourceSpec};

/// The ordered dependency graph over a resolved model.
#[derive(Debug)]
pub struct ResourceGraph<'a> {
    model: &'a ResolvedModel,
    graph: DiGraph<usize, ()>,
    order: Vec<usize>,
    /// Per resource index: the indexes subscribed to it
    subscribers: Vec<Vec<usize>>,
}

impl<'a> ResourceGraph<'a> {
    /// Build and order the graph. Edges run dependency to dependent.
    pub fn build(model: &'a ResolvedModel) -> Result<Self, GraphError> {
        let n = model.len();
        let mut graph = DiGraph::with_capacity(n, n);
        let nodes: Vec<NodeIndex> = (0..n).map(|i| graph.add_node(i)).collect();
        let mut subscribers = vec![Vec::new(); n];

        for (i, spec) in model.resources().iter().enumerate() {
            for target in spec.meta.require.iter().chain(&spec.meta.subscribe) {
                let j = resolve(model, spec, target)?;
                graph.update_edge(nodes[j], nodes[i], ());
            }
            for target in &spec.meta.subscribe {
                let j = resolve(model, spec, target)?;
                if !subscribers[j].contains(&i) {
                    subscribers[j].push(i);
                }
            }
            for target in &spec.meta.before {
                let j = resolve(model, spec, target)?;
                graph.update_edge(nodes[i], nodes[j], ());
            }
        }

        let order = topo_order(&graph, &nodes, model)?;
        Ok(Self {
            model,
            graph,
            order,
            subscribers,
        })
    }

    pub fn model(&self) -> &ResolvedModel {
        self.model
    }

    /// Resource indexes in apply order.
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    pub fn spec(&self, i: usize) -> &ResourceSpec {
        &self.model.resources()[i]
    }

    /// Direct dependencies of a resource (incoming edges).
    pub fn dependencies_of(&self, i: usize) -> Vec<usize> {
        self.graph
            .neighbors_directed(NodeIndex::new(i), Direction::Incoming)
            .map(|n| self.graph[n])
            .collect()
    }

    /// Resources that subscribe to `i` and want a refresh when it changes.
    pub fn subscribers_of(&self, i: usize) -> &[usize] {
        &self.subscribers[i]
    }
}

fn resolve(
    model: &ResolvedModel,
    from: &ResourceSpec,
    target: &ResourceId,
) -> Result<usize, GraphError> {
    model
        .position(target)
        .ok_or_else(|| GraphError::UnknownReference {
            from: from.id.clone(),
            to: target.clone(),
        })
}

/// Kahn's algorithm with a smallest-declaration-index ready set, so the
/// order is stable across runs.
fn topo_order(
    graph: &DiGraph<usize, ()>,
    nodes: &[NodeIndex],
    model: &ResolvedModel,
) -> Result<Vec<usize>, GraphError> {
    let n = nodes.len();
    let mut indegree = vec![0usize; n];
    for (i, node) in nodes.iter().enumerate() {
        indegree[i] = graph
            .neighbors_directed(*node, Direction::Incoming)
            .count();
    }
    let mut ready: BTreeSet<usize> = (0..n).filter(|i| indegree[*i] == 0).collect();
    let mut order = Vec::with_capacity(n);
    while let Some(i) = ready.pop_first() {
        order.push(i);
        for neighbor in graph.neighbors_directed(nodes[i], Direction::Outgoing) {
            let j = graph[neighbor];
            indegree[j] -= 1;
            if indegree[j] == 0 {
                ready.insert(j);
            }
        }
    }
    if order.len() == n {
        return Ok(order);
    }
    // Some nodes never became ready: report the strongly connected
    // component that keeps them stuck.
    for scc in tarjan_scc(graph) {
        let looped = scc.len() > 1
            || (scc.len() == 1 && graph.find_edge(scc[0], scc[0]).is_some());
        if looped {
            let mut members: Vec<ResourceId> = scc
                .iter()
                .map(|n| model.resources()[graph[*n]].id.clone())
                .collect();
            members.sort();
            return Err(GraphError::Cycle { members });
        }
    }
    Err(GraphError::Cycle { members: Vec::new() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::{evaluate, EvalOptions};
    use steward_lang::parse;
    use steward_resource::mem::MemProvider;
    use steward_resource::TypeRegistry;

    fn model(text: &str) -> ResolvedModel {
        let mut registry = TypeRegistry::builtin();
        registry.register(MemProvider::metadata());
        let ast = parse(text, "test").unwrap();
        evaluate(&ast, &registry, EvalOptions::default()).unwrap()
    }

    fn ordered_titles<'m>(model: &'m ResolvedModel, graph: &ResourceGraph) -> Vec<&'m str> {
        graph
            .order()
            .iter()
            .map(|i| model.resources()[*i].id.title.as_str())
            .collect()
    }

    #[test]
    fn test_order_follows_declaration_without_edges() {
        let model = model(
            r#"
            mem { "b": }
            mem { "a": }
            mem { "c": }
            "#,
        );
        let graph = ResourceGraph::build(&model).unwrap();
        assert_eq!(ordered_titles(&model, &graph), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_require_orders_dependency_first() {
        let model = model(
            r#"
            mem { "late": require => Mem["early"] }
            mem { "early": }
            "#,
        );
        let graph = ResourceGraph::build(&model).unwrap();
        assert_eq!(ordered_titles(&model, &graph), vec!["early", "late"]);
        assert_eq!(graph.dependencies_of(0), vec![1]);
    }

    #[test]
    fn test_before_orders_dependent_last() {
        let model = model(
            r#"
            mem { "second": }
            mem { "first": before => Mem["second"] }
            "#,
        );
        let graph = ResourceGraph::build(&model).unwrap();
        assert_eq!(ordered_titles(&model, &graph), vec!["first", "second"]);
    }

    #[test]
    fn test_subscribe_orders_and_records_subscription() {
        let model = model(
            r#"
            mem { "watcher": subscribe => Mem["source"] }
            mem { "source": }
            "#,
        );
        let graph = ResourceGraph::build(&model).unwrap();
        assert_eq!(ordered_titles(&model, &graph), vec!["source", "watcher"]);
        // watcher is index 0, source index 1
        assert_eq!(graph.subscribers_of(1), &[0]);
        assert!(graph.subscribers_of(0).is_empty());
    }

    #[test]
    fn test_reference_resolves_through_alias() {
        let model = model(
            r#"
            mem { "watcher": require => Mem["shortname"] }
            mem { "the-real-one": alias => shortname }
            "#,
        );
        let graph = ResourceGraph::build(&model).unwrap();
        assert_eq!(
            ordered_titles(&model, &graph),
            vec!["the-real-one", "watcher"]
        );
    }

    #[test]
    fn test_unknown_reference_errors() {
        let model = model(r#"mem { "a": require => Mem["missing"] }"#);
        let err = ResourceGraph::build(&model).unwrap_err();
        let GraphError::UnknownReference { from, to } = err else {
            panic!("expected unknown reference, got {err}");
        };
        assert_eq!(from.title, "a");
        assert_eq!(to.title, "missing");
    }

    #[test]
    fn test_cycle_errors_with_members() {
        let model = model(
            r#"
            mem { "a": require => Mem["b"] }
            mem { "b": require => Mem["a"] }
            mem { "free": }
            "#,
        );
        let err = ResourceGraph::build(&model).unwrap_err();
        let GraphError::Cycle { members } = err else {
            panic!("expected cycle, got {err}");
        };
        let titles: Vec<_> = members.iter().map(|m| m.title.as_str()).collect();
        assert_eq!(titles, vec!["a", "b"]);
    }

    #[test]
    fn test_self_reference_is_a_cycle() {
        let model = model(r#"mem { "a": require => Mem["a"] }"#);
        assert!(matches!(
            ResourceGraph::build(&model),
            Err(GraphError::Cycle { .. })
        ));
    }
}

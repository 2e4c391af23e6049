// src/dag/graph.rs

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::Hash;
use std::sync::{Mutex, MutexGuard, PoisonError};

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use tracing::debug;

use crate::errors::{Result, TaskdagError};

/// Bounds every node identity has to satisfy.
///
/// Nodes are compared and hashed by value, so the identity type itself is the
/// map key. Blanket-implemented; `String`, integers and simple enums qualify.
pub trait NodeId: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static {}

impl<T> NodeId for T where T: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static {}

#[derive(Debug)]
struct GraphState<T> {
    nodes: HashSet<T>,
    /// node -> nodes it waits for.
    depended_upon: HashMap<T, HashSet<T>>,
    /// node -> nodes waiting for it.
    depending_on: HashMap<T, HashSet<T>>,
}

impl<T: NodeId> GraphState<T> {
    fn is_free(&self, node: &T) -> bool {
        self.depended_upon.get(node).is_none_or(|deps| deps.is_empty())
    }
}

/// Mutable dependency graph of opaque task identities.
///
/// An edge `(from, to)` means `from` cannot run until `to` has been removed.
/// A node is *free* when nothing it depends on is still in the graph.
///
/// All operations take `&self` and go through one internal lock, so the graph
/// can be shared as `Arc<DependencyGraph<T>>` between the executor and the
/// workers it runs (which may keep adding nodes during a run).
#[derive(Debug)]
pub struct DependencyGraph<T> {
    state: Mutex<GraphState<T>>,
}

impl<T: NodeId> Default for DependencyGraph<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: NodeId> DependencyGraph<T> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(GraphState {
                nodes: HashSet::new(),
                depended_upon: HashMap::new(),
                depending_on: HashMap::new(),
            }),
        }
    }

    // A panic while holding the lock cannot leave the maps half-updated in a
    // way later calls care about, so poisoning is ignored.
    fn lock(&self) -> MutexGuard<'_, GraphState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert `node`. Returns `false` if it was already present.
    pub fn add_node(&self, node: T) -> bool {
        self.lock().nodes.insert(node)
    }

    /// Make `from` depend on `to`; both are inserted if missing.
    ///
    /// Cycles are not rejected here; see [`check_acyclic`](Self::check_acyclic).
    pub fn add_edge(&self, from: T, to: T) {
        let mut state = self.lock();
        state.nodes.insert(from.clone());
        state.nodes.insert(to.clone());
        state
            .depending_on
            .entry(to.clone())
            .or_default()
            .insert(from.clone());
        state.depended_upon.entry(from).or_default().insert(to);
    }

    /// Remove `node` and every edge touching it.
    ///
    /// Nodes whose last remaining dependency was `node` become free. Returns
    /// `false` if the node was not in the graph.
    pub fn remove_node(&self, node: &T) -> bool {
        let mut state = self.lock();
        debug!(node = ?node, "removing node from graph");

        let present = state.nodes.remove(node);

        if let Some(dependents) = state.depending_on.remove(node) {
            for dependent in dependents {
                if let Some(deps) = state.depended_upon.get_mut(&dependent) {
                    deps.remove(node);
                }
            }
        }

        if let Some(deps) = state.depended_upon.remove(node) {
            for dep in deps {
                if let Some(dependents) = state.depending_on.get_mut(&dep) {
                    dependents.remove(node);
                }
            }
        }

        present
    }

    /// Snapshot of the nodes that currently have no unresolved dependencies.
    pub fn free_nodes(&self) -> HashSet<T> {
        let state = self.lock();
        state
            .nodes
            .iter()
            .filter(|node| state.is_free(node))
            .cloned()
            .collect()
    }

    /// All node identities currently in the graph.
    pub fn values(&self) -> Vec<T> {
        self.lock().nodes.iter().cloned().collect()
    }

    pub fn contains(&self, node: &T) -> bool {
        self.lock().nodes.contains(node)
    }

    pub fn len(&self) -> usize {
        self.lock().nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().nodes.is_empty()
    }

    /// Nodes `node` still waits for.
    pub fn dependencies_of(&self, node: &T) -> HashSet<T> {
        self.lock()
            .depended_upon
            .get(node)
            .cloned()
            .unwrap_or_default()
    }

    /// Nodes still waiting for `node`.
    pub fn dependents_of(&self, node: &T) -> HashSet<T> {
        self.lock()
            .depending_on
            .get(node)
            .cloned()
            .unwrap_or_default()
    }

    /// Fail with [`TaskdagError::DagCycle`] if the remaining edges form a cycle.
    pub fn check_acyclic(&self) -> Result<()> {
        let state = self.lock();

        let mut graph: DiGraph<&T, ()> = DiGraph::new();
        let mut index: HashMap<&T, NodeIndex> = HashMap::new();

        for node in &state.nodes {
            index.insert(node, graph.add_node(node));
        }

        // Edge direction: dependency -> dependent.
        for (from, deps) in &state.depended_upon {
            let Some(&from_ix) = index.get(from) else {
                continue;
            };
            for to in deps {
                if let Some(&to_ix) = index.get(to) {
                    graph.add_edge(to_ix, from_ix, ());
                }
            }
        }

        match toposort(&graph, None) {
            Ok(_order) => Ok(()),
            Err(cycle) => Err(TaskdagError::DagCycle(format!(
                "cycle detected in dependency graph involving node {:?}",
                graph[cycle.node_id()]
            ))),
        }
    }

    /// Human-readable rendering of the graph, for diagnostics.
    pub fn dump(&self) -> String {
        self.to_string()
    }
}

impl<T: NodeId> fmt::Display for DependencyGraph<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();

        let mut all: Vec<String> = state.nodes.iter().map(|n| format!("{n:?}")).collect();
        all.sort();

        let mut free: Vec<String> = state
            .nodes
            .iter()
            .filter(|n| state.is_free(n))
            .map(|n| format!("{n:?}"))
            .collect();
        free.sort();

        let mut blocked: Vec<(String, Vec<String>)> = state
            .nodes
            .iter()
            .filter(|n| !state.is_free(n))
            .map(|n| {
                let mut deps: Vec<String> = state
                    .depended_upon
                    .get(n)
                    .into_iter()
                    .flatten()
                    .map(|d| format!("{d:?}"))
                    .collect();
                deps.sort();
                (format!("{n:?}"), deps)
            })
            .collect();
        blocked.sort();

        writeln!(f, "************ Graph dump ***************")?;
        writeln!(f, "All nodes: [{}]", all.join(", "))?;
        writeln!(f, "Free nodes: [{}]", free.join(", "))?;
        writeln!(f, "Dependent nodes:")?;
        for (node, deps) in blocked {
            writeln!(f, "     {node} -> [{}]", deps.join(", "))?;
        }
        Ok(())
    }
}

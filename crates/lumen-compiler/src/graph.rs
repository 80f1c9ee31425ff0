//! A minimal directed acyclic graph.
//!
//! Vertices are flattened names; an edge `a -> b` means "a's definition
//! uses b". Acyclicity is enforced when edges are inserted, so every graph
//! that exists has a topological order.
//!
//! Successor sets are ordered so that traversal and sorting are
//! deterministic regardless of hashing.

use std::collections::BTreeSet;
use std::fmt::Display;
use std::hash::Hash;

use lumen_core::GraphError;
use rustc_hash::FxHashMap;

type Result<T> = std::result::Result<T, GraphError>;

/// An owned adjacency-list DAG.
#[derive(Debug, Clone)]
pub struct Dag<V> {
    successors: FxHashMap<V, BTreeSet<V>>,
    edges: usize,
}

impl<V> Default for Dag<V> {
    fn default() -> Self {
        Self {
            successors: FxHashMap::default(),
            edges: 0,
        }
    }
}

impl<V: Clone + Ord + Hash + Display> Dag<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a vertex. Returns `false` if it was already present.
    pub fn add_vertex(&mut self, vertex: V) -> bool {
        if self.successors.contains_key(&vertex) {
            return false;
        }
        self.successors.insert(vertex, BTreeSet::new());
        true
    }

    pub fn contains(&self, vertex: &V) -> bool {
        self.successors.contains_key(vertex)
    }

    /// Add the edge `from -> to`, inserting missing endpoints.
    ///
    /// Fails with [`GraphError::CycleDetected`] if `to` already reaches
    /// `from`; the graph is left unchanged in that case.
    pub fn add_edge(&mut self, from: V, to: V) -> Result<()> {
        if from == to || self.reaches(&to, &from) {
            return Err(GraphError::CycleDetected {
                from: from.to_string(),
                to: to.to_string(),
            });
        }
        self.add_vertex(to.clone());
        if self.successors.entry(from).or_default().insert(to) {
            self.edges += 1;
        }
        Ok(())
    }

    /// The direct successors of `vertex`, in order.
    pub fn successors<'a>(&'a self, vertex: &V) -> impl Iterator<Item = &'a V> + use<'a, V> {
        self.successors.get(vertex).into_iter().flatten()
    }

    pub fn vertex_count(&self) -> usize {
        self.successors.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges
    }

    /// Whether a path of one or more edges leads from `from` to `to`.
    pub fn reaches(&self, from: &V, to: &V) -> bool {
        let mut seen = BTreeSet::new();
        let mut stack: Vec<&V> = self.successors(from).collect();
        while let Some(v) = stack.pop() {
            if v == to {
                return true;
            }
            if seen.insert(v) {
                stack.extend(self.successors(v));
            }
        }
        false
    }
}

/// Every vertex reachable from `roots` by following edges of any of
/// `graphs`. The roots themselves are only included when reached again.
pub fn reachable<V>(roots: &[V], graphs: &[&Dag<V>]) -> BTreeSet<V>
where
    V: Clone + Ord + Hash + Display,
{
    let mut seen = BTreeSet::new();
    let mut stack: Vec<V> = Vec::new();
    for root in roots {
        for graph in graphs {
            stack.extend(graph.successors(root).cloned());
        }
    }
    while let Some(v) = stack.pop() {
        if seen.contains(&v) {
            continue;
        }
        for graph in graphs {
            stack.extend(graph.successors(&v).cloned());
        }
        seen.insert(v);
    }
    seen
}

/// Order `subset` so that every vertex follows all of its successors
/// (dependencies first), considering edges of all `graphs`.
///
/// Kahn's algorithm; ties are broken by vertex order, so the result is
/// deterministic. Edges leaving the subset are ignored.
pub fn topological_sort<V>(subset: &BTreeSet<V>, graphs: &[&Dag<V>]) -> Result<Vec<V>>
where
    V: Clone + Ord + Hash + Display,
{
    let mut pending: FxHashMap<&V, usize> = FxHashMap::default();
    let mut dependents: FxHashMap<&V, Vec<&V>> = FxHashMap::default();

    for v in subset {
        let mut deps = BTreeSet::new();
        for graph in graphs {
            deps.extend(graph.successors(v).filter(|d| subset.contains(*d)));
        }
        for dep in &deps {
            dependents.entry(*dep).or_default().push(v);
        }
        pending.insert(v, deps.len());
    }

    let mut ready: BTreeSet<&V> = pending
        .iter()
        .filter(|(_, count)| **count == 0)
        .map(|(v, _)| *v)
        .collect();
    let mut order = Vec::with_capacity(subset.len());

    while let Some(v) = ready.pop_first() {
        order.push(v.clone());
        for dependent in dependents.get(v).into_iter().flatten() {
            if let Some(count) = pending.get_mut(dependent) {
                *count -= 1;
                if *count == 0 {
                    ready.insert(*dependent);
                }
            }
        }
    }

    if order.len() != subset.len() {
        let stuck = pending
            .iter()
            .filter(|(_, count)| **count > 0)
            .map(|(v, _)| *v)
            .min();
        let name = stuck.map(|v| v.to_string()).unwrap_or_default();
        return Err(GraphError::CycleDetected {
            from: name.clone(),
            to: name,
        });
    }
    Ok(order)
}

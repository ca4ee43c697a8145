//! Upstream/downstream adjacency built once per graph

use flowrefine_core::{Graph, NodeId};
use std::collections::HashMap;

/// Adjacency maps over a workflow graph
///
/// Neighbour lists keep edge-list order, so every traversal built on top
/// of the index is deterministic. There are no mutation methods: rebuild
/// the index when the graph changes.
#[derive(Debug, Clone)]
pub struct DependencyIndex {
    /// node -> nodes that consume its output (children)
    downstream: HashMap<NodeId, Vec<NodeId>>,

    /// node -> nodes it reads from (parents)
    upstream: HashMap<NodeId, Vec<NodeId>>,
}

impl DependencyIndex {
    /// Build both maps in O(E)
    pub fn new(graph: &Graph) -> Self {
        let mut downstream: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
        let mut upstream: HashMap<NodeId, Vec<NodeId>> = HashMap::new();

        for edge in graph.edges() {
            downstream
                .entry(edge.origin_id)
                .or_default()
                .push(edge.destination_id);
            upstream
                .entry(edge.destination_id)
                .or_default()
                .push(edge.origin_id);
        }

        Self { downstream, upstream }
    }

    /// Immediate dependencies of a node
    pub fn upstream_of(&self, id: NodeId) -> &[NodeId] {
        self.upstream.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Immediate dependents of a node
    pub fn downstream_of(&self, id: NodeId) -> &[NodeId] {
        self.downstream.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// A node nothing reads from
    pub fn is_terminal(&self, id: NodeId) -> bool {
        self.downstream_of(id).is_empty()
    }
}

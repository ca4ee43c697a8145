//! Dependency-respecting execution order
//!
//! Depth-first post-order over upstream edges, seeded from every node in
//! node-list order. Uses an explicit stack and three-colour marking: a node
//! reached again while still on the stack is a back edge, and the graph is
//! rejected with [`PlanError::CycleDetected`].

use crate::index::DependencyIndex;
use flowrefine_core::{Graph, NodeId};
use std::collections::HashMap;

/// Errors that abort planning of a graph
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlanError {
    #[error("Cycle detected: {}", format_cycle(.cycle))]
    CycleDetected {
        /// Nodes on the cycle in data-flow order
        cycle: Vec<NodeId>,
    },
}

fn format_cycle(cycle: &[NodeId]) -> String {
    let mut parts: Vec<String> = cycle.iter().map(|id| id.to_string()).collect();
    if let Some(first) = cycle.first() {
        parts.push(first.to_string());
    }
    parts.join(" -> ")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    OnStack,
    Done,
}

/// Compute the execution order of every node in the graph
///
/// For every edge `(u, v)`, `u` appears before `v` in the result.
pub fn execution_order(graph: &Graph, index: &DependencyIndex) -> Result<Vec<NodeId>, PlanError> {
    let mut marks: HashMap<NodeId, Mark> = HashMap::with_capacity(graph.nodes().len());
    let mut order = Vec::with_capacity(graph.nodes().len());

    for node in graph.nodes() {
        if marks.contains_key(&node.id) {
            continue;
        }

        // Frames are (node, index of the next upstream node to visit)
        let mut stack: Vec<(NodeId, usize)> = vec![(node.id, 0)];
        marks.insert(node.id, Mark::OnStack);

        while let Some(&(current, cursor)) = stack.last() {
            let parents = index.upstream_of(current);

            let Some(&parent) = parents.get(cursor) else {
                marks.insert(current, Mark::Done);
                order.push(current);
                stack.pop();
                continue;
            };

            if let Some(top) = stack.last_mut() {
                top.1 += 1;
            }

            match marks.get(&parent) {
                None => {
                    marks.insert(parent, Mark::OnStack);
                    stack.push((parent, 0));
                }
                Some(Mark::OnStack) => {
                    let start = stack
                        .iter()
                        .position(|&(id, _)| id == parent)
                        .unwrap_or(0);
                    // The stack runs child -> parent; flip it into flow order
                    let cycle: Vec<NodeId> = stack[start..].iter().rev().map(|&(id, _)| id).collect();
                    tracing::warn!(?cycle, "workflow graph contains a cycle");
                    return Err(PlanError::CycleDetected { cycle });
                }
                Some(Mark::Done) => {}
            }
        }
    }

    tracing::debug!(nodes = order.len(), "computed execution order");
    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowrefine_core::{Category, Edge, Node};
    use pretty_assertions::assert_eq;

    fn graph(ids: &[NodeId], edges: &[(NodeId, NodeId)]) -> Graph {
        Graph::new(
            ids.iter().map(|&id| Node::new(id, "Formula", Category::Preparation)).collect(),
            edges.iter().map(|&(u, v)| Edge::new(u, v)).collect(),
        )
        .unwrap()
    }

    fn order_of(graph: &Graph) -> Result<Vec<NodeId>, PlanError> {
        execution_order(graph, &DependencyIndex::new(graph))
    }

    fn position(order: &[NodeId], id: NodeId) -> usize {
        order.iter().position(|&n| n == id).unwrap()
    }

    #[test]
    fn linear_chain() {
        let g = graph(&[1, 2, 3], &[(1, 2), (2, 3)]);
        assert_eq!(order_of(&g).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn chain_listed_backwards() {
        let g = graph(&[3, 2, 1], &[(1, 2), (2, 3)]);
        assert_eq!(order_of(&g).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn fan_in_puts_both_inputs_first() {
        let g = graph(&[3, 1, 2], &[(1, 3), (2, 3)]);
        let order = order_of(&g).unwrap();
        assert_eq!(order.len(), 3);
        assert!(position(&order, 1) < position(&order, 3));
        assert!(position(&order, 2) < position(&order, 3));
    }

    #[test]
    fn every_edge_respected_in_diamond() {
        let edges = [(1, 2), (1, 3), (2, 4), (3, 4), (4, 5), (6, 5)];
        let g = graph(&[5, 4, 3, 2, 1, 6], &edges);
        let order = order_of(&g).unwrap();
        assert_eq!(order.len(), 6);
        for (u, v) in edges {
            assert!(position(&order, u) < position(&order, v), "{u} before {v}");
        }
    }

    #[test]
    fn isolated_nodes_are_emitted_once() {
        let g = graph(&[7, 8], &[]);
        assert_eq!(order_of(&g).unwrap(), vec![7, 8]);
    }

    #[test]
    fn detects_two_node_cycle() {
        let g = graph(&[1, 2], &[(1, 2), (2, 1)]);
        assert_eq!(
            order_of(&g).unwrap_err(),
            PlanError::CycleDetected { cycle: vec![2, 1] }
        );
    }

    #[test]
    fn detects_cycle_behind_acyclic_prefix() {
        let g = graph(&[1, 2, 3, 4], &[(1, 2), (2, 3), (3, 4), (4, 2)]);
        let PlanError::CycleDetected { cycle } = order_of(&g).unwrap_err();
        let mut sorted = cycle.clone();
        sorted.sort();
        assert_eq!(sorted, vec![2, 3, 4]);
    }

    #[test]
    fn self_loop_is_a_cycle() {
        let g = graph(&[1], &[(1, 1)]);
        assert_eq!(
            order_of(&g).unwrap_err().to_string(),
            "Cycle detected: 1 -> 1"
        );
    }
}

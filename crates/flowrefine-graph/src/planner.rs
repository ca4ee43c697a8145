//! Classified execution plans

use crate::classify::LayerClassifier;
use crate::describe::describe;
use crate::index::DependencyIndex;
use crate::inventory::inventory;
use crate::lineage::{LineageSet, LineageTracer};
use crate::order::{execution_order, PlanError};
use flowrefine_core::{Graph, Inventory, Layer, Node, NodeId, PlanStep};
use std::collections::BTreeMap;

/// Supplies the optional SQL fragment attached to each plan step
pub trait HintProvider {
    fn hint(&mut self, node: &Node) -> Option<String>;
}

/// Plans without SQL hints
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHints;

impl HintProvider for NoHints {
    fn hint(&mut self, _node: &Node) -> Option<String> {
        None
    }
}

/// Turns a validated graph into an ordered, classified step list
pub struct Planner<'a> {
    graph: &'a Graph,
    index: DependencyIndex,
}

impl<'a> Planner<'a> {
    pub fn new(graph: &'a Graph) -> Self {
        Self {
            graph,
            index: DependencyIndex::new(graph),
        }
    }

    pub fn graph(&self) -> &'a Graph {
        self.graph
    }

    pub fn index(&self) -> &DependencyIndex {
        &self.index
    }

    /// Execution order over all nodes, containers included
    pub fn order(&self) -> Result<Vec<NodeId>, PlanError> {
        execution_order(self.graph, &self.index)
    }

    /// Build the plan, asking `hints` for each step's SQL fragment
    ///
    /// Containers are dropped, so `order` numbers stay contiguous.
    pub fn plan(&self, hints: &mut dyn HintProvider) -> Result<Vec<PlanStep>, PlanError> {
        let classifier = LayerClassifier::new(&self.index);
        let mut steps = Vec::new();

        for id in self.order()? {
            let Some(node) = self.graph.node(id) else {
                continue;
            };
            let Some(layer) = classifier.classify(node) else {
                continue;
            };

            steps.push(PlanStep {
                order: steps.len() + 1,
                node_id: id,
                description: describe(node),
                layer,
                sql_hint: hints.hint(node),
            });
        }

        tracing::debug!(steps = steps.len(), "built execution plan");
        Ok(steps)
    }

    /// Node ids per layer
    pub fn layers(&self) -> BTreeMap<Layer, Vec<NodeId>> {
        LayerClassifier::new(&self.index).assign(self.graph)
    }

    /// Where the workflow reads from and writes to
    pub fn inventory(&self) -> Inventory {
        inventory(self.graph)
    }

    /// Lineage between every source and target
    pub fn lineage(&self, max_paths: usize) -> LineageSet {
        LineageTracer::new(self.graph, &self.index)
            .with_max_paths(max_paths)
            .trace()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowrefine_core::{Category, Edge, ToolPayload};
    use pretty_assertions::assert_eq;

    struct ToolNames;

    impl HintProvider for ToolNames {
        fn hint(&mut self, node: &Node) -> Option<String> {
            Some(format!("-- {}", node.tool))
        }
    }

    fn three_step() -> Graph {
        Graph::new(
            vec![
                Node::new(1, "Input Data", Category::Input),
                Node::new(2, "Filter", Category::Preparation)
                    .with_payload(ToolPayload::Filter { expression: "[A] > 1".to_string() }),
                Node::new(3, "Output Data", Category::Output),
            ],
            vec![Edge::new(1, 2), Edge::new(2, 3)],
        )
        .unwrap()
    }

    #[test]
    fn plans_input_filter_output() {
        let graph = three_step();
        let steps = Planner::new(&graph).plan(&mut NoHints).unwrap();

        let ids: Vec<NodeId> = steps.iter().map(|s| s.node_id).collect();
        let layers: Vec<Layer> = steps.iter().map(|s| s.layer).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(layers, vec![Layer::Bronze, Layer::Silver, Layer::Gold]);
        assert_eq!(steps[1].description, "Filter : [A] > 1");
        assert!(steps.iter().all(|s| s.sql_hint.is_none()));
    }

    #[test]
    fn containers_do_not_consume_order_numbers() {
        let graph = Graph::new(
            vec![
                Node::new(9, "Tool Container", Category::Container),
                Node::new(1, "Input Data", Category::Input),
                Node::new(2, "Output Data", Category::Output),
            ],
            vec![Edge::new(1, 2)],
        )
        .unwrap();

        let steps = Planner::new(&graph).plan(&mut ToolNames).unwrap();
        let orders: Vec<(usize, NodeId)> = steps.iter().map(|s| (s.order, s.node_id)).collect();
        assert_eq!(orders, vec![(1, 1), (2, 2)]);
        assert_eq!(steps[0].sql_hint.as_deref(), Some("-- Input Data"));
    }

    #[test]
    fn cycle_aborts_planning() {
        let graph = Graph::new(
            vec![
                Node::new(1, "Formula", Category::Preparation),
                Node::new(2, "Formula", Category::Preparation),
            ],
            vec![Edge::new(1, 2), Edge::new(2, 1)],
        )
        .unwrap();

        assert!(matches!(
            Planner::new(&graph).plan(&mut NoHints),
            Err(PlanError::CycleDetected { .. })
        ));
    }
}

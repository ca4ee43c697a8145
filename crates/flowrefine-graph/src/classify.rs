//! Storage layer classification

use crate::index::DependencyIndex;
use flowrefine_core::{Category, Graph, Layer, Node, NodeId, Refinement};
use std::collections::BTreeMap;

/// Assigns every data-processing node a bronze/silver/gold layer
///
/// The category table decides first; a node nothing reads from is always
/// promoted to gold. Containers never receive a layer.
pub struct LayerClassifier<'a> {
    index: &'a DependencyIndex,
}

impl<'a> LayerClassifier<'a> {
    pub fn new(index: &'a DependencyIndex) -> Self {
        Self { index }
    }

    /// Static category -> layer table
    pub fn category_layer(category: Category, refinement: Option<Refinement>) -> Option<Layer> {
        if category == Category::Container {
            return None;
        }
        if refinement == Some(Refinement::InDatabase) {
            return Some(Layer::Silver);
        }

        Some(match category {
            Category::Input => Layer::Bronze,
            Category::Preparation
            | Category::Join
            | Category::Transform
            | Category::Parse
            | Category::Unknown => Layer::Silver,
            Category::Output | Category::Reporting => Layer::Gold,
            Category::Container => return None,
        })
    }

    /// Layer of a single node, or `None` for containers
    pub fn classify(&self, node: &Node) -> Option<Layer> {
        if node.is_container() {
            return None;
        }
        let layer = Self::category_layer(node.category, node.refinement)?;
        if self.index.is_terminal(node.id) {
            return Some(Layer::Gold);
        }
        Some(layer)
    }

    /// Node ids grouped by layer, in node-list order
    ///
    /// All three layers are always present, possibly empty.
    pub fn assign(&self, graph: &Graph) -> BTreeMap<Layer, Vec<NodeId>> {
        let mut mapping: BTreeMap<Layer, Vec<NodeId>> =
            Layer::ALL.iter().map(|&layer| (layer, Vec::new())).collect();

        for node in graph.nodes() {
            if let Some(layer) = self.classify(node) {
                mapping.entry(layer).or_default().push(node.id);
            }
        }

        mapping
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowrefine_core::Edge;
    use pretty_assertions::assert_eq;

    fn workflow() -> Graph {
        Graph::new(
            vec![
                Node::new(1, "Input Data", Category::Input),
                Node::new(2, "Filter", Category::Preparation),
                Node::new(3, "Summarize", Category::Transform),
                Node::new(4, "Output Data", Category::Output),
                Node::new(5, "Tool Container", Category::Container),
                Node::new(6, "Join In-DB", Category::Join).with_refinement(Refinement::InDatabase),
            ],
            vec![Edge::new(1, 2), Edge::new(2, 4), Edge::new(2, 3), Edge::new(1, 6), Edge::new(6, 4)],
        )
        .unwrap()
    }

    #[test]
    fn category_table() {
        assert_eq!(LayerClassifier::category_layer(Category::Input, None), Some(Layer::Bronze));
        assert_eq!(LayerClassifier::category_layer(Category::Parse, None), Some(Layer::Silver));
        assert_eq!(LayerClassifier::category_layer(Category::Reporting, None), Some(Layer::Gold));
        assert_eq!(LayerClassifier::category_layer(Category::Container, None), None);
        assert_eq!(
            LayerClassifier::category_layer(Category::Output, Some(Refinement::InDatabase)),
            Some(Layer::Silver)
        );
        assert_eq!(
            LayerClassifier::category_layer(Category::Input, Some(Refinement::Macro)),
            Some(Layer::Bronze)
        );
    }

    #[test]
    fn terminal_transform_is_gold() {
        let graph = workflow();
        let index = DependencyIndex::new(&graph);
        let classifier = LayerClassifier::new(&index);

        assert_eq!(classifier.classify(graph.node(3).unwrap()), Some(Layer::Gold));
        assert_eq!(classifier.classify(graph.node(2).unwrap()), Some(Layer::Silver));
        assert_eq!(classifier.classify(graph.node(6).unwrap()), Some(Layer::Silver));
    }

    #[test]
    fn containers_are_excluded() {
        let graph = workflow();
        let index = DependencyIndex::new(&graph);
        let classifier = LayerClassifier::new(&index);

        // Terminal, but still never classified
        assert!(graph.node(5).unwrap().is_container());
        assert_eq!(classifier.classify(graph.node(5).unwrap()), None);

        let mapping = classifier.assign(&graph);
        assert_eq!(mapping[&Layer::Bronze], vec![1]);
        assert_eq!(mapping[&Layer::Silver], vec![2, 6]);
        assert_eq!(mapping[&Layer::Gold], vec![3, 4]);
    }

    #[test]
    fn empty_graph_has_all_layers() {
        let graph = Graph::new(Vec::new(), Vec::new()).unwrap();
        let index = DependencyIndex::new(&graph);
        let mapping = LayerClassifier::new(&index).assign(&graph);
        assert_eq!(mapping.len(), 3);
        assert!(mapping.values().all(Vec::is_empty));
    }
}

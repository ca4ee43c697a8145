//! Workflow graph model
//!
//! Immutable node/edge representation of a parsed workflow. Graphs are
//! validated on construction (including when deserialized), so downstream
//! stages may assume every edge references an existing node.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Tool identifier, unique within a workflow
pub type NodeId = u32;

/// Tool category as reported by the workflow parser
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Input,
    Output,
    Preparation,
    Join,
    Transform,
    Parse,
    Reporting,
    /// Organizational grouping only, never transforms data
    Container,
    Unknown,
}

impl Default for Category {
    fn default() -> Self {
        Self::Unknown
    }
}

/// Refinement of a category for macro and in-database tools
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Refinement {
    Macro,
    InDatabase,
}

/// One calculated field of a Formula tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormulaField {
    pub field: String,
    pub expression: String,
}

/// One sort key of a Sort tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortField {
    pub field: String,
    #[serde(default = "default_sort_order")]
    pub order: String,
}

fn default_sort_order() -> String {
    "ASC".to_string()
}

/// Key pair of a Join tool (left field = right field)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinKey {
    pub left: String,
    pub right: String,
}

/// Aggregation descriptor of a Summarize tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Aggregation {
    /// Source action name, e.g. `Sum` or `CountDistinct`
    pub action: String,
    pub field: String,
    #[serde(default)]
    pub output_name: Option<String>,
}

impl Aggregation {
    /// Output column name, falling back to the aggregated field
    pub fn output(&self) -> &str {
        self.output_name.as_deref().unwrap_or(&self.field)
    }
}

/// Tool-specific configuration, one variant per tool family
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ToolPayload {
    Input {
        #[serde(default)]
        source_path: Option<String>,
        #[serde(default)]
        table_name: Option<String>,
        #[serde(default)]
        sql_query: Option<String>,
        #[serde(default)]
        connection: Option<String>,
    },
    Output {
        #[serde(default)]
        target_path: Option<String>,
        #[serde(default)]
        table_name: Option<String>,
        #[serde(default)]
        connection: Option<String>,
    },
    Filter {
        expression: String,
    },
    Formula {
        #[serde(default)]
        formulas: Vec<FormulaField>,
    },
    Select {
        #[serde(default)]
        fields: Vec<String>,
    },
    Sort {
        #[serde(default)]
        fields: Vec<SortField>,
    },
    Join {
        #[serde(default)]
        keys: Vec<JoinKey>,
        #[serde(default)]
        join_type: Option<String>,
    },
    Union,
    Summarize {
        #[serde(default)]
        group_by: Vec<String>,
        #[serde(default)]
        aggregations: Vec<Aggregation>,
    },
    Macro {
        #[serde(default)]
        path: Option<String>,
    },
    /// Tools whose configuration is not interpreted
    Generic,
}

impl Default for ToolPayload {
    fn default() -> Self {
        Self::Generic
    }
}

impl ToolPayload {
    /// Formula expressions carried by this payload, keyed by the field
    /// they belong to (`expression` for filters).
    pub fn expressions(&self) -> Vec<(&str, &str)> {
        match self {
            Self::Filter { expression } => vec![("expression", expression.as_str())],
            Self::Formula { formulas } => formulas
                .iter()
                .map(|f| (f.field.as_str(), f.expression.as_str()))
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// A single tool in a workflow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,

    /// Simplified tool name, e.g. `Filter` or `Input Data`
    pub tool: String,

    #[serde(default)]
    pub category: Category,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refinement: Option<Refinement>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotation: Option<String>,

    #[serde(default)]
    pub payload: ToolPayload,
}

impl Node {
    /// Create a node with a generic payload
    pub fn new(id: NodeId, tool: impl Into<String>, category: Category) -> Self {
        Self {
            id,
            tool: tool.into(),
            category,
            refinement: None,
            annotation: None,
            payload: ToolPayload::Generic,
        }
    }

    /// Set the payload
    pub fn with_payload(mut self, payload: ToolPayload) -> Self {
        self.payload = payload;
        self
    }

    /// Set the annotation
    pub fn with_annotation(mut self, annotation: impl Into<String>) -> Self {
        self.annotation = Some(annotation.into());
        self
    }

    /// Set the category refinement
    pub fn with_refinement(mut self, refinement: Refinement) -> Self {
        self.refinement = Some(refinement);
        self
    }

    /// Human-readable name, including the annotation when present
    pub fn display_name(&self) -> String {
        match &self.annotation {
            Some(annotation) => format!("{}: {}", self.tool, annotation),
            None => self.tool.clone(),
        }
    }

    pub fn is_container(&self) -> bool {
        self.category == Category::Container
    }

    pub fn is_macro(&self) -> bool {
        self.refinement == Some(Refinement::Macro) || matches!(self.payload, ToolPayload::Macro { .. })
    }
}

/// A connection between two tools
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub origin_id: NodeId,
    #[serde(default = "default_anchor")]
    pub origin_anchor: String,
    pub destination_id: NodeId,
    #[serde(default = "default_input_anchor")]
    pub destination_anchor: String,
}

fn default_anchor() -> String {
    "Output".to_string()
}

fn default_input_anchor() -> String {
    "Input".to_string()
}

impl Edge {
    /// Edge between the default anchors of two tools
    pub fn new(origin_id: NodeId, destination_id: NodeId) -> Self {
        Self {
            origin_id,
            origin_anchor: "Output".to_string(),
            destination_id,
            destination_anchor: "Input".to_string(),
        }
    }

    /// Edge into a named destination anchor (e.g. `Left`/`Right` of a join)
    pub fn to_anchor(origin_id: NodeId, destination_id: NodeId, anchor: impl Into<String>) -> Self {
        Self {
            destination_anchor: anchor.into(),
            ..Self::new(origin_id, destination_id)
        }
    }
}

/// Structural errors that reject a graph before any planning
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    #[error("Duplicate node id {0}")]
    DuplicateNode(NodeId),

    #[error("Edge {origin_id} -> {destination_id} references missing node {missing}")]
    DanglingEdge {
        origin_id: NodeId,
        destination_id: NodeId,
        missing: NodeId,
    },
}

#[derive(Deserialize)]
struct RawGraph {
    #[serde(default)]
    nodes: Vec<Node>,
    #[serde(default)]
    edges: Vec<Edge>,
}

/// Validated workflow graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawGraph")]
pub struct Graph {
    nodes: Vec<Node>,
    edges: Vec<Edge>,

    #[serde(skip)]
    positions: HashMap<NodeId, usize>,
}

impl TryFrom<RawGraph> for Graph {
    type Error = GraphError;

    fn try_from(raw: RawGraph) -> Result<Self, Self::Error> {
        Graph::new(raw.nodes, raw.edges)
    }
}

impl Graph {
    /// Build a graph, rejecting duplicate ids and dangling edges
    pub fn new(nodes: Vec<Node>, edges: Vec<Edge>) -> Result<Self, GraphError> {
        let mut positions = HashMap::with_capacity(nodes.len());
        for (idx, node) in nodes.iter().enumerate() {
            if positions.insert(node.id, idx).is_some() {
                return Err(GraphError::DuplicateNode(node.id));
            }
        }

        for edge in &edges {
            for endpoint in [edge.origin_id, edge.destination_id] {
                if !positions.contains_key(&endpoint) {
                    return Err(GraphError::DanglingEdge {
                        origin_id: edge.origin_id,
                        destination_id: edge.destination_id,
                        missing: endpoint,
                    });
                }
            }
        }

        Ok(Self { nodes, edges, positions })
    }

    /// Load a graph from its JSON form
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Look up a node by id
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.positions.get(&id).map(|&idx| &self.nodes[idx])
    }

    /// Input tools with no incoming edges
    pub fn sources(&self) -> Vec<&Node> {
        let with_incoming: HashSet<NodeId> = self.edges.iter().map(|e| e.destination_id).collect();
        self.nodes
            .iter()
            .filter(|n| n.category == Category::Input && !with_incoming.contains(&n.id))
            .collect()
    }

    /// Output tools with no outgoing edges
    pub fn targets(&self) -> Vec<&Node> {
        let with_outgoing: HashSet<NodeId> = self.edges.iter().map(|e| e.origin_id).collect();
        self.nodes
            .iter()
            .filter(|n| n.category == Category::Output && !with_outgoing.contains(&n.id))
            .collect()
    }

    /// All edges feeding into a node
    pub fn upstream_edges(&self, id: NodeId) -> Vec<&Edge> {
        self.edges.iter().filter(|e| e.destination_id == id).collect()
    }

    /// The node connected to a specific input anchor (case-insensitive)
    pub fn upstream_by_anchor(&self, id: NodeId, anchor: &str) -> Option<&Node> {
        self.edges
            .iter()
            .find(|e| e.destination_id == id && e.destination_anchor.eq_ignore_ascii_case(anchor))
            .and_then(|e| self.node(e.origin_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linear() -> Graph {
        Graph::new(
            vec![
                Node::new(1, "Input Data", Category::Input),
                Node::new(2, "Filter", Category::Preparation),
                Node::new(3, "Output Data", Category::Output),
            ],
            vec![Edge::new(1, 2), Edge::new(2, 3)],
        )
        .unwrap()
    }

    #[test]
    fn sources_and_targets() {
        let graph = linear();
        let sources: Vec<NodeId> = graph.sources().iter().map(|n| n.id).collect();
        let targets: Vec<NodeId> = graph.targets().iter().map(|n| n.id).collect();
        assert_eq!(sources, vec![1]);
        assert_eq!(targets, vec![3]);
    }

    #[test]
    fn rejects_dangling_edge() {
        let err = Graph::new(
            vec![Node::new(1, "Input Data", Category::Input)],
            vec![Edge::new(1, 9)],
        )
        .unwrap_err();

        assert_eq!(
            err,
            GraphError::DanglingEdge { origin_id: 1, destination_id: 9, missing: 9 }
        );
    }

    #[test]
    fn rejects_duplicate_ids() {
        let err = Graph::new(
            vec![
                Node::new(4, "Filter", Category::Preparation),
                Node::new(4, "Sort", Category::Preparation),
            ],
            Vec::new(),
        )
        .unwrap_err();

        assert_eq!(err, GraphError::DuplicateNode(4));
    }

    #[test]
    fn json_goes_through_validation() {
        let json = r#"{
            "nodes": [
                {"id": 1, "tool": "Input Data", "category": "input",
                 "payload": {"kind": "input", "table_name": "orders"}},
                {"id": 2, "tool": "Filter", "category": "preparation",
                 "payload": {"kind": "filter", "expression": "[Amount] > 0"}}
            ],
            "edges": [
                {"origin_id": 1, "destination_id": 2}
            ]
        }"#;

        let graph = Graph::from_json(json).unwrap();
        assert_eq!(graph.nodes().len(), 2);
        assert_eq!(graph.node(2).unwrap().payload.expressions(), vec![("expression", "[Amount] > 0")]);

        let broken = r#"{"nodes": [{"id": 1, "tool": "Input Data"}], "edges": [{"origin_id": 1, "destination_id": 2}]}"#;
        assert!(Graph::from_json(broken).is_err());
    }

    #[test]
    fn anchor_lookup_is_case_insensitive() {
        let graph = Graph::new(
            vec![
                Node::new(1, "Input Data", Category::Input),
                Node::new(2, "Input Data", Category::Input),
                Node::new(3, "Join", Category::Join),
            ],
            vec![Edge::to_anchor(1, 3, "Left"), Edge::to_anchor(2, 3, "Right")],
        )
        .unwrap();

        assert_eq!(graph.upstream_by_anchor(3, "right").map(|n| n.id), Some(2));
        assert_eq!(graph.upstream_edges(3).len(), 2);
    }

    #[test]
    fn display_name_uses_annotation() {
        let node = Node::new(5, "Filter", Category::Preparation).with_annotation("active only");
        assert_eq!(node.display_name(), "Filter: active only");
    }
}

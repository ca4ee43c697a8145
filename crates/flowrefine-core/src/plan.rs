//! Storage layers and execution plan steps

use serde::{Deserialize, Serialize};
use crate::graph::NodeId;

/// Storage layer of the target lakehouse
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layer {
    /// Raw / staging data
    Bronze,

    /// Cleaned, joined, intermediate data
    Silver,

    /// Business-ready data
    Gold,
}

impl Layer {
    pub const ALL: [Layer; 3] = [Layer::Bronze, Layer::Silver, Layer::Gold];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bronze => "bronze",
            Self::Silver => "silver",
            Self::Gold => "gold",
        }
    }

    /// Conventional dbt model prefix for the layer
    pub fn model_prefix(&self) -> &'static str {
        match self {
            Self::Bronze => "stg_",
            Self::Silver => "int_",
            Self::Gold => "fct_",
        }
    }
}

impl std::fmt::Display for Layer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One step of an execution plan
///
/// Produced once per node per planning pass and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanStep {
    /// 1-based position in execution order
    pub order: usize,

    pub node_id: NodeId,

    pub description: String,

    pub layer: Layer,

    /// Generated SQL fragment, when the tool has a translation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sql_hint: Option<String>,
}

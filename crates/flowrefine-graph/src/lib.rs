//! Workflow dependency analysis
//!
//! This crate handles:
//! - Building upstream/downstream adjacency for a workflow graph
//! - Dependency-respecting execution order with cycle detection
//! - Bounded source-to-target lineage path enumeration
//! - Storage layer classification (bronze/silver/gold)
//! - Assembling classified plan steps
//! - Source/target inventory

pub mod index;
pub mod order;
pub mod lineage;
pub mod classify;
pub mod describe;
pub mod planner;
pub mod inventory;

pub use index::DependencyIndex;
pub use order::{execution_order, PlanError};
pub use lineage::{find_paths, Lineage, LineageSet, LineageTracer};
pub use classify::LayerClassifier;
pub use describe::describe;
pub use inventory::{inventory, source_kind, target_kind};
pub use planner::{HintProvider, NoHints, Planner};

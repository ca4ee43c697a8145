//! FlowRefine Core
//!
//! Core domain model shared by every stage of a workflow migration:
//! the workflow graph handed over by the native-format parser, the
//! storage layers and plan steps produced for generators, and the
//! stable diagnostic codes surfaced in review reports.
//! Never rename diagnostic codes - they are part of the public API.

pub mod diagnostic;
pub mod graph;
pub mod plan;
pub mod report;
pub mod config;
pub mod inventory;

pub use diagnostic::{Diagnostic, DiagnosticCode, Severity, Location};
pub use graph::{
    Aggregation, Category, Edge, FormulaField, Graph, GraphError, JoinKey, Node, NodeId,
    Refinement, SortField, ToolPayload,
};
pub use plan::{Layer, PlanStep};
pub use report::{MigrationReport, ReportVersion, ReportSummary};
pub use inventory::{Endpoint, EndpointKind, Inventory};
pub use config::{Config, ConfigError, LineageConfig, QuoteStyle, SeverityThreshold, TranspilerConfig};

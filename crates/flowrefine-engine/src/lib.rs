//! FlowRefine engine - workflow migration analysis
//!
//! This crate ties the graph planner and the formula transpiler together:
//! - SQL hint generation per tool
//! - Diagnostics tagged with the tool and field they came from
//! - Severity overrides from configuration
//! - Migration report assembly

pub mod hints;
pub mod analyzer;

pub use hints::SqlHintGenerator;
pub use analyzer::{Analysis, AnalyzeError, WorkflowAnalyzer};

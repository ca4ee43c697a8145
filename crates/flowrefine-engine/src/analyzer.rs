//! Workflow analysis
//!
//! Runs planning, hint generation and lineage tracing over one graph.
//! Only structural problems (cycles) abort; everything else becomes a
//! diagnostic next to best-effort output.

use crate::hints::SqlHintGenerator;
use flowrefine_core::{
    Config, Diagnostic, DiagnosticCode, Graph, Inventory, Layer, Location, MigrationReport, NodeId, PlanStep,
};
use flowrefine_formula::{FunctionRegistry, Transpiler};
use flowrefine_graph::{LineageSet, PlanError, Planner};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalyzeError {
    #[error(transparent)]
    Plan(#[from] PlanError),
}

/// Everything learned about one workflow
#[derive(Debug, Clone)]
pub struct Analysis {
    pub steps: Vec<PlanStep>,
    pub layers: BTreeMap<Layer, Vec<NodeId>>,
    pub lineage: LineageSet,
    pub inventory: Inventory,
    pub diagnostics: Vec<Diagnostic>,
}

impl Analysis {
    /// Plan step for a tool, if it was planned
    pub fn step_for(&self, node_id: NodeId) -> Option<&PlanStep> {
        self.steps.iter().find(|s| s.node_id == node_id)
    }

    /// Diagnostics raised for one tool
    pub fn diagnostics_for(&self, node_id: NodeId) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(move |d| d.location.as_ref().and_then(|l| l.node_id) == Some(node_id))
    }

    pub fn into_report(self, workflow: impl Into<String>) -> MigrationReport {
        MigrationReport::new(workflow, self.steps, self.layers, self.diagnostics)
            .with_inventory(self.inventory)
    }
}

pub struct WorkflowAnalyzer<'a> {
    planner: Planner<'a>,
    config: &'a Config,
    registry: Arc<FunctionRegistry>,
}

impl<'a> WorkflowAnalyzer<'a> {
    pub fn new(graph: &'a Graph, config: &'a Config) -> Self {
        Self {
            planner: Planner::new(graph),
            config,
            registry: FunctionRegistry::shared_trino(),
        }
    }

    /// Use a different function registry for expression conversion
    pub fn with_registry(mut self, registry: Arc<FunctionRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn planner(&self) -> &Planner<'a> {
        &self.planner
    }

    pub fn analyze(&self) -> Result<Analysis, AnalyzeError> {
        let transpiler = Transpiler::new(self.registry.clone(), self.config.transpiler.clone());
        let mut hints =
            SqlHintGenerator::new(transpiler, &self.config.severity).with_graph(self.planner.graph());

        let steps = self.planner.plan(&mut hints)?;
        let mut diagnostics = hints.into_diagnostics();

        let layers = self.planner.layers();
        let max_paths = self.config.lineage.max_paths;
        let lineage = self.planner.lineage(max_paths);

        for &(source, target) in &lineage.truncated {
            let mut diagnostic = Diagnostic::from_code(
                DiagnosticCode::PlanLineageTruncated,
                format!(
                    "Lineage from tool {} to tool {} truncated at {} paths",
                    source, target, max_paths
                ),
            )
            .with_location(Location::node(target));
            diagnostic.severity = self
                .config
                .severity
                .get_severity(diagnostic.code, diagnostic.severity);
            diagnostics.push(diagnostic);
        }

        let inventory = self.planner.inventory();

        tracing::info!(
            steps = steps.len(),
            sources = inventory.sources.len(),
            targets = inventory.targets.len(),
            lineages = lineage.lineages.len(),
            diagnostics = diagnostics.len(),
            "Analyzed workflow"
        );

        Ok(Analysis {
            steps,
            layers,
            lineage,
            inventory,
            diagnostics,
        })
    }
}

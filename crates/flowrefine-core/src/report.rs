//! Migration review report (stable v1)
//!
//! This schema is STABLE and VERSIONED.
//! Breaking changes require a new version.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use crate::diagnostic::{Diagnostic, Severity};
use crate::graph::NodeId;
use crate::inventory::Inventory;
use crate::plan::{Layer, PlanStep};

/// Report schema version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportVersion {
    /// Major version (breaking changes)
    pub major: u32,

    /// Minor version (backward-compatible additions)
    pub minor: u32,
}

impl ReportVersion {
    /// Current report schema version
    pub const CURRENT: ReportVersion = ReportVersion { major: 1, minor: 1 };
}

impl std::fmt::Display for ReportVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Summary statistics for a report
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    /// Total number of diagnostics
    pub total: usize,

    /// Number of errors
    pub errors: usize,

    /// Number of warnings
    pub warnings: usize,

    /// Number of info messages
    pub info: usize,

    /// Number of plan steps
    pub steps: usize,

    /// Number of tools that need manual review
    pub tools_needing_review: usize,
}

/// Consolidated "needs manual review" report for one workflow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationReport {
    /// Schema version
    pub version: ReportVersion,

    /// Workflow name
    pub workflow: String,

    /// Timestamp (ISO 8601)
    pub timestamp: String,

    /// Summary statistics
    pub summary: ReportSummary,

    /// Ordered execution plan
    pub steps: Vec<PlanStep>,

    /// Node ids per storage layer
    pub layers: BTreeMap<Layer, Vec<NodeId>>,

    /// Sources and targets (added in 1.1)
    #[serde(default)]
    pub inventory: Inventory,

    /// All diagnostics
    pub diagnostics: Vec<Diagnostic>,
}

impl MigrationReport {
    /// Build a report from a finished plan
    pub fn new(
        workflow: impl Into<String>,
        steps: Vec<PlanStep>,
        layers: BTreeMap<Layer, Vec<NodeId>>,
        diagnostics: Vec<Diagnostic>,
    ) -> Self {
        let mut report = Self {
            version: ReportVersion::CURRENT,
            workflow: workflow.into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            summary: ReportSummary {
                steps: steps.len(),
                ..ReportSummary::default()
            },
            steps,
            layers,
            inventory: Inventory::default(),
            diagnostics: Vec::new(),
        };

        for diagnostic in diagnostics {
            report.count(&diagnostic);
            report.diagnostics.push(diagnostic);
        }
        report.summary.tools_needing_review = report.review_worklist().len();

        report
    }

    /// Add a diagnostic to the report
    pub fn add_diagnostic(&mut self, diagnostic: Diagnostic) {
        self.count(&diagnostic);
        if let Some(node_id) = review_target(&diagnostic) {
            let already = self
                .diagnostics
                .iter()
                .any(|d| review_target(d) == Some(node_id));
            if !already {
                self.summary.tools_needing_review += 1;
            }
        }
        self.diagnostics.push(diagnostic);
    }

    fn count(&mut self, diagnostic: &Diagnostic) {
        match diagnostic.severity {
            Severity::Error => self.summary.errors += 1,
            Severity::Warn => self.summary.warnings += 1,
            Severity::Info => self.summary.info += 1,
        }
        self.summary.total += 1;
    }

    /// Attach the source/target inventory
    pub fn with_inventory(mut self, inventory: Inventory) -> Self {
        self.inventory = inventory;
        self
    }

    /// Check if the report has any errors
    pub fn has_errors(&self) -> bool {
        self.summary.errors > 0
    }

    /// Tools with at least one warning or error, in first-seen order
    pub fn review_worklist(&self) -> Vec<NodeId> {
        let mut seen = HashSet::new();
        self.diagnostics
            .iter()
            .filter_map(review_target)
            .filter(|node_id| seen.insert(*node_id))
            .collect()
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Save to file
    pub fn save_to_file(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let json = self.to_json()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        std::fs::write(path, json)
    }
}

/// Tool a warning or error points at
fn review_target(diagnostic: &Diagnostic) -> Option<NodeId> {
    if diagnostic.severity < Severity::Warn {
        return None;
    }
    diagnostic.location.as_ref().and_then(|l| l.node_id)
}

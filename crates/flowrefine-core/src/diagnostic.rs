//! Diagnostic codes and review notes
//!
//! IMPORTANT: Diagnostic codes are versioned and stable.
//! NEVER rename or remove codes - they are part of the public API.
//! Add new codes with new names only.

use serde::{Deserialize, Serialize};
use crate::graph::NodeId;

/// Diagnostic code registry (v1)
///
/// These codes are STABLE and VERSIONED.
/// Do NOT rename or remove codes - only add new ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiagnosticCode {
    // Formula conversion (1xxx)
    /// A function call has no mapping in the function registry
    FormulaUnknownFunction,

    /// A mapped function was called with the wrong number of arguments
    FormulaArityMismatch,

    /// An opening or closing parenthesis has no partner
    FormulaUnbalancedParens,

    /// A string literal runs to the end of the expression
    FormulaUnterminatedString,

    /// Switch() called without a value/default or with an odd case list
    FormulaInvalidSwitch,

    /// The function is known but has no SQL expression equivalent
    FormulaUnsupportedFunction,

    /// IIF() called with fewer or more than three arguments
    FormulaConditionalArity,

    // Planning (2xxx)
    /// A tool has no SQL translation and needs manual work
    PlanCustomLogic,

    /// Lineage enumeration stopped at the configured path cap
    PlanLineageTruncated,

    // General warnings (9xxx)
    /// General informational message
    Info,

    /// General warning message
    Warning,
}

impl DiagnosticCode {
    /// Get the diagnostic code as a stable string identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FormulaUnknownFunction => "FORMULA_UNKNOWN_FUNCTION",
            Self::FormulaArityMismatch => "FORMULA_ARITY_MISMATCH",
            Self::FormulaUnbalancedParens => "FORMULA_UNBALANCED_PARENS",
            Self::FormulaUnterminatedString => "FORMULA_UNTERMINATED_STRING",
            Self::FormulaInvalidSwitch => "FORMULA_INVALID_SWITCH",
            Self::FormulaUnsupportedFunction => "FORMULA_UNSUPPORTED_FUNCTION",
            Self::FormulaConditionalArity => "FORMULA_CONDITIONAL_ARITY",
            Self::PlanCustomLogic => "PLAN_CUSTOM_LOGIC",
            Self::PlanLineageTruncated => "PLAN_LINEAGE_TRUNCATED",
            Self::Info => "INFO",
            Self::Warning => "WARNING",
        }
    }

    /// Default severity when no override is configured
    pub fn default_severity(&self) -> Severity {
        match self {
            Self::FormulaUnknownFunction
            | Self::FormulaUnbalancedParens
            | Self::FormulaUnterminatedString
            | Self::FormulaInvalidSwitch => Severity::Error,
            Self::FormulaArityMismatch
            | Self::FormulaUnsupportedFunction
            | Self::FormulaConditionalArity
            | Self::PlanCustomLogic
            | Self::Warning => Severity::Warn,
            Self::PlanLineageTruncated | Self::Info => Severity::Info,
        }
    }
}

impl std::fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Diagnostic severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational message
    Info,

    /// Warning - converted output should be reviewed
    Warn,

    /// Error - output contains a placeholder that needs manual work
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Where in a workflow a diagnostic originated
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    /// Tool the diagnostic belongs to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_id: Option<NodeId>,

    /// Payload field (e.g. a formula's output field)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,

    /// Byte offset into the expression text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<usize>,
}

impl Location {
    /// Location pointing at a whole node
    pub fn node(node_id: NodeId) -> Self {
        Self {
            node_id: Some(node_id),
            ..Self::default()
        }
    }

    /// Location pointing at an offset inside an expression
    pub fn offset(offset: usize) -> Self {
        Self {
            offset: Some(offset),
            ..Self::default()
        }
    }

    /// Attach a payload field name
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }
}

/// A diagnostic message with structured metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Stable diagnostic code
    pub code: DiagnosticCode,

    /// Severity level
    pub severity: Severity,

    /// Human-readable message
    pub message: String,

    /// Source location (best-effort)
    pub location: Option<Location>,
}

impl Diagnostic {
    /// Create a new diagnostic with minimal fields
    pub fn new(code: DiagnosticCode, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            code,
            severity,
            message: message.into(),
            location: None,
        }
    }

    /// Create a diagnostic using the code's default severity
    pub fn from_code(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self::new(code, code.default_severity(), message)
    }

    /// Set the location
    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    /// Tag the diagnostic with the node (and optionally field) it came from,
    /// keeping any offset already recorded.
    pub fn attach_to(mut self, node_id: NodeId, field: Option<&str>) -> Self {
        let mut location = self.location.take().unwrap_or_default();
        location.node_id = Some(node_id);
        if let Some(field) = field {
            location.field = Some(field.to_string());
        }
        self.location = Some(location);
        self
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(node_id) = self.location.as_ref().and_then(|l| l.node_id) {
            write!(f, " (tool {})", node_id)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostic_code_stability() {
        // Ensure codes are stable strings
        assert_eq!(DiagnosticCode::FormulaUnknownFunction.as_str(), "FORMULA_UNKNOWN_FUNCTION");
        assert_eq!(DiagnosticCode::PlanLineageTruncated.as_str(), "PLAN_LINEAGE_TRUNCATED");
    }

    #[test]
    fn diagnostic_serialization() {
        let diag = Diagnostic::from_code(
            DiagnosticCode::FormulaUnknownFunction,
            "No mapping for function: FooBar",
        )
        .with_location(Location::node(7).with_field("Total"));

        let json = serde_json::to_string(&diag).unwrap();
        assert!(json.contains("FORMULA_UNKNOWN_FUNCTION"));
        assert!(json.contains("error"));
        assert!(json.contains("\"node_id\":7"));
    }

    #[test]
    fn attach_keeps_offset() {
        let diag = Diagnostic::from_code(DiagnosticCode::FormulaUnbalancedParens, "unbalanced")
            .with_location(Location::offset(4))
            .attach_to(3, Some("expression"));

        let location = diag.location.unwrap();
        assert_eq!(location.node_id, Some(3));
        assert_eq!(location.offset, Some(4));
        assert_eq!(location.field.as_deref(), Some("expression"));
    }

    #[test]
    fn display_includes_tool() {
        let diag = Diagnostic::from_code(DiagnosticCode::Warning, "check me").attach_to(12, None);
        assert_eq!(diag.to_string(), "[WARNING] check me (tool 12)");
    }
}

//! SQL hints for plan steps
//!
//! Each tool gets a short Trino SQL fragment showing how it maps onto a
//! model. Formula and filter expressions go through the transpiler; every
//! problem it reports is tagged with the tool and field it came from.

use flowrefine_core::{
    Aggregation, Diagnostic, DiagnosticCode, Graph, JoinKey, Location, Node, SeverityThreshold, SortField,
    ToolPayload,
};
use flowrefine_formula::{convert_aggregation, Transpiler};
use flowrefine_graph::HintProvider;

/// Fields shown in a Select hint
const SELECT_FIELD_LIMIT: usize = 10;

const CUSTOM_LOGIC: &str = "-- Custom logic required";

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Generates SQL hints and collects the diagnostics raised along the way
pub struct SqlHintGenerator<'c> {
    transpiler: Transpiler,
    graph: Option<&'c Graph>,
    severity: &'c SeverityThreshold,
    diagnostics: Vec<Diagnostic>,
}

impl<'c> SqlHintGenerator<'c> {
    pub fn new(transpiler: Transpiler, severity: &'c SeverityThreshold) -> Self {
        Self {
            transpiler,
            graph: None,
            severity,
            diagnostics: Vec::new(),
        }
    }

    /// Resolve join inputs against `graph` when describing joins
    pub fn with_graph(mut self, graph: &'c Graph) -> Self {
        self.graph = Some(graph);
        self
    }

    /// Diagnostics collected so far
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    fn push(&mut self, mut diagnostic: Diagnostic) {
        diagnostic.severity = self.severity.get_severity(diagnostic.code, diagnostic.severity);
        self.diagnostics.push(diagnostic);
    }

    fn custom_logic(&mut self, node: &Node, reason: &str) {
        self.push(
            Diagnostic::from_code(
                DiagnosticCode::PlanCustomLogic,
                format!("{}: {}", node.display_name(), reason),
            )
            .with_location(Location::node(node.id)),
        );
    }

    /// Transpile one expression of `node`, keeping its diagnostics
    fn expression(&mut self, node: &Node, field: &str, expr: &str) -> String {
        let conversion = self.transpiler.transpile(expr);
        for diagnostic in conversion.diagnostics {
            self.push(diagnostic.attach_to(node.id, Some(field)));
        }
        conversion.sql
    }

    fn input(&mut self, node: &Node, table: Option<&str>, path: Option<&str>, query: Option<&str>) -> String {
        if let Some(table) = table {
            return format!("{{{{ source('schema', '{}') }}}}", table);
        }
        if let Some(path) = path {
            return format!("-- External file: {}\n-- Consider loading to staging table", path);
        }
        if let Some(query) = query {
            return format!("-- Source query\n{}", query.trim());
        }
        self.custom_logic(node, "input has no table, file or query configured");
        CUSTOM_LOGIC.to_string()
    }

    fn formula(&mut self, node: &Node) -> String {
        let lines: Vec<String> = node
            .payload
            .expressions()
            .into_iter()
            .map(|(field, expr)| {
                let sql = self.expression(node, field, expr);
                format!("  {} AS {}", sql, quote_ident(field))
            })
            .collect();

        if lines.is_empty() {
            self.custom_logic(node, "formula tool has no expressions");
            return CUSTOM_LOGIC.to_string();
        }
        format!("SELECT\n{}", lines.join(",\n"))
    }

    fn join(&mut self, node: &Node, keys: &[JoinKey], join_type: Option<&str>) -> String {
        let join_type = join_type.unwrap_or("LEFT").to_uppercase();
        if keys.is_empty() {
            self.custom_logic(node, "join has no key configuration");
            return format!("{} JOIN right_table", join_type);
        }

        let conditions: Vec<String> = keys
            .iter()
            .map(|key| format!("left_table.{} = right_table.{}", key.left.trim(), key.right.trim()))
            .collect();
        let mut hint = format!("{} JOIN right_table ON {}", join_type, conditions.join(" AND "));
        if let (Some(left), Some(right)) = (
            self.graph.and_then(|g| g.upstream_by_anchor(node.id, "Left")),
            self.graph.and_then(|g| g.upstream_by_anchor(node.id, "Right")),
        ) {
            hint.push_str(&format!(
                "\n-- left_table: {} ({}), right_table: {} ({})",
                left.display_name(),
                left.id,
                right.display_name(),
                right.id
            ));
        }
        hint
    }

    fn summarize(&mut self, node: &Node, group_by: &[String], aggregations: &[Aggregation]) -> String {
        let mut columns: Vec<String> = group_by.iter().map(|f| quote_ident(f)).collect();

        for agg in aggregations {
            let sql = convert_aggregation(&agg.action, &quote_ident(&agg.field), &[]);
            if sql.starts_with("/* TODO") {
                self.push(
                    Diagnostic::from_code(
                        DiagnosticCode::PlanCustomLogic,
                        format!("No aggregate mapping for {} on {}", agg.action, agg.field),
                    )
                    .with_location(Location::node(node.id).with_field(agg.output())),
                );
            }
            columns.push(format!("{} AS {}", sql, quote_ident(agg.output())));
        }

        if columns.is_empty() {
            self.custom_logic(node, "summarize has no group-by fields or aggregations");
            return CUSTOM_LOGIC.to_string();
        }

        let mut hint = format!("SELECT {}", columns.join(", "));
        if !group_by.is_empty() {
            let keys: Vec<String> = group_by.iter().map(|f| quote_ident(f)).collect();
            hint.push_str(&format!("\nGROUP BY {}", keys.join(", ")));
        }
        hint
    }

    fn select(fields: &[String]) -> Option<String> {
        if fields.is_empty() {
            return None;
        }
        let shown: Vec<String> = fields.iter().take(SELECT_FIELD_LIMIT).map(|f| quote_ident(f)).collect();
        Some(format!("SELECT {}", shown.join(", ")))
    }

    fn sort(fields: &[SortField]) -> Option<String> {
        if fields.is_empty() {
            return None;
        }
        let keys: Vec<String> = fields
            .iter()
            .map(|f| format!("{} {}", quote_ident(&f.field), f.order.to_uppercase()))
            .collect();
        Some(format!("ORDER BY {}", keys.join(", ")))
    }

    fn output(node: &Node, table: Option<&str>, path: Option<&str>) -> String {
        let name = table
            .map(str::to_string)
            .or_else(|| {
                path.and_then(|p| std::path::Path::new(p).file_stem())
                    .map(|stem| stem.to_string_lossy().into_owned())
            })
            .unwrap_or_else(|| format!("output_{}", node.id));
        format!("CREATE TABLE {} AS\nSELECT * FROM upstream", name)
    }
}

impl HintProvider for SqlHintGenerator<'_> {
    fn hint(&mut self, node: &Node) -> Option<String> {
        let hint = match &node.payload {
            ToolPayload::Input {
                table_name,
                source_path,
                sql_query,
                ..
            } => self.input(
                node,
                table_name.as_deref(),
                source_path.as_deref(),
                sql_query.as_deref(),
            ),
            ToolPayload::Output {
                table_name,
                target_path,
                ..
            } => Self::output(node, table_name.as_deref(), target_path.as_deref()),
            ToolPayload::Filter { expression } => {
                format!("WHERE {}", self.expression(node, "expression", expression))
            }
            ToolPayload::Formula { .. } => self.formula(node),
            ToolPayload::Join { keys, join_type } => self.join(node, keys, join_type.as_deref()),
            ToolPayload::Summarize {
                group_by,
                aggregations,
            } => self.summarize(node, group_by, aggregations),
            ToolPayload::Union => "UNION ALL\n-- Stack multiple inputs".to_string(),
            ToolPayload::Select { fields } => return Self::select(fields),
            ToolPayload::Sort { fields } => return Self::sort(fields),
            ToolPayload::Macro { path } => {
                self.custom_logic(node, "macro needs manual translation");
                match path {
                    Some(path) => format!("-- Macro: {}\n{}", path, CUSTOM_LOGIC),
                    None => CUSTOM_LOGIC.to_string(),
                }
            }
            ToolPayload::Generic if node.is_macro() => {
                self.custom_logic(node, "macro needs manual translation");
                CUSTOM_LOGIC.to_string()
            }
            ToolPayload::Generic => {
                self.custom_logic(node, "no SQL translation for this tool");
                CUSTOM_LOGIC.to_string()
            }
        };

        Some(hint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowrefine_core::{Category, FormulaField, Refinement, Severity};
    use pretty_assertions::assert_eq;

    fn hint_for(node: &Node) -> (Option<String>, Vec<Diagnostic>) {
        let severity = SeverityThreshold::default();
        let mut generator = SqlHintGenerator::new(Transpiler::trino(), &severity);
        let hint = generator.hint(node);
        (hint, generator.into_diagnostics())
    }

    #[test]
    fn input_table_is_a_source() {
        let node = Node::new(1, "Input Data", Category::Input).with_payload(ToolPayload::Input {
            source_path: None,
            table_name: Some("orders".to_string()),
            sql_query: None,
            connection: None,
        });
        let (hint, diagnostics) = hint_for(&node);
        assert_eq!(hint.unwrap(), "{{ source('schema', 'orders') }}");
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn input_file_is_flagged_for_staging() {
        let node = Node::new(1, "Input Data", Category::Input).with_payload(ToolPayload::Input {
            source_path: Some("data/orders.csv".to_string()),
            table_name: None,
            sql_query: None,
            connection: None,
        });
        let (hint, _) = hint_for(&node);
        assert!(hint.unwrap().starts_with("-- External file: data/orders.csv"));
    }

    #[test]
    fn filter_uses_transpiler() {
        let node = Node::new(2, "Filter", Category::Preparation).with_payload(ToolPayload::Filter {
            expression: r#"[Status] == "Active""#.to_string(),
        });
        let (hint, diagnostics) = hint_for(&node);
        assert_eq!(hint.unwrap(), r#"WHERE "Status" = 'Active'"#);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn formula_diagnostics_are_tagged() {
        let node = Node::new(4, "Formula", Category::Preparation).with_payload(ToolPayload::Formula {
            formulas: vec![
                FormulaField {
                    field: "Clean".to_string(),
                    expression: "Trim([Name])".to_string(),
                },
                FormulaField {
                    field: "Odd".to_string(),
                    expression: "FooBar([X])".to_string(),
                },
            ],
        });
        let (hint, diagnostics) = hint_for(&node);

        assert_eq!(
            hint.unwrap(),
            "SELECT\n  TRIM(\"Name\") AS \"Clean\",\n  /* TODO: unmapped function FooBar */ FooBar(\"X\") AS \"Odd\""
        );
        assert_eq!(diagnostics.len(), 1);
        let location = diagnostics[0].location.as_ref().unwrap();
        assert_eq!(location.node_id, Some(4));
        assert_eq!(location.field.as_deref(), Some("Odd"));
    }

    #[test]
    fn join_keys_become_conditions() {
        let node = Node::new(5, "Join", Category::Join).with_payload(ToolPayload::Join {
            keys: vec![
                JoinKey { left: "id".to_string(), right: "customer_id".to_string() },
                JoinKey { left: "region".to_string(), right: "region".to_string() },
            ],
            join_type: Some("inner".to_string()),
        });
        let (hint, _) = hint_for(&node);
        assert_eq!(
            hint.unwrap(),
            "INNER JOIN right_table ON left_table.id = right_table.customer_id AND left_table.region = right_table.region"
        );
    }

    #[test]
    fn join_names_its_inputs_when_graph_is_known() {
        use flowrefine_core::Edge;

        let graph = Graph::new(
            vec![
                Node::new(1, "Input Data", Category::Input).with_annotation("customers"),
                Node::new(2, "Input Data", Category::Input).with_annotation("orders"),
                Node::new(3, "Join", Category::Join).with_payload(ToolPayload::Join {
                    keys: vec![JoinKey { left: "id".to_string(), right: "customer_id".to_string() }],
                    join_type: None,
                }),
            ],
            vec![Edge::to_anchor(1, 3, "Left"), Edge::to_anchor(2, 3, "Right")],
        )
        .unwrap();

        let severity = SeverityThreshold::default();
        let mut generator = SqlHintGenerator::new(Transpiler::trino(), &severity).with_graph(&graph);
        let hint = generator.hint(graph.node(3).unwrap()).unwrap();
        assert_eq!(
            hint,
            "LEFT JOIN right_table ON left_table.id = right_table.customer_id\n\
             -- left_table: Input Data: customers (1), right_table: Input Data: orders (2)"
        );
    }

    #[test]
    fn summarize_groups_and_aggregates() {
        let node = Node::new(6, "Summarize", Category::Transform).with_payload(ToolPayload::Summarize {
            group_by: vec!["Region".to_string()],
            aggregations: vec![Aggregation {
                action: "Sum".to_string(),
                field: "Amount".to_string(),
                output_name: Some("Total".to_string()),
            }],
        });
        let (hint, _) = hint_for(&node);
        assert_eq!(
            hint.unwrap(),
            "SELECT \"Region\", SUM(\"Amount\") AS \"Total\"\nGROUP BY \"Region\""
        );
    }

    #[test]
    fn select_shows_first_ten_fields() {
        let fields: Vec<String> = (0..12).map(|i| format!("f{}", i)).collect();
        let node = Node::new(7, "Select", Category::Preparation)
            .with_payload(ToolPayload::Select { fields });
        let (hint, _) = hint_for(&node);
        let hint = hint.unwrap();
        assert!(hint.contains("\"f9\""));
        assert!(!hint.contains("\"f10\""));
    }

    #[test]
    fn generic_tools_need_custom_logic() {
        let node = Node::new(8, "Fuzzy Match", Category::Join);
        let (hint, diagnostics) = hint_for(&node);
        assert_eq!(hint.unwrap(), CUSTOM_LOGIC);
        assert_eq!(diagnostics[0].code, DiagnosticCode::PlanCustomLogic);
        assert_eq!(diagnostics[0].severity, Severity::Warn);
    }

    #[test]
    fn macro_refined_tools_are_flagged_as_macros() {
        let node = Node::new(8, "Cleanse", Category::Preparation).with_refinement(Refinement::Macro);
        let (hint, diagnostics) = hint_for(&node);
        assert_eq!(hint.unwrap(), CUSTOM_LOGIC);
        assert_eq!(diagnostics[0].message, "Cleanse: macro needs manual translation");
    }

    #[test]
    fn severity_overrides_apply() {
        let mut severity = SeverityThreshold::default();
        severity.set_override(DiagnosticCode::FormulaUnknownFunction, Severity::Info);

        let node = Node::new(2, "Filter", Category::Preparation).with_payload(ToolPayload::Filter {
            expression: "FooBar([X])".to_string(),
        });
        let mut generator = SqlHintGenerator::new(Transpiler::trino(), &severity);
        generator.hint(&node);
        assert_eq!(generator.diagnostics()[0].severity, Severity::Info);
    }

    #[test]
    fn output_names_the_table() {
        let node = Node::new(9, "Output Data", Category::Output).with_payload(ToolPayload::Output {
            target_path: Some("out/final_sales.csv".to_string()),
            table_name: None,
            connection: None,
        });
        let (hint, _) = hint_for(&node);
        assert_eq!(hint.unwrap(), "CREATE TABLE final_sales AS\nSELECT * FROM upstream");
    }
}

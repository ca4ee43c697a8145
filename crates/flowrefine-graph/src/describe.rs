//! Human-readable step descriptions

use flowrefine_core::{Node, ToolPayload};

/// Describe what a tool does, from its payload
pub fn describe(node: &Node) -> String {
    let mut parts = vec![node.tool.clone()];

    match &node.payload {
        ToolPayload::Input { source_path, table_name, sql_query, .. } => {
            if let Some(path) = source_path {
                parts.push(format!("from '{}'", path));
            } else if let Some(table) = table_name {
                parts.push(format!("from table '{}'", table));
            } else if sql_query.is_some() {
                parts.push("with custom SQL query".to_string());
            }
        }
        ToolPayload::Output { target_path, table_name, .. } => {
            if let Some(path) = target_path {
                parts.push(format!("to '{}'", path));
            } else if let Some(table) = table_name {
                parts.push(format!("to table '{}'", table));
            }
        }
        ToolPayload::Filter { expression } => {
            if !expression.is_empty() {
                parts.push(format!(": {}", expression));
            }
        }
        ToolPayload::Formula { formulas } => {
            if !formulas.is_empty() {
                let fields: Vec<&str> = formulas.iter().take(3).map(|f| f.field.as_str()).collect();
                parts.push(format!(": {}", fields.join(", ")));
                if formulas.len() > 3 {
                    parts.push(format!("(+{} more)", formulas.len() - 3));
                }
            }
        }
        ToolPayload::Join { keys, .. } => {
            if !keys.is_empty() {
                let pairs: Vec<String> = keys
                    .iter()
                    .take(2)
                    .map(|k| format!("{} = {}", k.left, k.right))
                    .collect();
                parts.push(format!("on {}", pairs.join(", ")));
            }
        }
        ToolPayload::Summarize { group_by, aggregations } => {
            if !group_by.is_empty() {
                let fields: Vec<&str> = group_by.iter().take(3).map(String::as_str).collect();
                parts.push(format!("GROUP BY {}", fields.join(", ")));
            }
            if !aggregations.is_empty() {
                let aggs: Vec<String> = aggregations
                    .iter()
                    .take(2)
                    .map(|a| format!("{}({})", a.action, a.field))
                    .collect();
                parts.push(format!(": {}", aggs.join(", ")));
            }
        }
        ToolPayload::Select { fields } => {
            if !fields.is_empty() {
                parts.push(format!(": {} fields", fields.len()));
            }
        }
        ToolPayload::Sort { fields } => {
            if !fields.is_empty() {
                let keys: Vec<String> = fields
                    .iter()
                    .take(2)
                    .map(|f| format!("{} {}", f.field, f.order))
                    .collect();
                parts.push(format!("by {}", keys.join(", ")));
            }
        }
        ToolPayload::Macro { path } => {
            parts = vec![format!("Macro: {}", node.tool)];
            if let Some(path) = path {
                parts.push(format!("({})", path));
            }
        }
        ToolPayload::Union | ToolPayload::Generic => {}
    }

    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowrefine_core::{Aggregation, Category, FormulaField, SortField};

    #[test]
    fn input_prefers_path_over_table() {
        let node = Node::new(1, "Input Data", Category::Input).with_payload(ToolPayload::Input {
            source_path: Some("orders.csv".to_string()),
            table_name: Some("orders".to_string()),
            sql_query: None,
            connection: None,
        });
        assert_eq!(describe(&node), "Input Data from 'orders.csv'");
    }

    #[test]
    fn formula_lists_three_fields() {
        let formulas = ["a", "b", "c", "d", "e"]
            .iter()
            .map(|f| FormulaField { field: f.to_string(), expression: "1".to_string() })
            .collect();
        let node = Node::new(2, "Formula", Category::Preparation)
            .with_payload(ToolPayload::Formula { formulas });
        assert_eq!(describe(&node), "Formula : a, b, c (+2 more)");
    }

    #[test]
    fn summarize_shows_groups_and_aggregations() {
        let node = Node::new(3, "Summarize", Category::Transform).with_payload(ToolPayload::Summarize {
            group_by: vec!["Region".to_string()],
            aggregations: vec![Aggregation {
                action: "Sum".to_string(),
                field: "Amount".to_string(),
                output_name: None,
            }],
        });
        assert_eq!(describe(&node), "Summarize GROUP BY Region : Sum(Amount)");
    }

    #[test]
    fn sort_and_macro() {
        let sort = Node::new(4, "Sort", Category::Preparation).with_payload(ToolPayload::Sort {
            fields: vec![SortField { field: "Date".to_string(), order: "DESC".to_string() }],
        });
        assert_eq!(describe(&sort), "Sort by Date DESC");

        let mac = Node::new(5, "Cleanse", Category::Preparation).with_payload(ToolPayload::Macro {
            path: Some("macros/cleanse.yxmc".to_string()),
        });
        assert_eq!(describe(&mac), "Macro: Cleanse (macros/cleanse.yxmc)");
    }

    #[test]
    fn generic_is_just_the_tool() {
        let node = Node::new(6, "Union", Category::Join).with_payload(ToolPayload::Union);
        assert_eq!(describe(&node), "Union");
    }
}

//! Source and target inventory
//!
//! Classifies every workflow source and target by the system behind it:
//! file format from the path extension, database vendor from the
//! connection string, cloud storage from the tool name.

use flowrefine_core::{Endpoint, EndpointKind, Graph, Inventory, Node, ToolPayload};

/// File format from a path's extension, case-insensitive
fn file_kind(path: &str) -> EndpointKind {
    let lower = path.to_ascii_lowercase();
    let extension = lower.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("");

    match extension {
        "csv" => EndpointKind::CsvFile,
        "xls" | "xlsx" => EndpointKind::ExcelFile,
        "json" => EndpointKind::JsonFile,
        "xml" => EndpointKind::XmlFile,
        "yxdb" => EndpointKind::YxdbFile,
        _ => EndpointKind::File,
    }
}

/// Database vendor named anywhere in a connection string
fn connection_kind(connection: &str) -> EndpointKind {
    let lower = connection.to_ascii_lowercase();
    let vendors = [
        ("sqlserver", EndpointKind::SqlServer),
        ("mssql", EndpointKind::SqlServer),
        ("oracle", EndpointKind::Oracle),
        ("postgres", EndpointKind::Postgres),
        ("mysql", EndpointKind::MySql),
        ("snowflake", EndpointKind::Snowflake),
        ("bigquery", EndpointKind::BigQuery),
        ("redshift", EndpointKind::Redshift),
    ];

    vendors
        .iter()
        .find(|(needle, _)| lower.contains(needle))
        .map(|&(_, kind)| kind)
        .unwrap_or(EndpointKind::Database)
}

/// Cloud storage tools are recognised by name alone
fn tool_kind(tool: &str) -> EndpointKind {
    if tool.contains("S3") {
        EndpointKind::AmazonS3
    } else if tool.contains("Azure") {
        EndpointKind::AzureBlob
    } else if tool.contains("Snowflake") {
        EndpointKind::Snowflake
    } else {
        EndpointKind::Unknown
    }
}

/// Kind of a source tool: path, then connection, then tool name
pub fn source_kind(node: &Node) -> EndpointKind {
    if let ToolPayload::Input { source_path, connection, .. } = &node.payload {
        if let Some(path) = source_path {
            return file_kind(path);
        }
        if let Some(connection) = connection {
            return connection_kind(connection);
        }
    }
    tool_kind(&node.tool)
}

/// Kind of a target tool
pub fn target_kind(node: &Node) -> EndpointKind {
    if node.tool == "Browse" {
        return EndpointKind::Browse;
    }

    match &node.payload {
        ToolPayload::Output { target_path: Some(path), .. } => file_kind(path),
        ToolPayload::Output { connection, table_name, .. }
            if connection.is_some() || table_name.is_some() =>
        {
            EndpointKind::DatabaseTable
        }
        _ => EndpointKind::Unknown,
    }
}

fn source(node: &Node) -> Endpoint {
    let (location, connection, sql_query) = match &node.payload {
        ToolPayload::Input {
            source_path,
            table_name,
            sql_query,
            connection,
        } => (
            source_path.clone().or_else(|| table_name.clone()),
            connection.clone(),
            sql_query.clone(),
        ),
        _ => (None, None, None),
    };

    Endpoint {
        node_id: node.id,
        name: node.display_name(),
        kind: source_kind(node),
        location,
        connection,
        sql_query,
    }
}

fn target(node: &Node) -> Endpoint {
    let (location, connection) = match &node.payload {
        ToolPayload::Output {
            target_path,
            table_name,
            connection,
        } => (target_path.clone().or_else(|| table_name.clone()), connection.clone()),
        _ => (None, None),
    };

    Endpoint {
        node_id: node.id,
        name: node.display_name(),
        kind: target_kind(node),
        location,
        connection,
        sql_query: None,
    }
}

/// Inventory of a graph's sources and targets, in node-list order
pub fn inventory(graph: &Graph) -> Inventory {
    let inventory = Inventory {
        sources: graph.sources().into_iter().map(source).collect(),
        targets: graph.targets().into_iter().map(target).collect(),
    };

    tracing::debug!(
        sources = inventory.sources.len(),
        targets = inventory.targets.len(),
        "built source/target inventory"
    );
    inventory
}

//! Source and target inventory
//!
//! Where a workflow reads from and writes to, as listed in review reports.

use serde::{Deserialize, Serialize};
use crate::graph::NodeId;

/// Kind of system behind a source or target tool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointKind {
    CsvFile,
    ExcelFile,
    JsonFile,
    XmlFile,
    YxdbFile,
    /// File with an unrecognised extension
    File,
    SqlServer,
    Oracle,
    Postgres,
    MySql,
    Snowflake,
    BigQuery,
    Redshift,
    /// Database connection of an unrecognised vendor
    Database,
    /// Output written to a table through a connection
    DatabaseTable,
    AmazonS3,
    AzureBlob,
    /// Interactive preview, nothing is persisted
    Browse,
    Unknown,
}

impl EndpointKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CsvFile => "CSV File",
            Self::ExcelFile => "Excel File",
            Self::JsonFile => "JSON File",
            Self::XmlFile => "XML File",
            Self::YxdbFile => "Alteryx Database",
            Self::File => "File",
            Self::SqlServer => "SQL Server",
            Self::Oracle => "Oracle",
            Self::Postgres => "PostgreSQL",
            Self::MySql => "MySQL",
            Self::Snowflake => "Snowflake",
            Self::BigQuery => "BigQuery",
            Self::Redshift => "Redshift",
            Self::Database => "Database",
            Self::DatabaseTable => "Database Table",
            Self::AmazonS3 => "Amazon S3",
            Self::AzureBlob => "Azure Blob",
            Self::Browse => "Preview/Browse",
            Self::Unknown => "Unknown",
        }
    }

    pub fn is_file(&self) -> bool {
        matches!(
            self,
            Self::CsvFile | Self::ExcelFile | Self::JsonFile | Self::XmlFile | Self::YxdbFile | Self::File
        )
    }
}

impl std::fmt::Display for EndpointKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One source or target tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub node_id: NodeId,

    /// Display name of the tool
    pub name: String,

    pub kind: EndpointKind,

    /// File path or table name, when configured
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sql_query: Option<String>,
}

/// Every place a workflow reads from or writes to
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    pub sources: Vec<Endpoint>,
    pub targets: Vec<Endpoint>,
}

impl Inventory {
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty() && self.targets.is_empty()
    }
}

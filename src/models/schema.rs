//! Schema-related data models.
//!
//! This module defines the table identifier accepted by `describe_table` and
//! the catalog metadata shapes returned to callers.

use crate::models::query::ErrorResult;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Schema used when a payload omits one.
pub const DEFAULT_SCHEMA: &str = "public";

/// Schemas that may be introspected.
pub const ALLOWED_SCHEMAS: &[&str] = &["public"];

fn default_schema() -> String {
    DEFAULT_SCHEMA.to_string()
}

/// A schema-qualified table name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TableIdentifier {
    /// Schema name. Default: "public"
    #[serde(default = "default_schema")]
    pub schema: String,
    /// Table name
    pub table: String,
}

impl TableIdentifier {
    pub fn new(schema: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            table: table.into(),
        }
    }

    /// Whether the schema is on the introspection allow-list.
    pub fn is_allowed(&self) -> bool {
        ALLOWED_SCHEMAS.contains(&self.schema.as_str())
    }
}

impl std::fmt::Display for TableIdentifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.schema, self.table)
    }
}

/// One column of a described table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ColumnDescriptor {
    pub column_name: String,
    pub data_type: String,
    /// "YES" or "NO", as reported by the catalog
    pub is_nullable: String,
}

/// Column and primary-key metadata of a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TableDescription {
    /// Columns ordered by physical position
    pub columns: Vec<ColumnDescriptor>,
    /// Primary-key column names in key order
    pub primary_key: Vec<String>,
}

/// One row of the schema-wide column catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CatalogColumn {
    pub table_name: String,
    pub column_name: String,
    pub data_type: String,
    pub is_nullable: String,
}

/// Outcome of the `describe_table` tool.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DescribeOutcome {
    Table(TableDescription),
    Failure(ErrorResult),
}

impl DescribeOutcome {
    pub fn failure(error: impl Into<String>) -> Self {
        Self::Failure(ErrorResult::new(error))
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure(_))
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Failure(e) => Some(&e.error),
            Self::Table(_) => None,
        }
    }
}

//! Data models for the SQL gate server.
//!
//! This module re-exports all model types used throughout the application.

pub mod query;
pub mod schema;

// Re-export commonly used types
pub use query::{
    DEFAULT_ROW_LIMIT, ErrorResult, ExecResult, JsonMap, QueryOutcome, QueryParam, QueryRequest,
    QueryResult, Role,
};
pub use schema::{
    ALLOWED_SCHEMAS, CatalogColumn, ColumnDescriptor, DEFAULT_SCHEMA, DescribeOutcome,
    TableDescription, TableIdentifier,
};

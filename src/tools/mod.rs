//! MCP tool implementations.
//!
//! This module contains the tool handlers and the request-sanitization
//! pipeline they share:
//! - `health`: `ping` round-trip check
//! - `schema`: `describe_table` and the public schema catalog
//! - `query`: unified read/write statement execution
//! - `recovery`: best-effort repair of malformed JSON payloads
//! - `sql_validator`: statement classification, role admission, row bounding and redaction

pub mod health;
pub mod query;
pub mod recovery;
pub mod schema;
pub mod sql_validator;

pub use health::HealthToolHandler;
pub use query::{QueryInput, QueryToolHandler};
pub use schema::{DescribeTableInput, SchemaToolHandler};

//! SQL Gate MCP Server Library
//!
//! MCP (Model Context Protocol) tools that let an agent query a PostgreSQL or
//! SQLite database through a policy gate: malformed JSON input is repaired,
//! statements are classified as read-only or mutating and admitted against the
//! caller's role, and read results are bounded.

pub mod config;
pub mod db;
pub mod error;
pub mod mcp;
pub mod models;
pub mod tools;
pub mod transport;

pub use config::Config;
pub use db::DbPool;
pub use error::DbError;
pub use mcp::GateService;

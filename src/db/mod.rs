//! Database abstraction layer.
//!
//! This module provides database access functionality:
//! - Connection pool management
//! - Statement execution
//! - Catalog introspection
//! - Row-to-JSON type mappings

pub mod catalog;
pub mod executor;
pub mod pool;
pub mod types;

pub use catalog::CatalogInspector;
pub use executor::QueryExecutor;
pub use pool::{DatabaseType, DbPool};

//! Table introspection tool and the public schema catalog.

use crate::db::{CatalogInspector, DbPool};
use crate::error::{DbError, DbResult};
use crate::models::{DescribeOutcome, JsonMap, TableIdentifier};
use crate::tools::recovery;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use tracing::{info, warn};

/// Error returned when a textual payload recovers to nothing.
pub const PARSE_ERROR: &str = "could not parse JSON payload";

/// Input for the describe_table tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct DescribeTableInput {
    /// Table identifier {"schema": "public", "table": "<name>"}, or its JSON text
    /// (malformed JSON is repaired). Only the "public" schema may be described.
    pub payload: JsonValue,
}

impl DescribeTableInput {
    pub fn new(payload: JsonValue) -> Self {
        Self { payload }
    }
}

/// Normalize a polymorphic payload into a table identifier.
///
/// Objects are validated directly. Text is recovered first and must yield a
/// non-empty mapping. Any other JSON type cannot name a table.
pub fn parse_identifier(payload: &JsonValue) -> Result<TableIdentifier, String> {
    let map = match payload {
        JsonValue::Object(map) => map.clone(),
        JsonValue::String(raw) => {
            let map = recovery::recover_object(raw);
            if map.is_empty() {
                return Err(PARSE_ERROR.to_string());
            }
            map
        }
        _ => return Err(PARSE_ERROR.to_string()),
    };
    identifier_from_map(map)
}

fn identifier_from_map(map: JsonMap) -> Result<TableIdentifier, String> {
    serde_json::from_value(JsonValue::Object(map))
        .map_err(|e| format!("invalid payload format: {}", e))
}

/// Handler for the describe_table tool and the schema catalog resource.
#[derive(Debug, Clone)]
pub struct SchemaToolHandler {
    pool: DbPool,
}

impl SchemaToolHandler {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn describe_table(&self, input: DescribeTableInput) -> DescribeOutcome {
        let ident = match parse_identifier(&input.payload) {
            Ok(ident) => ident,
            Err(error) => {
                warn!(error = %error, "Rejected describe_table payload");
                return DescribeOutcome::failure(error);
            }
        };

        if !ident.is_allowed() {
            warn!(schema = %ident.schema, "Rejected schema outside allow-list");
            return DescribeOutcome::failure(format!("schema '{}' not allowed.", ident.schema));
        }

        match CatalogInspector::describe_table(&self.pool, &ident).await {
            Ok(description) => {
                info!(
                    table = %ident,
                    columns = description.columns.len(),
                    "Described table"
                );
                DescribeOutcome::Table(description)
            }
            Err(e) => {
                warn!(table = %ident, error = %e, "Catalog lookup failed");
                DescribeOutcome::failure(e.caller_message())
            }
        }
    }

    /// Column catalog of the public schema as pretty-printed JSON.
    pub async fn public_catalog(&self) -> DbResult<String> {
        let columns = CatalogInspector::list_columns(&self.pool).await?;
        serde_json::to_string_pretty(&columns)
            .map_err(|e| DbError::internal(format!("Failed to serialize catalog: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_identifier_from_object() {
        assert_eq!(
            parse_identifier(&json!({"table": "users"})).unwrap(),
            TableIdentifier::new("public", "users")
        );
        assert_eq!(
            parse_identifier(&json!({"schema": "secret", "table": "t"})).unwrap(),
            TableIdentifier::new("secret", "t")
        );
    }

    #[test]
    fn test_parse_identifier_from_malformed_text() {
        assert_eq!(
            parse_identifier(&json!("{schema: public, table: users}")).unwrap(),
            TableIdentifier::new("public", "users")
        );
        assert_eq!(
            parse_identifier(&json!("{'table': 'users'}")).unwrap(),
            TableIdentifier::new("public", "users")
        );
    }

    #[test]
    fn test_parse_identifier_parse_error() {
        assert_eq!(parse_identifier(&json!("")).unwrap_err(), PARSE_ERROR);
        assert_eq!(parse_identifier(&json!("garbage")).unwrap_err(), PARSE_ERROR);
        assert_eq!(parse_identifier(&json!(42)).unwrap_err(), PARSE_ERROR);
        assert_eq!(parse_identifier(&JsonValue::Null).unwrap_err(), PARSE_ERROR);
    }

    #[test]
    fn test_parse_identifier_validation_error() {
        let err = parse_identifier(&json!({"schema": "public"})).unwrap_err();
        assert!(err.starts_with("invalid payload format: "), "{err}");
        assert!(err.contains("table"), "{err}");

        let err = parse_identifier(&json!("{schema: public}")).unwrap_err();
        assert!(err.starts_with("invalid payload format: "), "{err}");
    }
}

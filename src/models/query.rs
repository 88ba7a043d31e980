//! Query-related data models.
//!
//! This module defines the normalized query request, the positional parameter
//! type, and the three-way outcome returned by the `query` tool.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Default row cap applied by the result bounder.
pub const DEFAULT_ROW_LIMIT: u32 = 2000;

/// Key/value mapping recovered from caller input. Iteration follows insertion order.
pub type JsonMap = serde_json::Map<String, JsonValue>;

/// Caller-declared execution mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Only read-only statements (SELECT, SHOW, EXPLAIN, WITH) are admitted
    #[default]
    Read,
    /// Any statement is admitted
    Write,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read => write!(f, "read"),
            Self::Write => write!(f, "write"),
        }
    }
}

/// A parameter value for parameterized queries.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryParam {
    Null,
    Bool(bool),
    /// Stored as i64 for maximum range
    Int(i64),
    Float(f64),
    String(String),
    /// Arrays and objects, bound as JSON
    Json(JsonValue),
}

impl QueryParam {
    /// Get the type name of this parameter for debugging.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::Json(_) => "json",
        }
    }
}

impl From<&JsonValue> for QueryParam {
    fn from(value: &JsonValue) -> Self {
        match value {
            JsonValue::Null => Self::Null,
            JsonValue::Bool(v) => Self::Bool(*v),
            JsonValue::Number(n) => match n.as_i64() {
                Some(v) => Self::Int(v),
                // u64 beyond i64::MAX and non-integers
                None => Self::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            JsonValue::String(s) => Self::String(s.clone()),
            other => Self::Json(other.clone()),
        }
    }
}

/// A query request after input normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRequest {
    pub sql: String,
    /// Values bind positionally in insertion order; keys are not matched to placeholders.
    pub params: JsonMap,
    pub role: Role,
    pub limit: u32,
}

impl QueryRequest {
    /// Create a read-role request with no parameters and the default limit.
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: JsonMap::new(),
            role: Role::Read,
            limit: DEFAULT_ROW_LIMIT,
        }
    }

    pub fn with_params(mut self, params: JsonMap) -> Self {
        self.params = params;
        self
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    /// Parameter values in binding order.
    pub fn positional_params(&self) -> Vec<QueryParam> {
        self.params.values().map(QueryParam::from).collect()
    }
}

/// Rows returned by a read-only statement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult {
    pub rows: Vec<JsonMap>,
    /// Always equal to `rows.len()`
    pub count: usize,
    /// Redacted statement text
    pub sql: String,
}

/// Outcome of a mutating statement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecResult {
    /// Always "ok"
    pub status: String,
    pub affected: u64,
    /// Redacted statement text
    pub sql: String,
}

/// A request that could not be served.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorResult {
    pub error: String,
    /// Redacted statement text, present when the failure happened during execution
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sql: Option<String>,
}

impl ErrorResult {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            sql: None,
        }
    }

    pub fn with_sql(mut self, sql: impl Into<String>) -> Self {
        self.sql = Some(sql.into());
        self
    }
}

/// The three mutually exclusive outcomes of the `query` tool.
///
/// Serializes untagged, so callers see `{rows, count, sql}`,
/// `{status, affected, sql}` or `{error, sql?}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum QueryOutcome {
    Rows(QueryResult),
    Affected(ExecResult),
    Failure(ErrorResult),
}

impl QueryOutcome {
    pub fn rows(rows: Vec<JsonMap>, sql: impl Into<String>) -> Self {
        Self::Rows(QueryResult {
            count: rows.len(),
            rows,
            sql: sql.into(),
        })
    }

    pub fn affected(affected: u64, sql: impl Into<String>) -> Self {
        Self::Affected(ExecResult {
            status: "ok".to_string(),
            affected,
            sql: sql.into(),
        })
    }

    pub fn failure(error: ErrorResult) -> Self {
        Self::Failure(error)
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure(_))
    }

    /// The error message, if this is a failure.
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Failure(e) => Some(&e.error),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_role_defaults_to_read() {
        assert_eq!(Role::default(), Role::Read);
        let role: Role = serde_json::from_str("\"write\"").unwrap();
        assert_eq!(role, Role::Write);
        assert!(serde_json::from_str::<Role>("\"admin\"").is_err());
        assert_eq!(Role::Write.to_string(), "write");
    }

    #[test]
    fn test_query_param_from_json() {
        assert_eq!(QueryParam::from(&json!(null)), QueryParam::Null);
        assert_eq!(QueryParam::from(&json!(true)), QueryParam::Bool(true));
        assert_eq!(QueryParam::from(&json!(42)), QueryParam::Int(42));
        assert_eq!(QueryParam::from(&json!(1.5)), QueryParam::Float(1.5));
        assert_eq!(
            QueryParam::from(&json!("alice")),
            QueryParam::String("alice".to_string())
        );
        assert_eq!(QueryParam::from(&json!([1, 2])).type_name(), "json");
        assert_eq!(QueryParam::from(&json!({"a": 1})).type_name(), "json");
        assert_eq!(QueryParam::from(&json!(u64::MAX)).type_name(), "float");
    }

    #[test]
    fn test_positional_params_follow_insertion_order() {
        let params: JsonMap = serde_json::from_str(r#"{"z": 1, "a": "two", "m": null}"#).unwrap();
        let request = QueryRequest::new("select $1, $2, $3").with_params(params);
        assert_eq!(
            request.positional_params(),
            vec![
                QueryParam::Int(1),
                QueryParam::String("two".to_string()),
                QueryParam::Null,
            ]
        );
    }

    #[test]
    fn test_query_request_defaults() {
        let request = QueryRequest::new("select 1");
        assert_eq!(request.role, Role::Read);
        assert_eq!(request.limit, DEFAULT_ROW_LIMIT);
        assert!(request.params.is_empty());

        let request = request.with_role(Role::Write).with_limit(5);
        assert_eq!(request.role, Role::Write);
        assert_eq!(request.limit, 5);
    }

    #[test]
    fn test_outcome_shapes() {
        let mut row = JsonMap::new();
        row.insert("n".to_string(), json!(1));
        let rows = serde_json::to_value(QueryOutcome::rows(vec![row], "select 1")).unwrap();
        assert_eq!(rows, json!({"rows": [{"n": 1}], "count": 1, "sql": "select 1"}));

        let affected = serde_json::to_value(QueryOutcome::affected(3, "delete from t")).unwrap();
        assert_eq!(
            affected,
            json!({"status": "ok", "affected": 3, "sql": "delete from t"})
        );

        let failure = QueryOutcome::failure(ErrorResult::new("nope"));
        assert!(failure.is_failure());
        assert_eq!(failure.error(), Some("nope"));
        assert_eq!(serde_json::to_value(&failure).unwrap(), json!({"error": "nope"}));

        let failure = QueryOutcome::failure(ErrorResult::new("bad").with_sql("selec 1"));
        assert_eq!(
            serde_json::to_value(&failure).unwrap(),
            json!({"error": "bad", "sql": "selec 1"})
        );
    }
}

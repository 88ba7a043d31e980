//! Unified query tool.
//!
//! One entry point serves both roles. The pipeline is: recover textual
//! parameters, admit or reject the statement for the caller's role (the read
//! role also refuses stacked statements), bound the result set of read-only
//! statements, then execute on a pooled connection.
//! Every outcome, including backend failures, is returned as a value.

use crate::db::{DbPool, QueryExecutor};
use crate::error::DbError;
use crate::models::{DEFAULT_ROW_LIMIT, ErrorResult, JsonMap, QueryOutcome, QueryRequest, Role};
use crate::tools::recovery;
use crate::tools::sql_validator::{self, STACKED_IN_READ_ROLE, WRITE_IN_READ_ROLE};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use tracing::{debug, info, warn};

/// Input for the query tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct QueryInput {
    /// SQL statement to execute. Use $1, $2... (PostgreSQL) or ? (SQLite) placeholders for parameters.
    pub sql: String,
    /// Parameters as an object, or the object's JSON text (malformed JSON is repaired).
    /// Values bind to placeholders in key order; keys are not matched by name.
    #[serde(default)]
    pub params: Option<JsonValue>,
    /// "read" (default) admits only SELECT, SHOW, EXPLAIN and WITH statements; "write" admits anything
    #[serde(default)]
    pub role: Role,
    /// Row cap for SELECT/WITH statements without their own LIMIT; SHOW and EXPLAIN
    /// are not capped. Default: 2000
    #[serde(default)]
    pub limit: Option<u32>,
}

impl QueryInput {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: None,
            role: Role::Read,
            limit: None,
        }
    }

    pub fn with_params(mut self, params: JsonValue) -> Self {
        self.params = Some(params);
        self
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Handler for the query tool.
#[derive(Debug, Clone)]
pub struct QueryToolHandler {
    pool: DbPool,
    executor: QueryExecutor,
    default_limit: u32,
}

impl QueryToolHandler {
    pub fn new(pool: DbPool) -> Self {
        Self {
            pool,
            executor: QueryExecutor::new(),
            default_limit: DEFAULT_ROW_LIMIT,
        }
    }

    /// Use a different row cap when the caller supplies none.
    pub fn with_default_limit(mut self, limit: u32) -> Self {
        self.default_limit = limit;
        self
    }

    /// Handle the query tool call.
    pub async fn query(&self, input: QueryInput) -> QueryOutcome {
        match self.normalize(input) {
            Ok(request) => self.execute(&request).await,
            Err(error) => QueryOutcome::failure(error),
        }
    }

    /// Turn loosely-typed input into a request. Textual params go through
    /// JSON recovery; a missing limit takes the handler default.
    pub fn normalize(&self, input: QueryInput) -> Result<QueryRequest, ErrorResult> {
        let limit = match input.limit {
            Some(0) => {
                return Err(ErrorResult::new(
                    "invalid payload format: limit must be a positive integer",
                ));
            }
            Some(limit) => limit,
            None => self.default_limit,
        };

        let params = input
            .params
            .as_ref()
            .map(recovery::recover_value)
            .unwrap_or_else(JsonMap::new);

        Ok(QueryRequest::new(input.sql)
            .with_params(params)
            .with_role(input.role)
            .with_limit(limit))
    }

    /// Run a normalized request through the policy gate and the backend.
    pub async fn execute(&self, request: &QueryRequest) -> QueryOutcome {
        let redacted = sql_validator::redact(&request.sql);

        if !sql_validator::admit(&request.sql, request.role) {
            warn!(
                role = %request.role,
                sql = %redacted,
                "Rejected mutating statement"
            );
            return QueryOutcome::failure(ErrorResult::new(WRITE_IN_READ_ROLE));
        }

        if request.role == Role::Read && !sql_validator::is_single_statement(&request.sql) {
            warn!(sql = %redacted, "Rejected stacked statements");
            return QueryOutcome::failure(ErrorResult::new(STACKED_IN_READ_ROLE));
        }

        let params = request.positional_params();

        if sql_validator::is_read_only(&request.sql) {
            let bounded = sql_validator::bound_rows(&request.sql, request.limit);
            if bounded != request.sql.as_str() {
                debug!(limit = request.limit, sql = %bounded, "Bounded result set");
            }

            match self
                .executor
                .fetch_rows(&self.pool, &bounded, &params)
                .await
            {
                Ok(rows) => {
                    info!(
                        role = %request.role,
                        sql = %redacted,
                        count = rows.len(),
                        "Query executed"
                    );
                    QueryOutcome::rows(rows, redacted)
                }
                Err(e) => backend_failure(e, redacted),
            }
        } else {
            match self
                .executor
                .execute_write(&self.pool, &request.sql, &params)
                .await
            {
                Ok(affected) => {
                    info!(
                        role = %request.role,
                        sql = %redacted,
                        affected,
                        "Statement executed"
                    );
                    QueryOutcome::affected(affected, redacted)
                }
                Err(e) => backend_failure(e, redacted),
            }
        }
    }
}

fn backend_failure(error: DbError, redacted: String) -> QueryOutcome {
    warn!(sql = %redacted, error = %error, "Statement failed");
    QueryOutcome::failure(ErrorResult::new(error.caller_message()).with_sql(redacted))
}

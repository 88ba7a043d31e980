//! Health check tool.

use crate::db::{DbPool, QueryExecutor};
use crate::error::DbResult;
use tracing::debug;

/// Handler for the ping tool.
#[derive(Debug, Clone)]
pub struct HealthToolHandler {
    pool: DbPool,
    executor: QueryExecutor,
}

impl HealthToolHandler {
    pub fn new(pool: DbPool) -> Self {
        Self {
            pool,
            executor: QueryExecutor::new(),
        }
    }

    /// Round-trip the database and report the latency, e.g. `ok (3 ms)`.
    pub async fn ping(&self) -> DbResult<String> {
        let elapsed = self.executor.ping(&self.pool).await?;
        let millis = elapsed.as_millis();
        debug!(elapsed_ms = millis as u64, "Ping succeeded");
        Ok(format!("ok ({} ms)", millis))
    }
}

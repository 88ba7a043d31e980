//! Stdio transport for the MCP server.

use crate::db::DbPool;
use crate::error::{DbError, DbResult};
use crate::mcp::GateService;
use crate::transport::Transport;
use rmcp::{ServiceExt, transport::stdio};
use tokio::signal;
use tracing::{info, warn};

/// Serves a [`GateService`] over stdin/stdout and owns the pool's shutdown.
pub struct StdioTransport {
    pool: DbPool,
    default_limit: u32,
}

impl StdioTransport {
    /// `default_limit` is the row cap handed to the query tool.
    pub fn new(pool: DbPool, default_limit: u32) -> Self {
        Self {
            pool,
            default_limit,
        }
    }
}

impl Transport for StdioTransport {
    async fn run(&self) -> DbResult<()> {
        info!(
            backend = %self.pool.db_type(),
            default_limit = self.default_limit,
            "Starting MCP server with stdio transport"
        );

        let service = GateService::new(self.pool.clone(), self.default_limit);
        let running_service = service
            .serve(stdio())
            .await
            .map_err(|e| DbError::internal(format!("Failed to start stdio transport: {}", e)))?;

        let shutdown_requested = tokio::select! {
            result = running_service.waiting() => {
                match result {
                    Ok(reason) => info!(reason = ?reason, "Stdio transport completed"),
                    Err(e) => {
                        warn!(error = %e, "Stdio transport error");
                        self.pool.close().await;
                        return Err(DbError::internal(format!("Stdio transport error: {}", e)));
                    }
                }
                false
            }
            _ = wait_for_signal() => {
                info!("Shutdown signal received (send again to force exit)");
                true
            }
        };

        if shutdown_requested {
            tokio::spawn(async {
                wait_for_signal().await;
                warn!("Received second signal, forcing immediate exit");
                std::process::exit(1);
            });
        }

        info!("Closing database pool");
        self.pool.close().await;

        if shutdown_requested {
            // A pending stdin read cannot be cancelled by select!.
            info!("Exiting process");
            std::process::exit(0);
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        "stdio"
    }
}

/// Resolve on SIGINT or SIGTERM. A handler that cannot be installed never fires.
async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PoolOptions;

    #[tokio::test]
    async fn test_stdio_transport_creation() {
        let pool = DbPool::connect("sqlite::memory:", &PoolOptions::default())
            .await
            .unwrap();
        let transport = StdioTransport::new(pool.clone(), 2000);
        assert_eq!(transport.name(), "stdio");
        assert_eq!(transport.default_limit, 2000);
        pool.close().await;
    }
}

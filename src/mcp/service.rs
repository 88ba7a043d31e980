//! MCP service implementation using rmcp.
//!
//! `GateService` exposes the three tools through rmcp's tool macros and
//! implements the resource and prompt endpoints by hand. Tool outcomes are
//! returned as pretty-printed JSON text; callers tell success from failure by
//! the presence of an `error` key, not by a protocol fault.

use crate::db::DbPool;
use crate::tools::health::HealthToolHandler;
use crate::tools::query::{QueryInput, QueryToolHandler};
use crate::tools::schema::{DescribeTableInput, SchemaToolHandler};
use rmcp::{
    ErrorData as McpError, RoleServer, ServerHandler,
    handler::server::tool::ToolRouter,
    handler::server::wrapper::Parameters,
    model::{
        AnnotateAble, CallToolResult, Content, GetPromptRequestParam, GetPromptResult,
        Implementation, ListPromptsResult, ListResourcesResult, PaginatedRequestParam, Prompt,
        PromptMessage, PromptMessageRole, ProtocolVersion, RawResource, ReadResourceRequestParam,
        ReadResourceResult, Resource, ResourceContents, ServerCapabilities, ServerInfo,
    },
    service::RequestContext,
    tool, tool_handler, tool_router,
};
use serde::Serialize;

/// URI of the public schema catalog resource.
pub const SCHEMA_RESOURCE_URI: &str = "schema://public";

/// Name of the help prompt.
pub const SAFE_SQL_PROMPT: &str = "safe_sql";

/// Help text served by the `safe_sql` prompt.
pub const HELP_TEXT: &str = "SQL Gate MCP Server - Available Tools:\n\n\
    1. ping() - Health check\n\
    2. describe_table(payload) - Get table structure\n\
    3. query(sql, params, role, limit) - Unified SQL query tool\n\
    Malformed JSON in payload and params is repaired automatically.\n";

/// Serialize a tool outcome as pretty-printed JSON text content.
fn json_success<T: Serialize>(data: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(data)
        .map_err(|e| McpError::internal_error(e.to_string(), None))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[derive(Clone)]
pub struct GateService {
    health_tool: HealthToolHandler,
    schema_tool: SchemaToolHandler,
    query_tool: QueryToolHandler,
    /// Tool router for MCP tool dispatch (auto-generated)
    tool_router: ToolRouter<Self>,
}

impl GateService {
    /// Create a service backed by a shared pool.
    ///
    /// `default_limit` caps read-only statements whose caller supplied no limit.
    pub fn new(pool: DbPool, default_limit: u32) -> Self {
        Self {
            health_tool: HealthToolHandler::new(pool.clone()),
            schema_tool: SchemaToolHandler::new(pool.clone()),
            query_tool: QueryToolHandler::new(pool).with_default_limit(default_limit),
            tool_router: Self::tool_router(),
        }
    }

    /// Resources advertised to clients.
    pub fn resources() -> Vec<Resource> {
        let mut raw = RawResource::new(SCHEMA_RESOURCE_URI, "public schema");
        raw.description = Some(
            "Columns of every table in the public schema: table_name, column_name, data_type, is_nullable"
                .to_string(),
        );
        raw.mime_type = Some("application/json".to_string());
        vec![raw.no_annotation()]
    }

    /// Read a resource by URI.
    pub async fn read(&self, uri: &str) -> Result<ReadResourceResult, McpError> {
        if uri != SCHEMA_RESOURCE_URI {
            return Err(McpError::resource_not_found(
                format!("Unknown resource: {}", uri),
                None,
            ));
        }
        let catalog = self.schema_tool.public_catalog().await?;
        Ok(ReadResourceResult {
            contents: vec![ResourceContents::text(catalog, uri)],
        })
    }

    /// Prompts advertised to clients.
    pub fn prompts() -> Vec<Prompt> {
        vec![Prompt::new(
            SAFE_SQL_PROMPT,
            Some("Overview of the available SQL tools"),
            None,
        )]
    }

    /// Render a prompt by name.
    pub fn prompt(name: &str) -> Result<GetPromptResult, McpError> {
        if name != SAFE_SQL_PROMPT {
            return Err(McpError::invalid_params(
                format!("Unknown prompt: {}", name),
                None,
            ));
        }
        Ok(GetPromptResult {
            description: Some("Overview of the available SQL tools".to_string()),
            messages: vec![PromptMessage::new_text(PromptMessageRole::User, HELP_TEXT)],
        })
    }
}

#[tool_router]
impl GateService {
    #[tool(description = "Health check.\nRuns a trivial statement and reports the round-trip latency.")]
    async fn ping(&self) -> Result<CallToolResult, McpError> {
        let status = self.health_tool.ping().await?;
        Ok(CallToolResult::success(vec![Content::text(status)]))
    }

    #[tool(
        description = "Get the columns and primary key of a table.\nPayload: {\"schema\": \"public\", \"table\": \"<name>\"} as an object or JSON text; malformed JSON is repaired.\nOnly the public schema may be described."
    )]
    async fn describe_table(
        &self,
        Parameters(input): Parameters<DescribeTableInput>,
    ) -> Result<CallToolResult, McpError> {
        json_success(&self.schema_tool.describe_table(input).await)
    }

    #[tool(
        description = "Run a SQL statement.\nrole \"read\" (default) admits only SELECT, SHOW, EXPLAIN and WITH; role \"write\" admits anything.\nRead-only SELECT/WITH statements without a LIMIT are capped at `limit` rows (default 2000); SHOW and EXPLAIN are never capped.\nUnder role \"read\", text holding more than one statement is rejected.\nparams: object or JSON text whose values bind to placeholders in key order.\nReturns {rows, count, sql}, {status, affected, sql} or {error, sql?}."
    )]
    async fn query(
        &self,
        Parameters(input): Parameters<QueryInput>,
    ) -> Result<CallToolResult, McpError> {
        json_success(&self.query_tool.query(input).await)
    }
}

#[tool_handler]
impl ServerHandler for GateService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_03_26,
            capabilities: ServerCapabilities::builder()
                .enable_prompts()
                .enable_resources()
                .enable_tools()
                .build(),
            server_info: Implementation {
                name: "sql-gate-mcp".to_owned(),
                title: Some("SQL Gate MCP Server".to_owned()),
                version: env!("CARGO_PKG_VERSION").to_owned(),
                icons: None,
                website_url: None,
            },
            instructions: Some(format!(
                "{}\n\
                ## Roles\n\
                - `read` (default): SELECT, SHOW, EXPLAIN and WITH only; anything else is rejected\n\
                - `write`: any statement\n\
                \n\
                ## Results\n\
                Every tool returns JSON. Failures carry an `error` key instead of raising.\n\
                \n\
                ## Resources\n\
                - `{}`: column catalog of the public schema",
                HELP_TEXT, SCHEMA_RESOURCE_URI
            )),
        }
    }

    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, McpError> {
        Ok(ListResourcesResult::with_all_items(Self::resources()))
    }

    async fn read_resource(
        &self,
        request: ReadResourceRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, McpError> {
        self.read(&request.uri).await
    }

    async fn list_prompts(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListPromptsResult, McpError> {
        Ok(ListPromptsResult::with_all_items(Self::prompts()))
    }

    async fn get_prompt(
        &self,
        request: GetPromptRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<GetPromptResult, McpError> {
        Self::prompt(&request.name)
    }
}

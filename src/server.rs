use rmcp::{
    ServerHandler, ServiceExt,
    model::{
        CallToolRequestParam, CallToolResult, Content, JsonObject, ListToolsResult,
        PaginatedRequestParam, ServerCapabilities, ServerInfo, Tool,
    },
    service::RequestContext,
    transport::stdio,
};
use schemars::JsonSchema;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;

use crate::config::ConnectionProvider;
use crate::error::PeekError;
use crate::security::{KeywordBlocklist, QueryGate};
use crate::tools::query::{self, ErrorRecord, Record};
use crate::tools::schema::{self, ColumnDescriptor};

#[derive(Clone)]
pub struct SqliteHandler {
    provider: Arc<dyn ConnectionProvider>,
    gate: Arc<dyn QueryGate>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct DescribeTableRequest {
    #[schemars(description = "Name of the table to describe")]
    pub table_name: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ExecuteQueryRequest {
    #[schemars(description = "SQL SELECT query to execute")]
    pub sql: String,
}

impl SqliteHandler {
    pub fn new(provider: impl ConnectionProvider + 'static) -> Self {
        Self::with_gate(provider, KeywordBlocklist::new())
    }

    pub fn with_gate(
        provider: impl ConnectionProvider + 'static,
        gate: impl QueryGate + 'static,
    ) -> Self {
        Self {
            provider: Arc::new(provider),
            gate: Arc::new(gate),
        }
    }

    pub async fn get_all_tables_tool(&self) -> Result<Vec<String>, PeekError> {
        let conn = self.provider.open()?;
        schema::list_tables(&conn)
    }

    pub async fn describe_table_tool(
        &self,
        req: DescribeTableRequest,
    ) -> Result<Vec<ColumnDescriptor>, PeekError> {
        let conn = self.provider.open()?;
        let columns = schema::describe_table(&conn, &req.table_name)?;
        if columns.is_empty() {
            tracing::debug!("No columns found for table '{}'", req.table_name);
        }
        Ok(columns)
    }

    /// Gate, then execute. Rejections and store failures come back as a
    /// single error record; only a failed connection is an `Err`.
    pub async fn execute_query_tool(
        &self,
        req: ExecuteQueryRequest,
    ) -> Result<Vec<Record>, PeekError> {
        let verdict = self.gate.classify(&req.sql);
        if !verdict.allowed {
            let reason = verdict.reason.unwrap_or_default();
            tracing::warn!("Rejected query: {}", reason);
            return Ok(ErrorRecord::security(reason).into_rows());
        }

        tracing::debug!("Executing query: {}", req.sql);
        let conn = self.provider.open()?;
        Ok(query::execute_or_error_record(&conn, &req.sql))
    }

    fn get_tools() -> Vec<Tool> {
        vec![
            Tool::new(
                "get_all_tables",
                "Returns a list of all table names in the database",
                empty_schema(),
            ),
            Tool::new(
                "describe_table",
                "Returns the columns of a table: cid, name, type, notnull, dflt_value and pk. \
                 An unknown table returns an empty list.",
                schema_for::<DescribeTableRequest>(),
            ),
            Tool::new(
                "execute_query",
                "Executes a read-only SQL SELECT query and returns one object per row. \
                 Queries that do not start with SELECT, or that contain DROP, DELETE, INSERT, \
                 UPDATE, ALTER or CREATE anywhere in their text, are rejected with a SecurityError.",
                schema_for::<ExecuteQueryRequest>(),
            ),
        ]
    }

    /// Route a tool call by name and serialize its result.
    pub async fn dispatch(
        &self,
        name: &str,
        arguments: Option<JsonObject>,
    ) -> Result<Value, PeekError> {
        tracing::info!("Tool call: {}", name);
        match name {
            "get_all_tables" => Ok(serde_json::to_value(self.get_all_tables_tool().await?)?),
            "describe_table" => {
                let req = parse_arguments(arguments)?;
                Ok(serde_json::to_value(self.describe_table_tool(req).await?)?)
            }
            "execute_query" => {
                let req = parse_arguments(arguments)?;
                Ok(serde_json::to_value(self.execute_query_tool(req).await?)?)
            }
            other => Err(PeekError::UnknownTool(other.to_string())),
        }
    }

    async fn list_tools_handler(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<rmcp::service::RoleServer>,
    ) -> Result<ListToolsResult, rmcp::ErrorData> {
        Ok(ListToolsResult {
            tools: Self::get_tools(),
            next_cursor: None,
        })
    }

    async fn call_tool_handler(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<rmcp::service::RoleServer>,
    ) -> Result<CallToolResult, rmcp::ErrorData> {
        let result = self
            .dispatch(&request.name, request.arguments)
            .await
            .map_err(rmcp::ErrorData::from)?;

        Ok(CallToolResult::success(vec![Content::json(result)?]))
    }
}

fn parse_arguments<T: DeserializeOwned>(arguments: Option<JsonObject>) -> Result<T, PeekError> {
    serde_json::from_value(Value::Object(arguments.unwrap_or_default()))
        .map_err(|e| PeekError::InvalidArguments(e.to_string()))
}

fn schema_for<T: JsonSchema>() -> Arc<JsonObject> {
    match serde_json::to_value(schemars::schema_for!(T)) {
        Ok(Value::Object(map)) => Arc::new(map),
        _ => empty_schema(),
    }
}

fn empty_schema() -> Arc<JsonObject> {
    let mut map = serde_json::Map::new();
    map.insert("type".into(), Value::String("object".into()));
    map.insert("properties".into(), Value::Object(serde_json::Map::new()));
    map.insert("additionalProperties".into(), Value::Bool(false));
    Arc::new(map)
}

impl ServerHandler for SqliteHandler {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            instructions: Some(
                "Read-only SQLite explorer. Use get_all_tables to list tables, describe_table to \
                inspect columns and execute_query to run SELECT statements. Failed or rejected \
                queries return a one-element list holding {error, type}. The query filter is a \
                plain keyword blocklist: column names such as updated_at or created also trip it."
                    .into(),
            ),
            ..Default::default()
        }
    }

    fn list_tools(
        &self,
        request: Option<PaginatedRequestParam>,
        context: RequestContext<rmcp::service::RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListToolsResult, rmcp::ErrorData>> + Send + '_
    {
        self.list_tools_handler(request, context)
    }

    fn call_tool(
        &self,
        request: CallToolRequestParam,
        context: RequestContext<rmcp::service::RoleServer>,
    ) -> impl std::future::Future<Output = Result<CallToolResult, rmcp::ErrorData>> + Send + '_
    {
        self.call_tool_handler(request, context)
    }
}

pub async fn run(provider: impl ConnectionProvider + 'static) -> anyhow::Result<()> {
    let handler = SqliteHandler::new(provider);

    // Serve the handler with stdio transport
    let server = handler.serve(stdio()).await?;

    // Wait for service to complete
    server.waiting().await?;

    Ok(())
}

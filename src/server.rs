use std::future::Future;

use rmcp::model::*;
use rmcp::service::RequestContext;
use rmcp::{RoleServer, ServerHandler};

use crate::dispatch::Dispatcher;
use crate::tools::{ToolName, ToolRequest};

#[derive(Clone)]
pub struct McpGhServer {
    dispatcher: Dispatcher,
}

impl McpGhServer {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }

    /// One entry per [`ToolName`], schemas generated from the parameter types.
    pub fn tools() -> Vec<Tool> {
        ToolName::ALL
            .into_iter()
            .map(|name| Tool::new(name.as_str(), name.description(), name.input_schema()))
            .collect()
    }

    /// Parse raw arguments, run the request, and render the result as pretty JSON text.
    ///
    /// Argument errors go through the same path as dispatch errors so they
    /// carry `data.kind` too.
    async fn call(
        &self,
        name: &str,
        arguments: Option<JsonObject>,
    ) -> Result<CallToolResult, ErrorData> {
        let arguments = arguments
            .map(serde_json::Value::Object)
            .unwrap_or(serde_json::Value::Null);
        let request = ToolRequest::parse(name, arguments).map_err(|e| {
            tracing::warn!(tool = %name, error = %e, "Rejected tool arguments");
            e.to_mcp_error()
        })?;
        let value = self
            .dispatcher
            .dispatch(request)
            .await
            .map_err(|e| e.to_mcp_error())?;
        let text = serde_json::to_string_pretty(&value).unwrap_or_else(|_| "{}".to_string());
        Ok(CallToolResult::success(vec![Content::text(text)]))
    }
}

impl ServerHandler for McpGhServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "mcp-gh".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                ..Default::default()
            },
            instructions: Some(
                "GitHub server. Use create_repo to create repositories, clone_repo to clone, \
                 commit_and_push to commit and push local changes, create_issue to open issues, \
                 list_repos to list repositories, and get_repo_info for repository details."
                    .to_string(),
            ),
        }
    }

    fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> impl Future<Output = Result<ListToolsResult, ErrorData>> + Send + '_ {
        async move { Ok(ListToolsResult::with_all_items(Self::tools())) }
    }

    fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> impl Future<Output = Result<CallToolResult, ErrorData>> + Send + '_ {
        async move { self.call(&request.name, request.arguments).await }
    }
}

//! MCP server handler implementation.
//!
//! This module defines the worker handler that routes tool calls to the
//! reconciler and the cache.
use std::sync::Arc;

use crate::tools::{
    cache::{CacheKeysParams, CachePurgeParams, keys_impl, purge_impl},
    poll_messages::{PollMessagesParams, poll_impl},
    resource_fetch::{ResourceFetchParams, fetch_impl},
    warm_routes::warm_impl,
};

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};
use swcache_client::{Reconciler, WarmRequest};
use swcache_core::PageMessage;
use tokio::sync::{Mutex, mpsc::UnboundedReceiver};
use url::Url;

/// The MCP server handler for the swcache worker.
#[derive(Clone)]
pub struct WorkerServer {
    tool_router: ToolRouter<Self>,
    reconciler: Arc<Reconciler>,
    messages: Arc<Mutex<UnboundedReceiver<PageMessage>>>,
    origin: Url,
}

/// Tool router implementation using the #[tool_router] macro.
#[tool_router]
impl WorkerServer {
    /// Create a new server handler around an activated reconciler.
    pub fn new(reconciler: Arc<Reconciler>, messages: UnboundedReceiver<PageMessage>, origin: Url) -> Self {
        Self { tool_router: Self::tool_router(), reconciler, messages: Arc::new(Mutex::new(messages)), origin }
    }

    /// Resolve a request through the route table.
    #[tool(
        description = "Fetch a resource as the page would. Serves from the matching named cache when possible; returns status, source (cache/network/placeholder/passthrough) and body."
    )]
    async fn resource_fetch(&self, params: Parameters<ResourceFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.reconciler, &self.origin, params.0).await
    }

    #[tool(
        description = "Cache every runtime-manifest resource whose URL matches any of the given regular expressions."
    )]
    async fn warm_routes(&self, params: Parameters<WarmRequest>) -> Result<CallToolResult, McpError> {
        warm_impl(&self.reconciler, params.0).await
    }

    /// Drain notifications posted since the last poll.
    #[tool(description = "Return and clear the FETCH_ERROR messages queued for the page.")]
    async fn poll_messages(&self, params: Parameters<PollMessagesParams>) -> Result<CallToolResult, McpError> {
        let mut messages = self.messages.lock().await;
        poll_impl(&mut messages, params.0).await
    }

    #[tool(description = "List the keys stored in a named cache.")]
    async fn cache_keys(&self, params: Parameters<CacheKeysParams>) -> Result<CallToolResult, McpError> {
        keys_impl(self.reconciler.db(), params.0).await
    }

    #[tool(description = "Purge a named cache by age (older_than_days), by count (max_entries), or entirely (clear).")]
    async fn cache_purge(&self, params: Parameters<CachePurgeParams>) -> Result<CallToolResult, McpError> {
        purge_impl(self.reconciler.db(), params.0).await
    }
}

impl ServerHandler for WorkerServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "swcache-worker".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}

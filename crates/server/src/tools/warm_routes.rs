//! warm_routes tool implementation.
//!
//! Caches every runtime-manifest resource matching the given patterns.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use swcache_client::{Reconciler, WarmRequest};

use super::json_result;

pub async fn warm_impl(reconciler: &Reconciler, params: WarmRequest) -> Result<CallToolResult, McpError> {
    let report = reconciler.warm(&params).await?;
    json_result(&report)
}

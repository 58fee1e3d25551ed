//! poll_messages tool implementation.
//!
//! Drains the page messages queued since the last poll.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_core::PageMessage;
use tokio::sync::mpsc::UnboundedReceiver;

use super::json_result;

/// Parameters for the poll_messages tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct PollMessagesParams {}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PollMessagesOutput {
    pub messages: Vec<PageMessage>,
}

/// Take every message currently queued. Never waits.
pub fn drain(rx: &mut UnboundedReceiver<PageMessage>) -> Vec<PageMessage> {
    let mut messages = Vec::new();
    while let Ok(message) = rx.try_recv() {
        messages.push(message);
    }
    messages
}

pub async fn poll_impl(
    rx: &mut UnboundedReceiver<PageMessage>, _params: PollMessagesParams,
) -> Result<CallToolResult, McpError> {
    json_result(&PollMessagesOutput { messages: drain(rx) })
}

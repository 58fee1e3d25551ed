//! resource_fetch tool implementation.
//!
//! Runs a request through the reconciler exactly as an intercepted page
//! request would be handled.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_client::fetch::resolve_url;
use swcache_client::{Destination, Reconciler, ResolutionSource, ResourceRequest};
use swcache_core::Error;
use url::Url;

use super::json_result;

/// Input parameters for the resource_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ResourceFetchParams {
    /// Absolute URL, or a path relative to the configured origin.
    pub url: String,

    /// Request destination. Inferred from the file extension when omitted.
    #[serde(default)]
    pub destination: Option<Destination>,
}

/// Output structure for the resource_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ResourceFetchOutput {
    pub url: String,
    pub destination: Destination,
    pub status: u16,
    pub source: ResolutionSource,
    pub content_type: Option<String>,
    pub byte_length: usize,
    /// Body text, when the body is valid UTF-8.
    pub body: Option<String>,
}

pub async fn fetch_impl(
    reconciler: &Reconciler, origin: &Url, params: ResourceFetchParams,
) -> Result<CallToolResult, McpError> {
    let url = resolve_url(origin, &params.url).map_err(Error::from)?;
    let request = match params.destination {
        Some(destination) => ResourceRequest::new(url, destination),
        None => ResourceRequest::inferred(url),
    };

    let resolution = reconciler.handle(&request).await;
    let response = &resolution.response;

    let output = ResourceFetchOutput {
        url: request.url.to_string(),
        destination: request.destination,
        status: response.status,
        source: resolution.source,
        content_type: response.content_type().map(str::to_string),
        byte_length: response.body.len(),
        body: std::str::from_utf8(&response.body).ok().map(str::to_string),
    };
    json_result(&output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::parse_result;
    use crate::tools::testing::{fixture, origin};

    fn params(url: &str) -> ResourceFetchParams {
        ResourceFetchParams { url: url.to_string(), destination: None }
    }

    #[tokio::test]
    async fn test_fetch_then_serve_from_cache() {
        let f = fixture(&[("data/spells.json", "s1")]).await;
        f.fetcher.serve("data/spells.json", "[1]");

        let first: ResourceFetchOutput =
            parse_result(&fetch_impl(&f.reconciler, &origin(), params("data/spells.json")).await.unwrap());
        let second: ResourceFetchOutput =
            parse_result(&fetch_impl(&f.reconciler, &origin(), params("/data/spells.json")).await.unwrap());

        assert_eq!(first.source, ResolutionSource::Network);
        assert_eq!(second.source, ResolutionSource::Cache);
        assert_eq!(second.body.as_deref(), Some("[1]"));
        assert_eq!(second.destination, Destination::Fetch);
    }

    #[tokio::test]
    async fn test_offline_returns_placeholder() {
        let f = fixture(&[("data/spells.json", "s1")]).await;

        let output: ResourceFetchOutput =
            parse_result(&fetch_impl(&f.reconciler, &origin(), params("data/spells.json")).await.unwrap());

        assert_eq!(output.source, ResolutionSource::Placeholder);
        assert_eq!(output.status, 200);
        assert_eq!(output.byte_length, 0);
    }

    #[tokio::test]
    async fn test_explicit_destination_overrides_inference() {
        let f = fixture(&[]).await;
        f.fetcher.serve("assets/glyph", "font-bytes");

        let output: ResourceFetchOutput = parse_result(
            &fetch_impl(
                &f.reconciler,
                &origin(),
                ResourceFetchParams { url: "assets/glyph".into(), destination: Some(Destination::Font) },
            )
            .await
            .unwrap(),
        );

        assert_eq!(output.destination, Destination::Font);
        assert_eq!(output.source, ResolutionSource::Network);
    }

    #[tokio::test]
    async fn test_rejects_non_http_url() {
        let f = fixture(&[]).await;
        let err = fetch_impl(&f.reconciler, &origin(), params("ftp://example.com/a.json"))
            .await
            .unwrap_err();
        assert_eq!(err.code.0, -32003);
        assert!(err.message.contains("unsupported scheme"));
    }
}

//! Request URL resolution against the site origin.

use swcache_core::Error;
use url::Url;

/// Error type for URL resolution failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

impl From<UrlError> for Error {
    fn from(err: UrlError) -> Self {
        Error::InvalidUrl(err.to_string())
    }
}

/// Resolve a request URL the way the page would issue it.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Absolute URLs are parsed as-is; anything else is joined onto `origin`
/// 3. Only http and https are accepted
/// 4. Remove fragment (#...)
/// 5. Keep query string intact (do not reorder)
pub fn resolve_url(origin: &Url, input: &str) -> Result<Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let mut parsed = if trimmed.contains("://") {
        Url::parse(trimmed).map_err(|e| UrlError::InvalidUrl(e.to_string()))?
    } else {
        origin.join(trimmed).map_err(|e| UrlError::InvalidUrl(e.to_string()))?
    };

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }

    parsed.set_fragment(None);

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> Url {
        Url::parse("https://rules.example.com").unwrap()
    }

    #[test]
    fn test_resolve_absolute() {
        let url = resolve_url(&origin(), "https://cdn.example.org/img/a.png").unwrap();
        assert_eq!(url.host_str(), Some("cdn.example.org"));
    }

    #[test]
    fn test_resolve_relative_path() {
        let url = resolve_url(&origin(), "data/a.json").unwrap();
        assert_eq!(url.as_str(), "https://rules.example.com/data/a.json");

        let url = resolve_url(&origin(), "/data/a.json").unwrap();
        assert_eq!(url.as_str(), "https://rules.example.com/data/a.json");
    }

    #[test]
    fn test_resolve_lowercases_host() {
        let url = resolve_url(&origin(), "https://RULES.EXAMPLE.COM/a.json").unwrap();
        assert_eq!(url.host_str(), Some("rules.example.com"));
    }

    #[test]
    fn test_resolve_removes_fragment() {
        let url = resolve_url(&origin(), "variantrules.html#rule").unwrap();
        assert_eq!(url.fragment(), None);
        assert_eq!(url.path(), "/variantrules.html");
    }

    #[test]
    fn test_resolve_preserves_query() {
        let url = resolve_url(&origin(), "/search?a=1&b=2").unwrap();
        assert_eq!(url.query(), Some("a=1&b=2"));
    }

    #[test]
    fn test_resolve_unsupported_scheme() {
        let result = resolve_url(&origin(), "file:///etc/passwd");
        assert!(matches!(result, Err(UrlError::UnsupportedScheme(_))));
    }

    #[test]
    fn test_resolve_empty() {
        assert!(matches!(resolve_url(&origin(), ""), Err(UrlError::Empty)));
        assert!(matches!(resolve_url(&origin(), "   "), Err(UrlError::Empty)));
    }

    #[test]
    fn test_url_error_converts_to_invalid_url() {
        let err = resolve_url(&origin(), "ftp://example.com/a").unwrap_err();
        let err = Error::from(err);
        assert!(matches!(&err, Error::InvalidUrl(msg) if msg.contains("ftp")));
    }
}

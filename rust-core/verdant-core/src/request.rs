//! # HTTP Request
//!
//! Owned request snapshot handed to the routing core.
//!
//! The body is collected once by the transport layer (bounded by
//! `Config::max_body_size`) so handlers run synchronously on a worker thread
//! without touching the connection.
//!
//! The path is percent-decoded once, here; routing, parameters and static
//! file lookup all see the decoded form. The raw query string is kept as
//! received.

use crate::error::{Error, Result};
use crate::router::Method;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::{Body, Bytes};
use hyper::header::{HeaderName, HeaderValue};
use hyper::HeaderMap;
use percent_encoding::percent_decode_str;
use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;

/// HTTP request as seen by handlers
#[derive(Debug, Clone)]
pub struct Request {
    /// HTTP method
    pub method: Method,
    /// Request path (without query string)
    pub path: String,
    /// Raw query string (e.g., "page=1&limit=10")
    query_string: Option<String>,
    /// Parsed query parameters
    query_params: HashMap<String, String>,
    /// Request headers
    headers: HeaderMap,
    /// Request body (collected)
    body: Bytes,
    /// Peer address, when known
    remote_addr: Option<SocketAddr>,
}

impl Default for Request {
    fn default() -> Self {
        Self::new(Method::Get, "/")
    }
}

impl Request {
    /// Create a request manually (tests, internal use)
    ///
    /// A `?query` suffix on `path` is split off and parsed; the path itself is
    /// percent-decoded like one arriving over the wire.
    ///
    /// # Arguments
    ///
    /// * `method` - HTTP method
    /// * `path` - Request target, optionally with a query string
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        let path = path.into();
        let (path, query_string) = match path.split_once('?') {
            Some((p, q)) => (decode_path(p), Some(q.to_string())),
            None => (decode_path(&path), None),
        };
        let query_params = parse_query_string(query_string.as_deref());

        Self {
            method,
            path,
            query_string,
            query_params,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            remote_addr: None,
        }
    }

    /// Builder: set a header
    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.set_header(name, value);
        self
    }

    /// Builder: set the body
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Builder: set the peer address
    #[must_use]
    pub fn with_remote_addr(mut self, addr: SocketAddr) -> Self {
        self.remote_addr = Some(addr);
        self
    }

    /// Create from a hyper request, collecting at most `max_body_size` bytes
    ///
    /// # Errors
    ///
    /// `Error::UnsupportedMethod` for methods outside [`Method`],
    /// `Error::PayloadTooLarge` when the body exceeds the limit, and
    /// `Error::Http` when the body stream fails.
    pub async fn from_hyper_with_limit(
        req: hyper::Request<hyper::body::Incoming>,
        max_body_size: usize,
        remote_addr: SocketAddr,
    ) -> Result<Self> {
        let method: Method = req.method().as_str().parse()?;

        let uri = req.uri();
        let path = decode_path(uri.path());
        let query_string = uri.query().map(String::from);
        let query_params = parse_query_string(query_string.as_deref());

        let headers = req.headers().clone();
        if let Some(content_len) = headers
            .get(hyper::header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<usize>().ok())
        {
            if content_len > max_body_size {
                return Err(Error::PayloadTooLarge {
                    limit: max_body_size,
                    actual: content_len,
                });
            }
        }

        let body = collect_limited(req.into_body(), max_body_size).await?;

        Ok(Self {
            method,
            path,
            query_string,
            query_params,
            headers,
            body,
            remote_addr: Some(remote_addr),
        })
    }

    /// Get a header value by name (case-insensitive)
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Set or override a header
    pub fn set_header(&mut self, name: &str, value: &str) {
        if let (Ok(n), Ok(v)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.insert(n, v);
        }
    }

    /// All request headers
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Single query parameter
    #[must_use]
    pub fn query(&self, name: &str) -> Option<&str> {
        self.query_params.get(name).map(String::as_str)
    }

    /// Get query parameters as a HashMap
    #[must_use]
    pub fn query_map(&self) -> &HashMap<String, String> {
        &self.query_params
    }

    /// Get raw query string
    #[must_use]
    pub fn query_string(&self) -> Option<&str> {
        self.query_string.as_deref()
    }

    /// Request body bytes
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Request body as UTF-8, if valid
    #[must_use]
    pub fn body_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }

    /// Peer address, when known
    #[must_use]
    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }
}

/// Collect `body`, giving up as soon as it grows past `limit`
///
/// Chunked bodies carry no length up front, so the limit is enforced while
/// reading rather than after.
async fn collect_limited<B>(body: B, limit: usize) -> Result<Bytes>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let collected = Limited::new(body, limit)
        .collect()
        .await
        .map_err(|err| body_error(err, limit))?;
    Ok(collected.to_bytes())
}

fn body_error(err: Box<dyn std::error::Error + Send + Sync>, limit: usize) -> Error {
    if err.is::<LengthLimitError>() {
        // streaming stops one frame past the limit, so the real size is unknown
        return Error::PayloadTooLarge {
            limit,
            actual: limit.saturating_add(1),
        };
    }
    match err.downcast::<hyper::Error>() {
        Ok(err) => Error::Http(*err),
        Err(err) => Error::Io(io::Error::other(err)),
    }
}

/// Percent-decode a request path
///
/// Invalid UTF-8 sequences are replaced rather than rejected.
fn decode_path(raw: &str) -> String {
    percent_decode_str(raw).decode_utf8_lossy().into_owned()
}

/// Parse query string into HashMap
///
/// Handles URL decoding and duplicate keys (last value wins).
fn parse_query_string(query: Option<&str>) -> HashMap<String, String> {
    query
        .map(|q| {
            q.split('&')
                .filter(|pair| !pair.is_empty())
                .map(|pair| {
                    let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
                    (url_decode(key), url_decode(value))
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Form-style decoding: `+` is a space, then percent escapes
fn url_decode(s: &str) -> String {
    let spaced = s.replace('+', " ");
    percent_decode_str(&spaced).decode_utf8_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_query_string_simple() {
        let result = parse_query_string(Some("page=1&limit=10"));
        assert_eq!(result.get("page"), Some(&"1".to_string()));
        assert_eq!(result.get("limit"), Some(&"10".to_string()));
    }

    #[test]
    fn test_parse_query_string_empty() {
        let result = parse_query_string(None);
        assert!(result.is_empty());
    }

    #[test]
    fn test_parse_query_string_url_encoded() {
        let result = parse_query_string(Some("name=John+Doe&city=New%20York"));
        assert_eq!(result.get("name"), Some(&"John Doe".to_string()));
        assert_eq!(result.get("city"), Some(&"New York".to_string()));
    }

    #[test]
    fn test_url_decode() {
        assert_eq!(url_decode("hello+world"), "hello world");
        assert_eq!(url_decode("hello%20world"), "hello world");
        assert_eq!(url_decode("100%25"), "100%");
        assert_eq!(url_decode("caf%C3%A9"), "café");
        assert_eq!(url_decode("50%"), "50%");
        assert_eq!(url_decode("%zz"), "%zz");
    }

    #[test]
    fn test_path_is_percent_decoded() {
        let req = Request::new(Method::Get, "/profile/John%20Doe?tag=a%20b");
        assert_eq!(req.path, "/profile/John Doe");
        assert_eq!(req.query_string(), Some("tag=a%20b"));
        assert_eq!(req.query("tag"), Some("a b"));

        assert_eq!(decode_path("/caf%C3%A9"), "/café");
        assert_eq!(decode_path("/a+b"), "/a+b");
        assert_eq!(decode_path("/bad%zz"), "/bad%zz");
    }

    #[test]
    fn test_collect_limited_stops_at_limit() {
        let small = http_body_util::Full::new(Bytes::from_static(b"0123456789"));
        let body = tokio_test::block_on(collect_limited(small, 16)).unwrap();
        assert_eq!(&body[..], b"0123456789");

        let big = http_body_util::Full::new(Bytes::from(vec![b'x'; 32]));
        let err = tokio_test::block_on(collect_limited(big, 16)).unwrap_err();
        assert!(matches!(err, Error::PayloadTooLarge { limit: 16, actual: 17 }));
    }

    #[test]
    fn test_body_error_keeps_transport_failures() {
        let err = body_error("connection reset".into(), 16);
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_new_splits_query() {
        let req = Request::new(Method::Get, "/search?q=rust");
        assert_eq!(req.path, "/search");
        assert_eq!(req.query("q"), Some("rust"));
        assert_eq!(req.query_string(), Some("q=rust"));
    }

    #[test]
    fn test_headers_case_insensitive() {
        let req = Request::new(Method::Post, "/").with_header("X-Request-Id", "abc");
        assert_eq!(req.header("x-request-id"), Some("abc"));
    }
}

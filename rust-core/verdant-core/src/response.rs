//! # HTTP Response
//!
//! [`ResponseWriter`] is the mutable, pooled buffer handlers write into.
//! [`Response`] is the finished, immutable result: what the transport sends
//! and what the response cache stores and replays.

use crate::error::{Error, Result};
use crate::render::Renderer;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use hyper::{HeaderMap, StatusCode};
use std::io;
use std::sync::Arc;

/// Finished HTTP response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// HTTP status code
    pub status: u16,
    /// Response headers
    pub headers: HeaderMap,
    /// Response body
    pub body: Bytes,
}

impl Default for Response {
    fn default() -> Self {
        Self {
            status: 200,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }
}

impl Response {
    /// Create a text response
    #[must_use]
    pub fn text(body: impl Into<String>) -> Self {
        Self::default()
            .with_header("Content-Type", "text/plain; charset=utf-8")
            .with_body(body.into())
    }

    /// Set status code
    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    /// Set or override a header
    #[must_use]
    pub fn with_header(mut self, key: &str, value: &str) -> Self {
        insert_header(&mut self.headers, key, value);
        self
    }

    /// Replace the body
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Header value by name
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Body as UTF-8 (lossy)
    #[must_use]
    pub fn body_string(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Convert to hyper Response
    #[must_use]
    pub fn into_hyper(self) -> hyper::Response<Full<Bytes>> {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let mut response = hyper::Response::new(Full::new(self.body));
        *response.status_mut() = status;
        *response.headers_mut() = self.headers;
        response
    }
}

fn insert_header(headers: &mut HeaderMap, key: &str, value: &str) {
    if let (Ok(n), Ok(v)) = (
        HeaderName::from_bytes(key.as_bytes()),
        HeaderValue::from_str(value),
    ) {
        headers.insert(n, v);
    }
}

/// Mutable response buffer owned by a [`crate::Context`]
///
/// Reset between requests; the body buffer keeps its capacity.
pub struct ResponseWriter {
    status: u16,
    headers: HeaderMap,
    body: Vec<u8>,
    renderer: Option<Arc<dyn Renderer>>,
}

impl std::fmt::Debug for ResponseWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseWriter")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("body_len", &self.body.len())
            .field("renderer", &self.renderer.is_some())
            .finish()
    }
}

impl Default for ResponseWriter {
    fn default() -> Self {
        Self::new(None)
    }
}

impl ResponseWriter {
    /// Create an empty writer
    #[must_use]
    pub fn new(renderer: Option<Arc<dyn Renderer>>) -> Self {
        Self {
            status: 200,
            headers: HeaderMap::new(),
            body: Vec::new(),
            renderer,
        }
    }

    /// Restore the initial state, keeping the body allocation
    pub fn reset(&mut self) {
        self.status = 200;
        self.headers.clear();
        self.body.clear();
    }

    /// Current status code
    #[must_use]
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Set the status code
    pub fn set_status(&mut self, status: u16) {
        self.status = status;
    }

    /// Header value by name
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Set or override a header
    pub fn set_header(&mut self, name: &str, value: &str) {
        insert_header(&mut self.headers, name, value);
    }

    /// Set the content type unless a handler already chose one
    pub fn default_content_type(&mut self, value: &'static str) {
        if !self.headers.contains_key(CONTENT_TYPE) {
            self.headers
                .insert(CONTENT_TYPE, HeaderValue::from_static(value));
        }
    }

    /// Append raw bytes to the body
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.body.extend_from_slice(bytes);
    }

    /// Append text to the body
    pub fn write_str(&mut self, text: &str) {
        self.default_content_type("text/plain; charset=utf-8");
        self.body.extend_from_slice(text.as_bytes());
    }

    /// Body written so far
    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Discard the body written so far
    pub fn clear_body(&mut self) {
        self.body.clear();
    }

    /// Discard every header set so far
    pub fn clear_headers(&mut self) {
        self.headers.clear();
    }

    /// Execute a template through the installed renderer
    ///
    /// Output written before a failure is discarded.
    ///
    /// # Errors
    ///
    /// `Error::MissingRenderer` when none is installed, otherwise whatever the
    /// renderer reports.
    pub fn render(&mut self, name: &str, data: &serde_json::Value) -> Result<()> {
        let renderer = self.renderer.clone().ok_or(Error::MissingRenderer)?;
        let mark = self.body.len();
        match renderer.execute(self, name, data) {
            Ok(()) => {
                self.default_content_type(renderer.content_type());
                Ok(())
            }
            Err(err) => {
                self.body.truncate(mark);
                Err(err)
            }
        }
    }

    /// Copy the current state into a finished [`Response`]
    #[must_use]
    pub fn to_response(&self) -> Response {
        Response {
            status: self.status,
            headers: self.headers.clone(),
            body: Bytes::copy_from_slice(&self.body),
        }
    }

    /// Take the current state as a finished [`Response`], leaving the writer reset
    pub fn take_response(&mut self) -> Response {
        let response = Response {
            status: self.status,
            headers: std::mem::take(&mut self.headers),
            body: Bytes::copy_from_slice(&self.body),
        };
        self.reset();
        response
    }

    /// Overwrite this writer with a stored response
    pub fn replay(&mut self, response: &Response) {
        self.status = response.status;
        self.headers.clone_from(&response.headers);
        self.body.clear();
        self.body.extend_from_slice(&response.body);
    }
}

impl io::Write for ResponseWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.body.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

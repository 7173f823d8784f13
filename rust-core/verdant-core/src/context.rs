//! # Request Context
//!
//! Per-request state threaded through the handler chain: the request, the
//! response buffer, captured parameters, the chain cursor and a user-value bag.
//!
//! Contexts are pooled (see [`crate::pool::ContextPool`]). A context serves one
//! request at a time and is reset, not reallocated, when reused.
//!
//! ## Continuation
//!
//! The dispatcher runs the first handler of the chain. A handler passes control
//! on by calling [`Context::next`]; a handler that returns without calling it
//! ends the chain there, which is how authentication guards and error handlers
//! short-circuit.

use crate::error::Result;
use crate::handler::Handler;
use crate::json;
use crate::params::Params;
use crate::render::Renderer;
use crate::request::Request;
use crate::response::{Response, ResponseWriter};
use crate::route::Route;
use crate::router::Method;
use crate::state::{AppState, Values};
use crate::types::{convert_param, ParamValue};
use hyper::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::error;

/// Engine-wide resources every context can reach
#[derive(Default)]
pub(crate) struct Shared {
    pub(crate) renderer: Option<Arc<dyn Renderer>>,
    pub(crate) error_handlers: HashMap<u16, Arc<[Handler]>>,
    pub(crate) state: AppState,
}

/// Per-request context
pub struct Context {
    request: Request,
    writer: ResponseWriter,
    params: Params,
    route: Option<Arc<Route>>,
    chain: Option<Arc<[Handler]>>,
    index: usize,
    stopped: bool,
    values: Values,
    shared: Arc<Shared>,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("method", &self.request.method)
            .field("path", &self.request.path)
            .field("params", &self.params)
            .field("index", &self.index)
            .field("stopped", &self.stopped)
            .finish_non_exhaustive()
    }
}

impl Context {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self {
            request: Request::default(),
            writer: ResponseWriter::new(shared.renderer.clone()),
            params: Params::new(),
            route: None,
            chain: None,
            index: 0,
            stopped: false,
            values: Values::default(),
            shared,
        }
    }

    /// Prepare for a new request, keeping buffers
    pub(crate) fn reset(&mut self, request: Request) {
        self.request = request;
        self.writer.reset();
        self.params.clear();
        self.route = None;
        self.chain = None;
        self.index = 0;
        self.stopped = false;
        self.values.clear();
    }

    /// Run `chain` from its first handler
    pub(crate) fn run_chain(&mut self, chain: Arc<[Handler]>) {
        self.chain = Some(chain);
        self.index = 0;
        self.stopped = false;
        self.run_current();
    }

    fn run_current(&mut self) {
        if self.stopped {
            return;
        }
        let Some(chain) = self.chain.clone() else {
            return;
        };
        if let Some(handler) = chain.get(self.index) {
            handler.call(self);
        }
    }

    /// Invoke the next handler in the chain
    ///
    /// Past the end of the chain, or after [`Context::stop`], this does nothing.
    pub fn next(&mut self) {
        if self.stopped {
            return;
        }
        self.index += 1;
        self.run_current();
    }

    /// Prevent any further handler from running
    pub fn stop(&mut self) {
        self.stopped = true;
    }

    /// Whether [`Context::stop`] was called
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Position of the running handler in the chain
    #[must_use]
    pub fn handler_index(&self) -> usize {
        self.index
    }

    pub(crate) fn set_route(&mut self, route: Arc<Route>) {
        self.route = Some(route);
    }

    pub(crate) fn route_parts(&mut self) -> (Method, &str, &mut Params) {
        (self.request.method, &self.request.path, &mut self.params)
    }

    pub(crate) fn take_response(&mut self) -> Response {
        self.writer.take_response()
    }

    // ---- request side ----

    /// The in-flight request
    #[must_use]
    pub fn request(&self) -> &Request {
        &self.request
    }

    /// HTTP method
    #[must_use]
    pub fn method(&self) -> Method {
        self.request.method
    }

    /// Request path, without the query string
    #[must_use]
    pub fn path(&self) -> &str {
        &self.request.path
    }

    /// Request header (case-insensitive)
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.request.header(name)
    }

    /// Query string parameter
    #[must_use]
    pub fn query(&self, name: &str) -> Option<&str> {
        self.request.query(name)
    }

    /// Decode the request body as JSON
    ///
    /// # Errors
    ///
    /// `Error::InvalidJson` when the body does not decode into `T`.
    pub fn read_json<T: DeserializeOwned>(&self) -> Result<T> {
        let mut buf = self.request.body().to_vec();
        json::parse_json_bytes(&mut buf)
    }

    /// The matched route, once routing succeeded
    #[must_use]
    pub fn route(&self) -> Option<&Arc<Route>> {
        self.route.as_ref()
    }

    /// Path parameter by name
    ///
    /// `None` means the matched route has no such parameter. A parameter that
    /// exists but captured an empty string is `Some("")`.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name)
    }

    /// Path parameter converted by the type declared in the route pattern
    #[must_use]
    pub fn param_value(&self, name: &str) -> Option<ParamValue> {
        let raw = self.params.get(name)?;
        let declared = self
            .route
            .as_ref()
            .and_then(|r| r.pattern().param_type(name))
            .unwrap_or_default();
        convert_param(raw, declared).ok()
    }

    /// All captured parameters in declaration order
    #[must_use]
    pub fn params(&self) -> &Params {
        &self.params
    }

    // ---- user values ----

    /// Store a per-request value
    pub fn set<T: Send + Sync + 'static>(&mut self, key: impl Into<String>, value: T) {
        self.values.set(key, value);
    }

    /// Read a per-request value
    #[must_use]
    pub fn get<T: 'static>(&self, key: &str) -> Option<&T> {
        self.values.get(key)
    }

    /// The per-request value bag
    #[must_use]
    pub fn values(&self) -> &Values {
        &self.values
    }

    /// Application-wide shared state
    #[must_use]
    pub fn state(&self) -> &AppState {
        &self.shared.state
    }

    // ---- response side ----

    /// The response buffer
    #[must_use]
    pub fn writer(&self) -> &ResponseWriter {
        &self.writer
    }

    /// Mutable response buffer
    pub fn writer_mut(&mut self) -> &mut ResponseWriter {
        &mut self.writer
    }

    /// Borrow the request and the response buffer together
    pub fn request_and_writer(&mut self) -> (&Request, &mut ResponseWriter) {
        (&self.request, &mut self.writer)
    }

    /// Installed renderer, if any
    #[must_use]
    pub fn renderer(&self) -> Option<Arc<dyn Renderer>> {
        self.shared.renderer.clone()
    }

    /// Set the status code
    pub fn set_status(&mut self, status: u16) {
        self.writer.set_status(status);
    }

    /// Set a response header
    pub fn set_header(&mut self, name: &str, value: &str) {
        self.writer.set_header(name, value);
    }

    /// Append bytes to the response body
    pub fn write(&mut self, bytes: &[u8]) {
        self.writer.write_bytes(bytes);
    }

    /// Append text to the response body
    pub fn write_str(&mut self, text: &str) {
        self.writer.write_str(text);
    }

    /// Write an HTML body
    pub fn html(&mut self, body: &str) {
        self.writer.set_header("Content-Type", "text/html; charset=utf-8");
        self.writer.write_bytes(body.as_bytes());
    }

    /// Serialize `value` as the JSON response body
    ///
    /// On failure the response is already switched to a 500.
    ///
    /// # Errors
    ///
    /// `Error::Json` when `value` cannot be serialized.
    pub fn json<T: Serialize>(&mut self, value: &T) -> Result<()> {
        match json::to_json_vec(value) {
            Ok(bytes) => {
                self.writer.set_header("Content-Type", "application/json");
                self.writer.write_bytes(&bytes);
                Ok(())
            }
            Err(err) => {
                error!(path = %self.request.path, error = %err, "Failed to serialize response");
                self.emit_error(500);
                Err(err)
            }
        }
    }

    /// Render template `name` with `data` through the installed renderer
    ///
    /// On failure the response is already switched to a 500.
    ///
    /// # Errors
    ///
    /// `Error::MissingRenderer`, `Error::Json` for unserializable data, or the
    /// renderer's own error.
    pub fn render<T: Serialize>(&mut self, name: &str, data: &T) -> Result<()> {
        let outcome = serde_json::to_value(data)
            .map_err(Into::into)
            .and_then(|value| self.writer.render(name, &value));
        if let Err(err) = &outcome {
            error!(path = %self.request.path, template = name, error = %err, "Render failed");
            self.emit_error(500);
        }
        outcome
    }

    /// Redirect to `url`
    pub fn redirect(&mut self, url: &str, status: u16) {
        self.writer.set_header("Location", url);
        self.writer.set_status(status);
    }

    /// Replace the response with the error response for `status`
    ///
    /// Body and headers written so far are discarded, then the handler
    /// registered for `status` runs, or the status text is written.
    /// Nothing else in the current chain runs afterwards.
    pub fn emit_error(&mut self, status: u16) {
        self.writer.clear_body();
        self.writer.clear_headers();
        self.writer.set_status(status);

        match self.shared.error_handlers.get(&status).cloned() {
            Some(chain) => self.run_chain(chain),
            None => {
                let text = StatusCode::from_u16(status)
                    .ok()
                    .and_then(|s| s.canonical_reason())
                    .unwrap_or("Error");
                self.writer.write_str(text);
            }
        }
        self.stopped = true;
    }

    /// Shorthand for `emit_error(404)`
    pub fn not_found(&mut self) {
        self.emit_error(404);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn context() -> Context {
        Context::new(Arc::new(Shared::default()))
    }

    fn chain(handlers: Vec<Handler>) -> Arc<[Handler]> {
        Arc::from(handlers)
    }

    #[test]
    fn test_next_runs_in_order() {
        let mut ctx = context();
        ctx.run_chain(chain(vec![
            Handler::context(|ctx| {
                ctx.write_str("a");
                ctx.next();
                ctx.write_str("c");
            }),
            Handler::context(|ctx| ctx.write_str("b")),
        ]));
        assert_eq!(ctx.writer().body(), b"abc");
    }

    #[test]
    fn test_missing_next_short_circuits() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let mut ctx = context();
        ctx.run_chain(chain(vec![
            Handler::context(|ctx| ctx.set_status(401)),
            Handler::context(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        ]));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert_eq!(ctx.writer().status(), 401);
    }

    #[test]
    fn test_next_past_end_is_noop() {
        let mut ctx = context();
        ctx.run_chain(chain(vec![Handler::context(|ctx| {
            ctx.next();
            ctx.next();
            ctx.write_str("done");
        })]));
        assert_eq!(ctx.writer().body(), b"done");
    }

    #[test]
    fn test_stop_blocks_next() {
        let mut ctx = context();
        ctx.run_chain(chain(vec![
            Handler::context(|ctx| {
                ctx.stop();
                ctx.next();
            }),
            Handler::context(|ctx| ctx.write_str("unreachable")),
        ]));
        assert!(ctx.is_stopped());
        assert!(ctx.writer().body().is_empty());
    }

    #[test]
    fn test_writer_and_raw_variants_continue() {
        let mut ctx = context();
        ctx.run_chain(chain(vec![
            Handler::writer(|w| w.write_str("1")),
            Handler::raw(|req, w| w.write_str(&req.path)),
            Handler::context(|ctx| ctx.write_str("3")),
        ]));
        assert_eq!(ctx.writer().body(), b"1/3");
    }

    #[test]
    fn test_context_renderer_without_renderer() {
        let mut ctx = context();
        ctx.run_chain(chain(vec![Handler::context_renderer(|ctx, renderer| {
            let mut out = Vec::new();
            let failed = renderer
                .execute(&mut out, "index", &serde_json::Value::Null)
                .is_err();
            ctx.write_str(if failed { "no renderer" } else { "rendered" });
        })]));
        assert_eq!(ctx.writer().body(), b"no renderer");
    }

    #[test]
    fn test_reset_clears_request_state() {
        let mut ctx = context();
        ctx.params.push(Arc::from("id"), "7");
        ctx.set("user", 1u8);
        ctx.set_status(500);
        ctx.stop();

        ctx.reset(Request::new(Method::Post, "/next"));
        assert!(ctx.params().is_empty());
        assert!(ctx.values().is_empty());
        assert_eq!(ctx.writer().status(), 200);
        assert!(!ctx.is_stopped());
        assert_eq!(ctx.handler_index(), 0);
        assert_eq!(ctx.method(), Method::Post);
    }

    #[test]
    fn test_param_absent_vs_empty() {
        let mut ctx = context();
        ctx.params.push(Arc::from("rest"), "");
        assert_eq!(ctx.param("rest"), Some(""));
        assert_eq!(ctx.param("other"), None);
    }

    #[test]
    fn test_emit_error_default_text() {
        let mut ctx = context();
        ctx.write_str("partial");
        ctx.emit_error(404);
        assert_eq!(ctx.writer().status(), 404);
        assert_eq!(ctx.writer().body(), b"Not Found");
    }

    #[test]
    fn test_emit_error_custom_handler() {
        let mut shared = Shared::default();
        shared.error_handlers.insert(
            500,
            chain(vec![Handler::context(|ctx| ctx.write_str("custom 500"))]),
        );
        let mut ctx = Context::new(Arc::new(shared));
        ctx.emit_error(500);
        assert_eq!(ctx.writer().body(), b"custom 500");
        assert_eq!(ctx.writer().status(), 500);
    }

    #[test]
    fn test_emit_error_drops_stale_headers() {
        let mut ctx = context();
        ctx.set_header("Content-Type", "application/json");
        ctx.set_header("X-Partial", "1");
        ctx.write_str("{\"half\":");
        assert!(ctx.render("page", &serde_json::json!({})).is_err());

        assert_eq!(ctx.writer().status(), 500);
        assert_eq!(
            ctx.writer().header("content-type"),
            Some("text/plain; charset=utf-8")
        );
        assert_eq!(ctx.writer().header("x-partial"), None);
        assert_eq!(ctx.writer().body(), b"Internal Server Error");
    }

    #[test]
    fn test_render_failure_becomes_500() {
        let mut ctx = context();
        let err = ctx.render("index", &serde_json::json!({})).unwrap_err();
        assert!(matches!(err, Error::MissingRenderer));
        assert_eq!(ctx.writer().status(), 500);
    }

    #[test]
    fn test_json_response() {
        let mut ctx = context();
        ctx.json(&serde_json::json!({"ok": true})).unwrap();
        assert_eq!(ctx.writer().header("content-type"), Some("application/json"));
        assert_eq!(ctx.writer().body(), br#"{"ok":true}"#);
    }

    #[test]
    fn test_read_json_body() {
        let mut ctx = context();
        ctx.reset(Request::new(Method::Post, "/").with_body(r#"{"n": 3}"#));
        let body: HashMap<String, i32> = ctx.read_json().unwrap();
        assert_eq!(body["n"], 3);
    }
}

//! # HTTP Server
//!
//! High-performance HTTP server built on Hyper and Tokio, plus the
//! transport-free dispatcher it drives.
//!
//! ## Dispatch
//!
//! For every request [`Server::serve`]:
//!
//! 1. answers from the response cache when `(method, path)` is cached
//! 2. takes a [`Context`](crate::Context) from the pool
//! 3. routes, then runs the matched chain, a redirect, a 405 or the 404 handler
//! 4. caches a successful matched response
//! 5. returns the context to the pool
//!
//! A panicking handler is caught here and turned into a 500. The panic
//! message is logged with the request; the stack trace comes from the hook
//! installed by [`crate::telemetry::install_panic_hook`].
//!
//! ## Key Features
//!
//! - Handlers run on Tokio's blocking pool, one task per request
//! - Graceful shutdown on Ctrl+C or [`Server::close`]
//! - Connection keep-alive support

use crate::cache::ResponseCache;
use crate::config::Config;
use crate::context::{Context, Shared};
use crate::error::{Error, Result};
use crate::plugin::PluginContainer;
use crate::pool::ContextPool;
use crate::request::Request;
use crate::response::Response;
use crate::router::{Lookup, Method, Router};
use http_body_util::Full;
use hyper::body::{Bytes, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use std::any::Any;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpSocket;
use tokio::sync::Notify;
use tracing::{debug, error, info};

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Characters escaped when a decoded path goes back into a `Location` header
const PATH_ESCAPE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

struct Inner {
    config: Config,
    router: Router,
    cache: Option<Arc<ResponseCache>>,
    pool: ContextPool,
    plugins: PluginContainer,
    shutdown: Notify,
}

/// A built application, ready to serve
///
/// Cheap to clone; clones share routes, cache and context pool.
#[derive(Clone)]
pub struct Server {
    inner: Arc<Inner>,
}

impl Server {
    pub(crate) fn new(
        config: Config,
        router: Router,
        shared: Arc<Shared>,
        plugins: PluginContainer,
    ) -> Self {
        let cache = config
            .cache
            .map(|c| Arc::new(ResponseCache::new(c.max_items, c.reset_duration)));
        let pool = ContextPool::new(config.pool_size, shared);

        Self {
            inner: Arc::new(Inner {
                config,
                router,
                cache,
                pool,
                plugins,
                shutdown: Notify::new(),
            }),
        }
    }

    /// Server configuration
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Routing table
    #[must_use]
    pub fn router(&self) -> &Router {
        &self.inner.router
    }

    /// Response cache, when enabled
    #[must_use]
    pub fn cache(&self) -> Option<&ResponseCache> {
        self.inner.cache.as_deref()
    }

    /// Registered plugins
    #[must_use]
    pub fn plugins(&self) -> &PluginContainer {
        &self.inner.plugins
    }

    /// Context pool
    #[must_use]
    pub fn pool(&self) -> &ContextPool {
        &self.inner.pool
    }

    /// Dispatch one request and produce its response
    ///
    /// Runs handlers on the calling thread.
    pub fn serve(&self, request: Request) -> Response {
        let method = request.method;
        let path = request.path.clone();
        let request_id = request
            .header(REQUEST_ID_HEADER)
            .map_or_else(generate_request_id, str::to_string);

        let response = match self.cached(method, &path) {
            Some(hit) => {
                debug!(%method, %path, "Response cache hit");
                hit
            }
            None => self.dispatch(request),
        };
        response.with_header(REQUEST_ID_HEADER, &request_id)
    }

    /// Execute a test request directly without network stack
    pub fn test_request(&self, method: Method, path: &str) -> Response {
        self.serve(Request::new(method, path))
    }

    fn cached(&self, method: Method, path: &str) -> Option<Response> {
        self.inner.cache.as_ref()?.get(method, path)
    }

    fn dispatch(&self, request: Request) -> Response {
        let method = request.method;
        let path = request.path.clone();
        let mut ctx = self.inner.pool.acquire(request);

        match panic::catch_unwind(AssertUnwindSafe(|| self.route(&mut ctx))) {
            Ok(matched) => {
                let response = ctx.take_response();
                self.inner.pool.release(ctx);
                if matched && (200..300).contains(&response.status) {
                    if let Some(cache) = &self.inner.cache {
                        cache.insert(method, &path, response.clone());
                    }
                }
                response
            }
            Err(payload) => {
                error!(
                    %method,
                    %path,
                    panic = panic_message(payload.as_ref()),
                    "Handler panicked"
                );
                self.internal_error(method, &path)
            }
        }
    }

    /// Route and run; `true` when a route matched
    fn route(&self, ctx: &mut Context) -> bool {
        let (method, path, params) = ctx.route_parts();
        let lookup = self.inner.router.lookup(method, path, params);

        match lookup {
            Lookup::Found(route) => {
                let chain = route.prepare().clone();
                ctx.set_route(route);
                ctx.run_chain(chain);
                true
            }
            Lookup::Redirect(target) => {
                redirect_corrected(ctx, &target);
                false
            }
            Lookup::MethodNotAllowed(allowed) => {
                let allow = allowed
                    .iter()
                    .map(|m| m.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                ctx.emit_error(405);
                ctx.set_header("Allow", &allow);
                false
            }
            Lookup::NotFound => {
                ctx.not_found();
                false
            }
        }
    }

    /// 500 response after a panic; the failed context is dropped
    fn internal_error(&self, method: Method, path: &str) -> Response {
        let mut ctx = self.inner.pool.acquire(Request::new(method, path));
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| ctx.emit_error(500)));
        match outcome {
            Ok(()) => {
                let response = ctx.take_response();
                self.inner.pool.release(ctx);
                response
            }
            Err(_) => Response::text("Internal Server Error").with_status(500),
        }
    }

    /// Stop a running [`Server::listen`]
    pub fn close(&self) {
        self.inner.shutdown.notify_one();
    }

    /// Start the server with graceful shutdown
    ///
    /// # Errors
    ///
    /// `Error::BindError` when the address cannot be bound, or `Error::Io` if
    /// accepting fails.
    pub async fn listen(&self) -> Result<()> {
        let addr = self.inner.config.address;
        self.inner.plugins.do_pre_listen(self);

        let listener = bind(addr).map_err(|source| Error::BindError {
            address: addr.to_string(),
            source,
        })?;

        info!("Server listening on http://{}", addr);
        self.inner.plugins.do_post_listen(self);

        let ticker = self.inner.cache.clone().map(ResponseCache::spawn_ticker);
        let active = Arc::new(AtomicUsize::new(0));
        let keep_alive = self.inner.config.keep_alive;

        let outcome = loop {
            tokio::select! {
                accept_result = listener.accept() => {
                    let (stream, remote_addr) = match accept_result {
                        Ok(accepted) => accepted,
                        Err(err) => break Err(Error::Io(err)),
                    };
                    let io = TokioIo::new(stream);
                    let server = self.clone();
                    let active = active.clone();
                    active.fetch_add(1, Ordering::Relaxed);

                    tokio::task::spawn(async move {
                        let service = service_fn(move |req| {
                            let server = server.clone();
                            async move { server.handle_hyper(req, remote_addr).await }
                        });

                        if let Err(err) = http1::Builder::new()
                            .keep_alive(keep_alive)
                            .serve_connection(io, service)
                            .await
                        {
                            error!("Error serving connection: {:?}", err);
                        }
                        active.fetch_sub(1, Ordering::Relaxed);
                    });
                }
                () = shutdown_signal() => {
                    info!("Shutdown signal received, stopping server...");
                    break Ok(());
                }
                () = self.inner.shutdown.notified() => {
                    info!("Server closed, stopping...");
                    break Ok(());
                }
            }
        };

        self.inner.plugins.do_pre_close(self);
        if let Some(ticker) = ticker {
            ticker.abort();
        }

        let timeout = self.inner.config.shutdown_timeout;
        let drain = async {
            while active.load(Ordering::Relaxed) > 0 {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
        };
        if tokio::time::timeout(timeout, drain).await.is_err() {
            info!(
                remaining = active.load(Ordering::Relaxed),
                "Shutdown timeout reached, dropping open connections"
            );
        }
        outcome
    }

    async fn handle_hyper(
        self,
        req: hyper::Request<Incoming>,
        remote_addr: SocketAddr,
    ) -> std::result::Result<hyper::Response<Full<Bytes>>, Infallible> {
        let method = req.method().clone();
        let path = req.uri().path().to_string();
        let version = req.version();
        let max_body_size = self.inner.config.max_body_size;

        let response = match Request::from_hyper_with_limit(req, max_body_size, remote_addr).await {
            Ok(request) => {
                match tokio::task::spawn_blocking(move || self.serve(request)).await {
                    Ok(response) => response,
                    Err(err) => {
                        error!("Dispatch task failed: {}", err);
                        Response::text("Internal Server Error").with_status(500)
                    }
                }
            }
            Err(Error::PayloadTooLarge { .. }) => {
                Response::text("Payload Too Large").with_status(413)
            }
            Err(Error::UnsupportedMethod { .. }) => {
                Response::text("Not Implemented").with_status(501)
            }
            Err(e) => {
                error!("Failed to parse request: {}", e);
                Response::text("Bad Request").with_status(400)
            }
        };

        info!(
            "    {} - \"{} {} {:?}\" {}",
            remote_addr, method, path, version, response.status
        );
        Ok(response.into_hyper())
    }
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("config", &self.inner.config)
            .field("routes", &self.inner.router.len())
            .field("cache", &self.inner.cache.is_some())
            .field("plugins", &self.inner.plugins)
            .finish()
    }
}

fn bind(addr: SocketAddr) -> std::io::Result<tokio::net::TcpListener> {
    let socket = if addr.is_ipv4() {
        TcpSocket::new_v4()?
    } else {
        TcpSocket::new_v6()?
    };
    socket.set_reuseaddr(true)?;
    #[cfg(not(windows))]
    {
        socket.set_reuseport(true)?;
    }
    socket.bind(addr)?;
    socket.listen(1024)
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("Failed to install CTRL+C signal handler: {}", err);
        std::future::pending::<()>().await;
    }
}

/// 301 to the trailing-slash-corrected path, keeping the query string
fn redirect_corrected(ctx: &mut Context, target: &str) {
    let target = utf8_percent_encode(target, PATH_ESCAPE);
    let location = match ctx.request().query_string() {
        Some(query) => format!("{target}?{query}"),
        None => target.to_string(),
    };
    ctx.redirect(&location, 301);

    // older user agents may not follow a bare 301
    if ctx.method() == Method::Get {
        let note = format!("<a href=\"{}\">Moved Permanently</a>.\n", html_escape(&location));
        ctx.html(&note);
    }
}

fn html_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&#34;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}

static REQUEST_COUNTER: AtomicUsize = AtomicUsize::new(1);

fn generate_request_id() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    let counter = REQUEST_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{:x}-{:x}", now.as_nanos(), counter)
}

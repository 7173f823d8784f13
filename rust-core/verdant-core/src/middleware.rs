//! # Middleware System
//!
//! Middleware are ordinary chain handlers: each receives the shared
//! [`Context`] and decides whether to continue with `ctx.next()`. Work placed
//! after `next()` runs once the rest of the chain has finished, so one
//! middleware can wrap the handler on both sides.
//!
//! Built-in middleware: request logging, CORS headers and token-bucket rate
//! limiting.
//!
//! ## Design Principles (SOLID)
//!
//! - **S**: Each middleware has a single responsibility
//! - **O**: Extensible via the [`Middleware`] trait
//! - **D**: Routes hold plain handlers, not concrete middleware types

use crate::context::Context;
use crate::handler::{Handler, IntoHandler};
use crate::router::Method;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Instant;
use tracing::info;

/// Request/response interception
pub trait Middleware: Send + Sync + 'static {
    /// Process the request; call `ctx.next()` to continue the chain
    fn handle(&self, ctx: &mut Context);

    /// Middleware name for logging
    fn name(&self) -> &'static str {
        "Unknown"
    }
}

macro_rules! into_handler {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl IntoHandler for $ty {
                fn into_handler(self) -> Handler {
                    Handler::middleware(self)
                }
            }
        )+
    };
}

into_handler!(LoggingMiddleware, CorsMiddleware, RateLimitMiddleware);

/// Logging middleware - one structured line per request
#[derive(Debug, Default, Clone)]
pub struct LoggingMiddleware {
    log_headers: bool,
}

impl LoggingMiddleware {
    /// Create a new logging middleware
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Include the user agent in the log line
    #[must_use]
    pub fn with_headers(mut self) -> Self {
        self.log_headers = true;
        self
    }
}

impl Middleware for LoggingMiddleware {
    fn handle(&self, ctx: &mut Context) {
        let start = Instant::now();
        ctx.next();
        let elapsed = start.elapsed();

        let user_agent = if self.log_headers {
            ctx.header("user-agent").unwrap_or("-")
        } else {
            "-"
        };
        info!(
            method = %ctx.method(),
            path = %ctx.path(),
            status = ctx.writer().status(),
            duration_us = elapsed.as_micros() as u64,
            user_agent,
            "Request handled"
        );
    }

    fn name(&self) -> &'static str {
        "LoggingMiddleware"
    }
}

/// CORS middleware - adds Cross-Origin Resource Sharing headers
///
/// Preflight requests (`OPTIONS` carrying `Access-Control-Request-Method`)
/// are answered with 204 and end the chain.
#[derive(Debug, Clone)]
pub struct CorsMiddleware {
    allow_origin: String,
    allow_methods: String,
    allow_headers: String,
}

impl Default for CorsMiddleware {
    fn default() -> Self {
        Self {
            allow_origin: "*".to_string(),
            allow_methods: "GET, POST, PUT, DELETE, PATCH, OPTIONS".to_string(),
            allow_headers: "Content-Type, Authorization".to_string(),
        }
    }
}

impl CorsMiddleware {
    /// Create a new CORS middleware with default settings
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set allowed origin
    #[must_use]
    pub fn allow_origin(mut self, origin: impl Into<String>) -> Self {
        self.allow_origin = origin.into();
        self
    }

    /// Set allowed methods
    #[must_use]
    pub fn allow_methods(mut self, methods: impl Into<String>) -> Self {
        self.allow_methods = methods.into();
        self
    }

    /// Set allowed headers
    #[must_use]
    pub fn allow_headers(mut self, headers: impl Into<String>) -> Self {
        self.allow_headers = headers.into();
        self
    }

    /// Get the Access-Control-Allow-Origin header value
    #[must_use]
    pub fn origin(&self) -> &str {
        &self.allow_origin
    }
}

impl Middleware for CorsMiddleware {
    fn handle(&self, ctx: &mut Context) {
        ctx.set_header("Access-Control-Allow-Origin", &self.allow_origin);
        ctx.set_header("Access-Control-Allow-Methods", &self.allow_methods);
        ctx.set_header("Access-Control-Allow-Headers", &self.allow_headers);

        let preflight = ctx.method() == Method::Options
            && ctx.header("access-control-request-method").is_some();
        if preflight {
            ctx.set_status(204);
            return;
        }
        ctx.next();
    }

    fn name(&self) -> &'static str {
        "CorsMiddleware"
    }
}

/// Clients tracked before idle buckets are pruned
const DEFAULT_MAX_CLIENTS: usize = 10_000;

/// Token bucket rate limiting middleware, keyed by client IP
///
/// Buckets that have refilled completely carry no state worth keeping. Once
/// more than `max_clients` buckets exist, those are dropped before a new
/// client is added, so the map tracks recently active clients only.
#[derive(Debug)]
pub struct RateLimitMiddleware {
    /// Maximum burst capacity
    capacity: u64,
    /// Tokens refilled per second
    refill_per_sec: u64,
    /// Bucket count that triggers pruning
    max_clients: usize,
    /// Per-key buckets
    state: Mutex<HashMap<String, Bucket>>,
}

#[derive(Debug)]
struct Bucket {
    tokens: u64,
    last_refill: Instant,
}

impl Bucket {
    /// Tokens available at `now`, capped at `capacity`
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    fn available(&self, now: Instant, capacity: u64, refill_per_sec: u64) -> u64 {
        let elapsed = now.saturating_duration_since(self.last_refill);
        let refill = (elapsed.as_secs_f64() * refill_per_sec as f64) as u64;
        self.tokens.saturating_add(refill).min(capacity)
    }
}

impl RateLimitMiddleware {
    /// Create a new rate limiter
    ///
    /// # Arguments
    ///
    /// * `capacity` - Requests a client may burst
    /// * `refill_per_sec` - Tokens returned to each bucket per second
    #[must_use]
    pub fn new(capacity: u64, refill_per_sec: u64) -> Self {
        Self {
            capacity,
            refill_per_sec,
            max_clients: DEFAULT_MAX_CLIENTS,
            state: Mutex::new(HashMap::new()),
        }
    }

    /// Number of clients tracked before idle buckets are pruned
    #[must_use]
    pub fn max_clients(mut self, max_clients: usize) -> Self {
        self.max_clients = max_clients;
        self
    }

    /// Number of buckets currently held
    #[must_use]
    pub fn tracked_clients(&self) -> usize {
        self.state.lock().len()
    }

    fn allow(&self, key: &str) -> bool {
        self.allow_at(key, Instant::now())
    }

    fn allow_at(&self, key: &str, now: Instant) -> bool {
        let (capacity, rate) = (self.capacity, self.refill_per_sec);
        let mut map = self.state.lock();

        if !map.contains_key(key) && map.len() >= self.max_clients {
            map.retain(|_, bucket| bucket.available(now, capacity, rate) < capacity);
        }

        let bucket = map.entry(key.to_string()).or_insert(Bucket {
            tokens: capacity,
            last_refill: now,
        });
        let available = bucket.available(now, capacity, rate);
        // a full bucket restarts its refill clock; partial progress is kept
        if available == capacity || available != bucket.tokens {
            bucket.tokens = available;
            bucket.last_refill = now;
        }
        if bucket.tokens == 0 {
            return false;
        }
        bucket.tokens -= 1;
        true
    }
}

impl Middleware for RateLimitMiddleware {
    fn handle(&self, ctx: &mut Context) {
        let key = ctx
            .request()
            .remote_addr()
            .map_or_else(|| "unknown".to_string(), |addr| addr.ip().to_string());
        if self.allow(&key) {
            ctx.next();
            return;
        }
        ctx.set_status(429);
        ctx.set_header("Content-Type", "application/json");
        ctx.write_str(r#"{"error":"Rate limit exceeded"}"#);
    }

    fn name(&self) -> &'static str {
        "RateLimitMiddleware"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Shared;
    use crate::request::Request;
    use std::sync::Arc;

    fn run(handlers: Vec<Handler>, request: Request) -> Context {
        let mut ctx = Context::new(Arc::new(Shared::default()));
        ctx.reset(request);
        ctx.run_chain(Arc::from(handlers));
        ctx
    }

    fn ok() -> Handler {
        Handler::context(|ctx| ctx.write_str("ok"))
    }

    #[test]
    fn test_middleware_names() {
        assert_eq!(LoggingMiddleware::new().name(), "LoggingMiddleware");
        assert_eq!(CorsMiddleware::new().name(), "CorsMiddleware");
        assert_eq!(RateLimitMiddleware::new(1, 1).name(), "RateLimitMiddleware");
    }

    #[test]
    fn test_logging_continues_chain() {
        let ctx = run(
            vec![LoggingMiddleware::new().with_headers().into_handler(), ok()],
            Request::new(Method::Get, "/"),
        );
        assert_eq!(ctx.writer().body(), b"ok");
    }

    #[test]
    fn test_cors_middleware_custom_origin() {
        let mw = CorsMiddleware::new().allow_origin("https://example.com");
        assert_eq!(mw.origin(), "https://example.com");

        let ctx = run(vec![mw.into_handler(), ok()], Request::new(Method::Get, "/"));
        assert_eq!(
            ctx.writer().header("access-control-allow-origin"),
            Some("https://example.com")
        );
        assert_eq!(ctx.writer().body(), b"ok");
    }

    #[test]
    fn test_cors_preflight_short_circuits() {
        let request = Request::new(Method::Options, "/")
            .with_header("Access-Control-Request-Method", "POST");
        let ctx = run(vec![CorsMiddleware::new().into_handler(), ok()], request);
        assert_eq!(ctx.writer().status(), 204);
        assert!(ctx.writer().body().is_empty());
    }

    #[test]
    fn test_rate_limit_rejects_when_empty() {
        let limiter = Arc::new(RateLimitMiddleware::new(1, 0));
        let handler = {
            let limiter = limiter.clone();
            Handler::context(move |ctx| limiter.handle(ctx))
        };

        let first = run(vec![handler.clone(), ok()], Request::default());
        assert_eq!(first.writer().status(), 200);

        let second = run(vec![handler, ok()], Request::default());
        assert_eq!(second.writer().status(), 429);
        assert!(String::from_utf8_lossy(second.writer().body()).contains("Rate limit"));
    }

    #[test]
    fn test_rate_limit_prunes_refilled_buckets() {
        let limiter = RateLimitMiddleware::new(1, 1).max_clients(2);
        let start = Instant::now();

        assert!(limiter.allow_at("10.0.0.1", start));
        assert!(limiter.allow_at("10.0.0.2", start));
        assert_eq!(limiter.tracked_clients(), 2);

        // both earlier clients are full again after a few seconds
        let later = start + std::time::Duration::from_secs(5);
        assert!(limiter.allow_at("10.0.0.3", later));
        assert_eq!(limiter.tracked_clients(), 1);
    }

    #[test]
    fn test_rate_limit_keeps_drained_buckets() {
        let limiter = RateLimitMiddleware::new(1, 0).max_clients(1);
        let now = Instant::now();

        assert!(limiter.allow_at("10.0.0.1", now));
        assert!(limiter.allow_at("10.0.0.2", now));
        assert_eq!(limiter.tracked_clients(), 2);
        assert!(!limiter.allow_at("10.0.0.1", now));
    }
}

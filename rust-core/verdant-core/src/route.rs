//! # Route
//!
//! A compiled path pattern bound to its allowed methods, middleware and
//! terminal handler.
//!
//! Configuration happens through `&mut Route` during setup. [`Route::prepare`]
//! then freezes the route: the terminal handler is appended to the middleware
//! chain and the method set is fixed. Preparation runs at most once even when
//! several requests race on a cold route.

use crate::error::Result;
use crate::handler::{Handler, HandlerKind, IntoHandler};
use crate::params::Params;
use crate::pattern::PathPattern;
use crate::router::Method;
use std::sync::{Arc, OnceLock};
use tracing::warn;

const DEFAULT_METHODS: &[Method] = &[Method::Get];

/// A registered route
pub struct Route {
    pattern: PathPattern,
    methods: Vec<Method>,
    middleware: Vec<Handler>,
    handler: Handler,
    chain: OnceLock<Arc<[Handler]>>,
}

impl Route {
    /// Compile `path` and bind it to `handler`
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidRoutePattern` if the path is malformed
    pub fn new(path: &str, handler: impl IntoHandler) -> Result<Self> {
        Ok(Self {
            pattern: PathPattern::compile(path)?,
            methods: Vec::new(),
            middleware: Vec::new(),
            handler: handler.into_handler(),
            chain: OnceLock::new(),
        })
    }

    /// Append allowed methods
    ///
    /// Ignored, with a warning, once the route has been prepared.
    pub fn methods<I>(&mut self, methods: I) -> &mut Self
    where
        I: IntoIterator<Item = Method>,
    {
        if self.is_ready() {
            warn!(path = %self.path(), "Route already prepared, ignoring method change");
            return self;
        }
        for method in methods {
            if !self.methods.contains(&method) {
                self.methods.push(method);
            }
        }
        self
    }

    /// Append a middleware that runs before the handler
    pub fn use_middleware(&mut self, middleware: impl IntoHandler) -> &mut Self {
        if self.is_ready() {
            warn!(path = %self.path(), "Route already prepared, ignoring middleware");
            return self;
        }
        self.middleware.push(middleware.into_handler());
        self
    }

    /// Insert middleware ahead of the route's own (global and group middleware)
    pub(crate) fn prepend_middleware(&mut self, middleware: &[Handler]) {
        if middleware.is_empty() {
            return;
        }
        self.middleware.splice(0..0, middleware.iter().cloned());
    }

    /// Declared path
    #[must_use]
    pub fn path(&self) -> &str {
        self.pattern.raw()
    }

    /// Compiled pattern
    #[must_use]
    pub fn pattern(&self) -> &PathPattern {
        &self.pattern
    }

    /// Allowed methods; `[GET]` when none were set
    #[must_use]
    pub fn allowed_methods(&self) -> &[Method] {
        if self.methods.is_empty() {
            DEFAULT_METHODS
        } else {
            &self.methods
        }
    }

    /// Whether `method` is allowed
    #[must_use]
    pub fn contains_method(&self, method: Method) -> bool {
        self.allowed_methods().contains(&method)
    }

    /// Whether `path` matches this route
    #[must_use]
    pub fn is_match(&self, path: &str) -> bool {
        self.pattern.is_match(path)
    }

    /// Match `path` and push its parameters
    pub fn captures(&self, path: &str, params: &mut Params) -> bool {
        self.pattern.captures(path, params)
    }

    /// Calling convention of the terminal handler
    #[must_use]
    pub fn handler_kind(&self) -> HandlerKind {
        self.handler.kind()
    }

    /// Build the middleware chain with the handler as its last element
    ///
    /// Idempotent; concurrent callers all observe the same chain.
    pub fn prepare(&self) -> &Arc<[Handler]> {
        self.chain.get_or_init(|| {
            let mut chain = Vec::with_capacity(self.middleware.len() + 1);
            chain.extend(self.middleware.iter().cloned());
            chain.push(self.handler.clone());
            Arc::from(chain)
        })
    }

    /// Whether [`Route::prepare`] has run
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.chain.get().is_some()
    }
}

impl std::fmt::Debug for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route")
            .field("path", &self.path())
            .field("methods", &self.allowed_methods())
            .field("middleware", &self.middleware.len())
            .field("handler", &self.handler)
            .field("ready", &self.is_ready())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use std::thread;

    fn noop(_: &mut Context) {}

    #[test]
    fn test_default_method_is_get() {
        let route = Route::new("/users", noop).unwrap();
        assert_eq!(route.allowed_methods(), &[Method::Get]);
        assert!(route.contains_method(Method::Get));
        assert!(!route.contains_method(Method::Post));
    }

    #[test]
    fn test_methods_append_without_duplicates() {
        let mut route = Route::new("/users", noop).unwrap();
        route.methods([Method::Post]).methods([Method::Put, Method::Post]);
        assert_eq!(route.allowed_methods(), &[Method::Post, Method::Put]);
        assert!(!route.contains_method(Method::Get));
    }

    #[test]
    fn test_methods_ignored_after_prepare() {
        let mut route = Route::new("/users", noop).unwrap();
        route.prepare();
        route.methods([Method::Delete]);
        assert!(!route.contains_method(Method::Delete));
    }

    #[test]
    fn test_invalid_path_fails_at_construction() {
        assert!(Route::new("/users/:id(int", noop).is_err());
        assert!(Route::new("/a/:x/:x", noop).is_err());
    }

    #[test]
    fn test_match_everything() {
        let route = Route::new("*", noop).unwrap();
        assert!(route.is_match("/anything/at/all"));
        assert!(route.is_match("/"));
    }

    #[test]
    fn test_prepare_appends_handler_last() {
        let mut route = Route::new("/", Handler::writer(|_| {})).unwrap();
        route.use_middleware(noop);
        route.prepend_middleware(&[Handler::raw(|_, _| {})]);

        let chain = route.prepare();
        let kinds: Vec<_> = chain.iter().map(Handler::kind).collect();
        assert_eq!(
            kinds,
            vec![HandlerKind::Raw, HandlerKind::Context, HandlerKind::Writer]
        );
        assert_eq!(route.handler_kind(), HandlerKind::Writer);
    }

    #[test]
    fn test_concurrent_prepare_runs_once() {
        let mut route = Route::new("/hot", noop).unwrap();
        route.use_middleware(noop);
        let route = Arc::new(route);

        let chains: Vec<Arc<[Handler]>> = (0..16)
            .map(|_| {
                let route = route.clone();
                thread::spawn(move || route.prepare().clone())
            })
            .collect::<Vec<_>>()
            .into_iter()
            .map(|h| h.join().unwrap())
            .collect();

        for chain in &chains {
            assert!(Arc::ptr_eq(chain, &chains[0]));
            assert_eq!(chain.len(), 2);
        }
        assert!(route.is_ready());
    }
}

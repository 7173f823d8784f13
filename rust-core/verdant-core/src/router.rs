//! # Router
//!
//! The routing table ("garden"): one ordered bucket of routes per HTTP method.
//!
//! ## Matching
//!
//! Routes are tried in registration order and the first structural match wins.
//! There is no specificity ranking, so a catch-all registered early shadows
//! everything registered after it under the same method.
//!
//! When nothing matches, the router can still report:
//!
//! - a trailing-slash redirect, if the toggled path would have matched
//! - the methods that would have matched, for a 405 response
//!
//! ## SOLID Principles
//!
//! - **S**: Router only selects routes; chains and parameters belong to `Route`
//! - **O**: New constraint types live in `types` and `pattern`, not here

use crate::error::{Error, Result};
use crate::handler::IntoHandler;
use crate::params::Params;
use crate::route::Route;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

/// HTTP methods supported by the router
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Method {
    /// HTTP GET
    Get,
    /// HTTP POST
    Post,
    /// HTTP PUT
    Put,
    /// HTTP DELETE
    Delete,
    /// HTTP PATCH
    Patch,
    /// HTTP HEAD
    Head,
    /// HTTP OPTIONS
    Options,
    /// HTTP CONNECT
    Connect,
    /// HTTP TRACE
    Trace,
}

impl Method {
    /// Every supported method
    pub const ALL: [Method; 9] = [
        Method::Get,
        Method::Post,
        Method::Put,
        Method::Delete,
        Method::Patch,
        Method::Head,
        Method::Options,
        Method::Connect,
        Method::Trace,
    ];

    /// Canonical method token
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Patch => "PATCH",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
            Self::Connect => "CONNECT",
            Self::Trace => "TRACE",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| Error::UnsupportedMethod {
                method: s.to_string(),
            })
    }
}

/// Outcome of a routing lookup
#[derive(Debug)]
pub enum Lookup {
    /// A route matched; its parameters were pushed into the caller's `Params`
    Found(Arc<Route>),
    /// No match, but the path with its trailing slash toggled does
    Redirect(String),
    /// No match for this method; these methods would have matched
    MethodNotAllowed(Vec<Method>),
    /// Nothing matched
    NotFound,
}

/// Per-method routing table
#[derive(Debug, Clone)]
pub struct Router {
    garden: HashMap<Method, Vec<Arc<Route>>>,
    path_correction: bool,
    fire_method_not_allowed: bool,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    /// Create an empty router with path correction on and 405 responses off
    #[must_use]
    pub fn new() -> Self {
        Self {
            garden: HashMap::new(),
            path_correction: true,
            fire_method_not_allowed: false,
        }
    }

    /// Redirect to the trailing-slash variant of an unmatched path
    pub fn set_path_correction(&mut self, enabled: bool) {
        self.path_correction = enabled;
    }

    /// Report 405 instead of 404 when another method matches
    pub fn set_fire_method_not_allowed(&mut self, enabled: bool) {
        self.fire_method_not_allowed = enabled;
    }

    /// Register `route` under each of its allowed methods
    ///
    /// A route with several methods is shared between their buckets.
    pub fn plant(&mut self, route: Arc<Route>) {
        for &method in route.allowed_methods() {
            self.garden.entry(method).or_default().push(route.clone());
        }
    }

    /// Register a route with the given method and path pattern
    ///
    /// # Arguments
    ///
    /// * `method` - HTTP method
    /// * `path` - Path pattern (e.g., "/users/:id" or "/users/:id(int)")
    /// * `handler` - Terminal handler
    ///
    /// # Returns
    ///
    /// The planted route, shared with the method bucket
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidRoutePattern` if the pattern is malformed
    pub fn add_route(
        &mut self,
        method: Method,
        path: &str,
        handler: impl IntoHandler,
    ) -> Result<Arc<Route>> {
        let mut route = Route::new(path, handler)?;
        route.methods([method]);
        let route = Arc::new(route);
        self.plant(route.clone());
        Ok(route)
    }

    /// Routes registered under `method`, in registration order
    #[must_use]
    pub fn routes(&self, method: Method) -> &[Arc<Route>] {
        self.garden.get(&method).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Total number of (method, route) entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.garden.values().map(Vec::len).sum()
    }

    /// Whether no route is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Prepare every route ahead of traffic
    pub fn prepare_all(&self) {
        for route in self.garden.values().flatten() {
            route.prepare();
        }
    }

    /// Find the route for `(method, path)`
    ///
    /// # Arguments
    ///
    /// * `method` - HTTP method of the request
    /// * `path` - Decoded request path to match
    /// * `params` - Receives the captured parameters
    ///
    /// # Returns
    ///
    /// On [`Lookup::Found`] the route's parameters have been appended to
    /// `params`; otherwise `params` is untouched.
    pub fn lookup(&self, method: Method, path: &str, params: &mut Params) -> Lookup {
        let bucket = self.routes(method);
        if let Some(route) = bucket.iter().find(|r| r.captures(path, params)) {
            return Lookup::Found(route.clone());
        }

        if self.fire_method_not_allowed {
            let allowed = self.allowed_methods(path);
            if !allowed.is_empty() {
                return Lookup::MethodNotAllowed(allowed);
            }
        }

        if self.path_correction && method != Method::Connect && path.len() > 1 {
            let corrected = toggle_trailing_slash(path);
            if bucket.iter().any(|r| r.is_match(&corrected)) {
                return Lookup::Redirect(corrected);
            }
        }

        Lookup::NotFound
    }

    /// Methods with a route matching `path`, sorted
    #[must_use]
    pub fn allowed_methods(&self, path: &str) -> Vec<Method> {
        let mut allowed: Vec<Method> = self
            .garden
            .iter()
            .filter(|(_, routes)| routes.iter().any(|r| r.is_match(path)))
            .map(|(&m, _)| m)
            .collect();
        allowed.sort();
        allowed
    }
}

fn toggle_trailing_slash(path: &str) -> String {
    match path.strip_suffix('/') {
        Some(trimmed) => trimmed.to_string(),
        None => format!("{path}/"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use crate::types::ParamType;

    fn noop(_: &mut Context) {}

    fn found(router: &Router, method: Method, path: &str) -> Option<(Arc<Route>, Params)> {
        let mut params = Params::new();
        match router.lookup(method, path, &mut params) {
            Lookup::Found(route) => Some((route, params)),
            _ => None,
        }
    }

    #[test]
    fn test_method_from_str() {
        assert_eq!("GET".parse::<Method>().unwrap(), Method::Get);
        assert_eq!("TRACE".parse::<Method>().unwrap(), Method::Trace);
        assert!(matches!(
            "BREW".parse::<Method>(),
            Err(Error::UnsupportedMethod { .. })
        ));
    }

    #[test]
    fn test_basic_routing() {
        let mut router = Router::new();
        router.add_route(Method::Get, "/", noop).unwrap();
        router.add_route(Method::Get, "/users", noop).unwrap();
        router.add_route(Method::Post, "/users", noop).unwrap();
        assert_eq!(router.len(), 3);

        let (route, params) = found(&router, Method::Get, "/users").unwrap();
        assert_eq!(route.path(), "/users");
        assert!(params.is_empty());

        assert!(found(&router, Method::Post, "/users").is_some());
        assert!(found(&router, Method::Get, "/").is_some());
    }

    #[test]
    fn test_named_parameter() {
        let mut router = Router::new();
        router.add_route(Method::Get, "/profile/:username", noop).unwrap();

        let (_, params) = found(&router, Method::Get, "/profile/kataras").unwrap();
        assert_eq!(params.get("username"), Some("kataras"));
    }

    #[test]
    fn test_int_constraint_falls_through() {
        let mut router = Router::new();
        let typed = router
            .add_route(Method::Get, "/api/users/:userId(int)", noop)
            .unwrap();
        assert_eq!(typed.pattern().param_type("userId"), Some(ParamType::Int));

        let (_, params) = found(&router, Method::Get, "/api/users/1").unwrap();
        assert_eq!(params.get("userId"), Some("1"));

        let mut params = Params::new();
        assert!(matches!(
            router.lookup(Method::Get, "/api/users/abc", &mut params),
            Lookup::NotFound
        ));
        assert!(params.is_empty());

        router.add_route(Method::Get, "/api/users/:name", noop).unwrap();
        let (route, params) = found(&router, Method::Get, "/api/users/abc").unwrap();
        assert_eq!(route.path(), "/api/users/:name");
        assert_eq!(params.get("name"), Some("abc"));
    }

    #[test]
    fn test_wildcard_requires_remainder() {
        let mut router = Router::new();
        router
            .add_route(Method::Get, "/wildcard/:username/any/*", noop)
            .unwrap();

        let (_, params) = found(&router, Method::Get, "/wildcard/kataras/any/x/y").unwrap();
        assert_eq!(params.get("username"), Some("kataras"));
        assert!(found(&router, Method::Get, "/wildcard/kataras/any").is_none());
    }

    #[test]
    fn test_registration_order_wins() {
        let mut router = Router::new();
        router.add_route(Method::Get, "/files/*path", noop).unwrap();
        router.add_route(Method::Get, "/files/readme", noop).unwrap();

        let (route, params) = found(&router, Method::Get, "/files/readme").unwrap();
        assert_eq!(route.path(), "/files/*path");
        assert_eq!(params.get("path"), Some("readme"));
    }

    #[test]
    fn test_default_get_only() {
        let mut router = Router::new();
        router.plant(Arc::new(Route::new("/submit", noop).unwrap()));

        assert!(found(&router, Method::Get, "/submit").is_some());
        let mut params = Params::new();
        assert!(matches!(
            router.lookup(Method::Post, "/submit", &mut params),
            Lookup::NotFound
        ));

        router.set_fire_method_not_allowed(true);
        match router.lookup(Method::Post, "/submit", &mut params) {
            Lookup::MethodNotAllowed(allowed) => assert_eq!(allowed, vec![Method::Get]),
            other => panic!("expected 405, got {other:?}"),
        }
    }

    #[test]
    fn test_shared_route_across_methods() {
        let mut router = Router::new();
        let mut route = Route::new("/items", noop).unwrap();
        route.methods([Method::Get, Method::Post]);
        router.plant(Arc::new(route));

        let (a, _) = found(&router, Method::Get, "/items").unwrap();
        let (b, _) = found(&router, Method::Post, "/items").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_path_correction() {
        let mut router = Router::new();
        router.add_route(Method::Get, "/home", noop).unwrap();
        router.add_route(Method::Get, "/docs/", noop).unwrap();

        let mut params = Params::new();
        assert!(matches!(
            router.lookup(Method::Get, "/home/", &mut params),
            Lookup::Redirect(ref p) if p == "/home"
        ));
        assert!(matches!(
            router.lookup(Method::Get, "/docs", &mut params),
            Lookup::Redirect(ref p) if p == "/docs/"
        ));

        router.set_path_correction(false);
        assert!(matches!(
            router.lookup(Method::Get, "/home/", &mut params),
            Lookup::NotFound
        ));
    }

    #[test]
    fn test_route_not_found() {
        let router = Router::new();
        let mut params = Params::new();
        assert!(matches!(
            router.lookup(Method::Get, "/nonexistent", &mut params),
            Lookup::NotFound
        ));
        assert!(router.is_empty());
    }
}

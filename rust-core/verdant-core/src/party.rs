//! # Route Groups
//!
//! A [`Party`] registers routes under a shared path prefix and puts its
//! middleware in front of each of them. Parties nest; a child inherits its
//! parent's prefix and middleware.

use crate::app::{verb_shortcuts, App};
use crate::error::Result;
use crate::handler::{Handler, IntoHandler};
use crate::route::Route;
use crate::router::Method;

/// Group of routes sharing a prefix and middleware
pub struct Party<'a> {
    app: &'a mut App,
    prefix: String,
    middleware: Vec<Handler>,
}

impl<'a> Party<'a> {
    pub(crate) fn new(app: &'a mut App, prefix: &str) -> Self {
        Self {
            app,
            prefix: join_paths("", prefix),
            middleware: Vec::new(),
        }
    }

    /// Full prefix of this group
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Add middleware for routes registered through this group from now on
    pub fn use_middleware(&mut self, middleware: impl IntoHandler) -> &mut Self {
        self.middleware.push(middleware.into_handler());
        self
    }

    /// Register a route below the prefix
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidRoutePattern` if the joined path is malformed
    pub fn try_handle(&mut self, path: &str, handler: impl IntoHandler) -> Result<&mut Route> {
        let full = join_paths(&self.prefix, path);
        let route = self.app.try_handle(&full, handler)?;
        route.prepend_middleware(&self.middleware);
        Ok(route)
    }

    /// Register a route below the prefix
    ///
    /// # Panics
    ///
    /// Panics if the joined path is malformed.
    pub fn handle(&mut self, path: &str, handler: impl IntoHandler) -> &mut Route {
        self.try_handle(path, handler)
            .unwrap_or_else(|err| panic!("failed to register route: {err}"))
    }

    verb_shortcuts! {
        get => Get,
        post => Post,
        put => Put,
        delete => Delete,
        patch => Patch,
        head => Head,
        options => Options,
        connect => Connect,
        trace => Trace,
    }

    /// Nested group below this one
    pub fn party(&mut self, prefix: &str) -> Party<'_> {
        Party {
            prefix: join_paths(&self.prefix, prefix),
            middleware: self.middleware.clone(),
            app: &mut *self.app,
        }
    }
}

impl std::fmt::Debug for Party<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Party")
            .field("prefix", &self.prefix)
            .field("middleware", &self.middleware.len())
            .finish_non_exhaustive()
    }
}

/// `"/api" + "/users"` is `"/api/users"`; `"/api" + "/"` is `"/api"`
fn join_paths(prefix: &str, path: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    match (prefix.is_empty(), path.is_empty()) {
        (true, true) => "/".to_string(),
        (true, false) => format!("/{path}"),
        (false, true) => prefix.to_string(),
        (false, false) => format!("{prefix}/{path}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use crate::handler::HandlerKind;

    fn noop(_: &mut Context) {}

    #[test]
    fn test_join_paths() {
        assert_eq!(join_paths("/api", "/users"), "/api/users");
        assert_eq!(join_paths("/api/", "users"), "/api/users");
        assert_eq!(join_paths("/api", "/"), "/api");
        assert_eq!(join_paths("", "/"), "/");
        assert_eq!(join_paths("/", "/x"), "/x");
    }

    #[test]
    fn test_party_prefix_and_middleware() {
        let mut app = App::new();
        {
            let mut api = app.party("/api");
            api.use_middleware(Handler::raw(|_, _| {}));
            api.get("/users/:id(int)", noop);

            let mut admin = api.party("/admin");
            assert_eq!(admin.prefix(), "/api/admin");
            admin.use_middleware(noop);
            admin.post("/", noop);
        }

        let routes = app.routes();
        assert_eq!(routes[0].path(), "/api/users/:id(int)");
        assert_eq!(routes[1].path(), "/api/admin");
        assert_eq!(routes[1].allowed_methods(), &[Method::Post]);

        let chain = routes[1].prepare();
        let kinds: Vec<_> = chain.iter().map(Handler::kind).collect();
        assert_eq!(
            kinds,
            vec![HandlerKind::Raw, HandlerKind::Context, HandlerKind::Context]
        );
    }
}

//! # Application Builder
//!
//! [`App`] collects routes, middleware, error handlers, the renderer, shared
//! state and plugins during setup. [`App::build`] freezes all of it into a
//! [`Server`]; nothing can be registered once traffic starts.
//!
//! ## Example
//!
//! ```ignore
//! let mut app = App::new();
//! app.use_middleware(LoggingMiddleware::new());
//! app.get("/profile/:username", |ctx: &mut Context| {
//!     let name = ctx.param("username").unwrap_or_default().to_string();
//!     ctx.write_str(&name);
//! });
//! app.build().listen().await?;
//! ```

use crate::config::Config;
use crate::context::Shared;
use crate::error::Result;
use crate::handler::{Handler, IntoHandler};
use crate::party::Party;
use crate::plugin::{Plugin, PluginContainer};
use crate::render::Renderer;
use crate::route::Route;
use crate::router::{Method, Router};
use crate::server::Server;
use crate::state::AppState;
use crate::static_files;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Verb shortcuts over `handle`, shared by [`App`] and [`Party`]
macro_rules! verb_shortcuts {
    ($($name:ident => $method:ident),+ $(,)?) => {
        $(
            #[doc = concat!("Register a `", stringify!($method), "` route")]
            pub fn $name(&mut self, path: &str, handler: impl IntoHandler) -> &mut Route {
                self.handle(path, handler).methods([Method::$method])
            }
        )+

        /// Register a route answering every method
        pub fn any(&mut self, path: &str, handler: impl IntoHandler) -> &mut Route {
            self.handle(path, handler).methods(Method::ALL)
        }
    };
}

pub(crate) use verb_shortcuts;

/// Web application under construction
pub struct App {
    config: Config,
    routes: Vec<Route>,
    middleware: Vec<Handler>,
    error_handlers: HashMap<u16, Vec<Handler>>,
    renderer: Option<Arc<dyn Renderer>>,
    state: AppState,
    plugins: PluginContainer,
}

impl Default for App {
    fn default() -> Self {
        Self::with_config(Config::default())
    }
}

impl App {
    /// Create an application with default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an application with `config`
    #[must_use]
    pub fn with_config(config: Config) -> Self {
        Self {
            config,
            routes: Vec::new(),
            middleware: Vec::new(),
            error_handlers: HashMap::new(),
            renderer: None,
            state: AppState::new(),
            plugins: PluginContainer::default(),
        }
    }

    /// Current configuration
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Mutable configuration
    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    /// Register a route for `path`; it answers GET unless methods are added
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidRoutePattern` if the path is malformed
    pub fn try_handle(&mut self, path: &str, handler: impl IntoHandler) -> Result<&mut Route> {
        let mut route = Route::new(path, handler)?;
        self.plugins.do_pre_handle(&mut route);
        self.plugins.do_post_handle(&route);
        self.routes.push(route);
        let index = self.routes.len() - 1;
        Ok(&mut self.routes[index])
    }

    /// Register a route for `path`
    ///
    /// # Panics
    ///
    /// Panics if the path is malformed; configuration errors stop startup.
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

    /// Group routes under `prefix`
    pub fn party(&mut self, prefix: &str) -> Party<'_> {
        Party::new(self, prefix)
    }

    /// Add middleware in front of every route
    pub fn use_middleware(&mut self, middleware: impl IntoHandler) -> &mut Self {
        self.middleware.push(middleware.into_handler());
        self
    }

    /// Handle responses with `status`; handlers chain through `ctx.next()`
    pub fn on_error(&mut self, status: u16, handler: impl IntoHandler) -> &mut Self {
        self.error_handlers
            .entry(status)
            .or_default()
            .push(handler.into_handler());
        self
    }

    /// Install the template renderer
    pub fn renderer(&mut self, renderer: impl Renderer + 'static) -> &mut Self {
        self.renderer = Some(Arc::new(renderer));
        self
    }

    /// Application-wide shared state
    #[must_use]
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Activate and register a plugin
    ///
    /// # Errors
    ///
    /// Returns `Error::DuplicatePlugin` if the name is taken, or the plugin's
    /// activation error.
    pub fn plugin<P: Plugin>(&mut self, plugin: P) -> Result<&mut Self> {
        self.plugins.add(plugin)?;
        Ok(self)
    }

    /// Registered plugins
    #[must_use]
    pub fn plugins(&self) -> &PluginContainer {
        &self.plugins
    }

    /// Serve files from `dir` under `prefix`
    pub fn static_dir(&mut self, prefix: &str, dir: impl Into<PathBuf>) -> &mut Route {
        let path = format!(
            "{}/*{}",
            prefix.trim_end_matches('/'),
            static_files::FILE_PARAM
        );
        self.get(&path, static_files::serve_dir(dir))
    }

    /// Registered routes, in registration order
    #[must_use]
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Freeze the application into a server
    ///
    /// Runs the pre-build hooks, puts global middleware in front of every
    /// route, plants the routes and prepares their chains.
    #[must_use]
    pub fn build(mut self) -> Server {
        let plugins = std::mem::take(&mut self.plugins);
        plugins.do_pre_build(&mut self);
        self.plugins = plugins;

        let mut router = Router::new();
        router.set_path_correction(self.config.path_correction);
        router.set_fire_method_not_allowed(self.config.fire_method_not_allowed);

        for mut route in self.routes.drain(..) {
            route.prepend_middleware(&self.middleware);
            router.plant(Arc::new(route));
        }
        router.prepare_all();

        let shared = Shared {
            renderer: self.renderer,
            error_handlers: self
                .error_handlers
                .into_iter()
                .map(|(status, chain)| (status, Arc::<[Handler]>::from(chain)))
                .collect(),
            state: self.state,
        };

        Server::new(self.config, router, Arc::new(shared), self.plugins)
    }
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("config", &self.config)
            .field("routes", &self.routes)
            .field("middleware", &self.middleware.len())
            .field("error_handlers", &self.error_handlers.keys().collect::<Vec<_>>())
            .field("plugins", &self.plugins)
            .finish_non_exhaustive()
    }
}

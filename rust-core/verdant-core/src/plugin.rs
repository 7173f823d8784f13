//! # Plugins and Lifecycle Hooks
//!
//! Each lifecycle phase has its own capability trait. A [`Plugin`] opts into
//! phases by registering itself in the matching [`Hooks`] lists from
//! [`Plugin::activate`]; the container then calls exactly those hooks.
//!
//! | Hook | Called |
//! |---|---|
//! | [`PreHandle`] | before a route is registered |
//! | [`PostHandle`] | after a route is registered |
//! | [`PreBuild`] | when the app is turned into a server |
//! | [`PreListen`] | before the listener binds |
//! | [`PostListen`] | once the listener is accepting |
//! | [`PreClose`] | when the accept loop stops |

use crate::app::App;
use crate::error::{Error, Result};
use crate::route::Route;
use crate::server::Server;
use std::fmt;
use std::sync::Arc;
use tracing::info;

/// Runs before a route is registered; may still configure it
pub trait PreHandle: Send + Sync {
    /// Inspect or adjust `route`
    fn pre_handle(&self, route: &mut Route);
}

/// Runs after a route is registered
pub trait PostHandle: Send + Sync {
    /// Observe the registered `route`
    fn post_handle(&self, route: &Route);
}

/// Runs when the app is built, before routes are planted
pub trait PreBuild: Send + Sync {
    /// Adjust the app, e.g. register extra routes
    fn pre_build(&self, app: &mut App);
}

/// Runs before the server binds
pub trait PreListen: Send + Sync {
    /// Observe the server about to listen
    fn pre_listen(&self, server: &Server);
}

/// Runs once the server accepts connections
pub trait PostListen: Send + Sync {
    /// Observe the listening server
    fn post_listen(&self, server: &Server);
}

/// Runs when the server stops accepting connections
pub trait PreClose: Send + Sync {
    /// Release resources tied to the server
    fn pre_close(&self, server: &Server);
}

/// Typed hook lists
#[derive(Default)]
pub struct Hooks {
    pre_handle: Vec<Arc<dyn PreHandle>>,
    post_handle: Vec<Arc<dyn PostHandle>>,
    pre_build: Vec<Arc<dyn PreBuild>>,
    pre_listen: Vec<Arc<dyn PreListen>>,
    post_listen: Vec<Arc<dyn PostListen>>,
    pre_close: Vec<Arc<dyn PreClose>>,
}

impl Hooks {
    /// Register a [`PreHandle`] hook
    pub fn on_pre_handle(&mut self, hook: Arc<dyn PreHandle>) {
        self.pre_handle.push(hook);
    }

    /// Register a [`PostHandle`] hook
    pub fn on_post_handle(&mut self, hook: Arc<dyn PostHandle>) {
        self.post_handle.push(hook);
    }

    /// Register a [`PreBuild`] hook
    pub fn on_pre_build(&mut self, hook: Arc<dyn PreBuild>) {
        self.pre_build.push(hook);
    }

    /// Register a [`PreListen`] hook
    pub fn on_pre_listen(&mut self, hook: Arc<dyn PreListen>) {
        self.pre_listen.push(hook);
    }

    /// Register a [`PostListen`] hook
    pub fn on_post_listen(&mut self, hook: Arc<dyn PostListen>) {
        self.post_listen.push(hook);
    }

    /// Register a [`PreClose`] hook
    pub fn on_pre_close(&mut self, hook: Arc<dyn PreClose>) {
        self.pre_close.push(hook);
    }

    fn append(&mut self, other: Self) {
        self.pre_handle.extend(other.pre_handle);
        self.post_handle.extend(other.post_handle);
        self.pre_build.extend(other.pre_build);
        self.pre_listen.extend(other.pre_listen);
        self.post_listen.extend(other.post_listen);
        self.pre_close.extend(other.pre_close);
    }

    fn len(&self) -> usize {
        self.pre_handle.len()
            + self.post_handle.len()
            + self.pre_build.len()
            + self.pre_listen.len()
            + self.post_listen.len()
            + self.pre_close.len()
    }
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("pre_handle", &self.pre_handle.len())
            .field("post_handle", &self.post_handle.len())
            .field("pre_build", &self.pre_build.len())
            .field("pre_listen", &self.pre_listen.len())
            .field("post_listen", &self.post_listen.len())
            .field("pre_close", &self.pre_close.len())
            .finish()
    }
}

/// A named bundle of lifecycle hooks
pub trait Plugin: Send + Sync + 'static {
    /// Unique name
    fn name(&self) -> &str;

    /// What the plugin is for
    fn description(&self) -> &str {
        ""
    }

    /// Register hooks. An error keeps the plugin out of the container.
    ///
    /// # Errors
    ///
    /// Any error the plugin reports while activating.
    fn activate(self: Arc<Self>, hooks: &mut Hooks) -> Result<()>;
}

/// Registered plugins and their hooks
#[derive(Default)]
pub struct PluginContainer {
    plugins: Vec<Arc<dyn Plugin>>,
    hooks: Hooks,
}

impl PluginContainer {
    /// Activate and register `plugin`
    ///
    /// # Errors
    ///
    /// `Error::DuplicatePlugin` if the name is taken, or the plugin's own
    /// activation error.
    pub fn add<P: Plugin>(&mut self, plugin: P) -> Result<()> {
        if self.contains(plugin.name()) {
            return Err(Error::DuplicatePlugin {
                name: plugin.name().to_string(),
            });
        }
        let plugin = Arc::new(plugin);
        let mut staged = Hooks::default();
        plugin.clone().activate(&mut staged)?;

        info!(plugin = plugin.name(), hooks = staged.len(), "Plugin activated");
        self.hooks.append(staged);
        self.plugins.push(plugin);
        Ok(())
    }

    /// Whether a plugin named `name` is registered
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.plugins.iter().any(|p| p.name() == name)
    }

    /// Plugin by name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Plugin>> {
        self.plugins.iter().find(|p| p.name() == name)
    }

    /// Registered plugin names, in registration order
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.plugins.iter().map(|p| p.name()).collect()
    }

    /// Number of registered plugins
    #[must_use]
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    /// Whether no plugin is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Log a line on behalf of a plugin
    pub fn printf(&self, args: fmt::Arguments<'_>) {
        info!("{}", args);
    }

    pub(crate) fn do_pre_handle(&self, route: &mut Route) {
        for hook in &self.hooks.pre_handle {
            hook.pre_handle(route);
        }
    }

    pub(crate) fn do_post_handle(&self, route: &Route) {
        for hook in &self.hooks.post_handle {
            hook.post_handle(route);
        }
    }

    pub(crate) fn do_pre_build(&self, app: &mut App) {
        for hook in &self.hooks.pre_build {
            hook.pre_build(app);
        }
    }

    pub(crate) fn do_pre_listen(&self, server: &Server) {
        for hook in &self.hooks.pre_listen {
            hook.pre_listen(server);
        }
    }

    pub(crate) fn do_post_listen(&self, server: &Server) {
        for hook in &self.hooks.post_listen {
            hook.post_listen(server);
        }
    }

    pub(crate) fn do_pre_close(&self, server: &Server) {
        for hook in &self.hooks.pre_close {
            hook.pre_close(server);
        }
    }
}

impl fmt::Debug for PluginContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginContainer")
            .field("plugins", &self.names())
            .field("hooks", &self.hooks)
            .finish()
    }
}

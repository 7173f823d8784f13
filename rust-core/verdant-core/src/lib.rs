//! # Verdant Core
//!
//! Core runtime library for the Verdant web framework: route registration,
//! a pooled per-request context, middleware chaining with explicit
//! continuation, an optional response cache and lifecycle plugins, served
//! over Hyper and Tokio.
//!
//! ## Request Flow
//!
//! ```text
//! hyper request -> Server::serve -> ResponseCache hit? -> replay
//!                                 \-> ContextPool::acquire -> Router::lookup
//!                                     -> route chain (middleware.., handler)
//!                                     -> ContextPool::release
//! ```
//!
//! ## Modules
//!
//! - `app` / `party` - Application builder and route groups
//! - `pattern` - Path pattern compiler (`:name`, `:name(int)`, `*rest`)
//! - `route` / `router` - Routes and the per-method routing table
//! - `context` / `pool` - Per-request context and its pool
//! - `handler` / `middleware` - Handler variants and built-in middleware
//! - `cache` - Response cache with periodic sweeping
//! - `server` - Dispatcher and HTTP server built on Hyper
//! - `plugin` - Lifecycle hooks
//! - `request` / `response` / `render` - Request, response buffer, renderer seam
//! - `params` / `types` - Captured parameters and typed conversion
//! - `json` - JSON parsing with simd-json
//! - `state` - Application state and per-request values
//! - `static_files` - Directory serving
//! - `config` / `telemetry` / `error` - Settings, tracing setup, error types

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod app;
pub mod cache;
pub mod config;
pub mod context;
pub mod error;
pub mod handler;
pub mod json;
pub mod middleware;
pub mod params;
pub mod party;
pub mod pattern;
pub mod plugin;
pub mod pool;
pub mod render;
pub mod request;
pub mod response;
pub mod route;
pub mod router;
pub mod server;
pub mod state;
pub mod static_files;
pub mod telemetry;
pub mod types;

pub use app::App;
pub use cache::ResponseCache;
pub use config::{CacheConfig, Config};
pub use context::Context;
pub use error::{Error, Result};
pub use handler::{Handler, HandlerKind, IntoHandler};
pub use json::{parse_json, to_json_vec};
pub use middleware::{CorsMiddleware, LoggingMiddleware, Middleware, RateLimitMiddleware};
pub use params::Params;
pub use party::Party;
pub use pattern::PathPattern;
pub use plugin::{
    Hooks, Plugin, PluginContainer, PostHandle, PostListen, PreBuild, PreClose, PreHandle,
    PreListen,
};
pub use render::Renderer;
pub use request::Request;
pub use response::{Response, ResponseWriter};
pub use route::Route;
pub use router::{Lookup, Method, Router};
pub use server::Server;
pub use state::{AppState, Values};
pub use types::{ParamType, ParamValue};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

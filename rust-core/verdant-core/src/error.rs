//! # Error Handling
//!
//! Centralized error types for Verdant core.
//! Uses `thiserror` for ergonomic error definitions.
//!
//! Configuration errors (bad patterns, duplicate plugins) are returned by the
//! `try_*` registration functions. The plain registration functions turn them
//! into a panic so a misconfigured application never starts serving.

use thiserror::Error;

/// Result type alias for Verdant operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for the Verdant runtime
#[derive(Error, Debug)]
pub enum Error {
    /// Server failed to bind to the specified address
    #[error("Failed to bind server to {address}: {source}")]
    BindError {
        /// The address we tried to bind to
        address: String,
        /// The underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// Router failed to match the requested path
    #[error("No route found for path: {path}")]
    RouteNotFound {
        /// The path that wasn't matched
        path: String,
    },

    /// Invalid route pattern provided
    #[error("Invalid route pattern: {pattern}: {reason}")]
    InvalidRoutePattern {
        /// The invalid pattern
        pattern: String,
        /// Reason for invalidity
        reason: String,
    },

    /// Request used an HTTP method the router does not know
    #[error("Unsupported HTTP method: {method}")]
    UnsupportedMethod {
        /// The method token as received
        method: String,
    },

    /// HTTP protocol error
    #[error("HTTP error: {0}")]
    Http(#[from] hyper::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Request body is not valid JSON for the requested type
    #[error("Invalid JSON body: {reason}")]
    InvalidJson {
        /// Parser message
        reason: String,
    },

    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Template execution failed
    #[error("Failed to render template {template}: {reason}")]
    Render {
        /// Template name
        template: String,
        /// Reason reported by the renderer
        reason: String,
    },

    /// A template was requested but no renderer is installed
    #[error("No renderer configured")]
    MissingRenderer,

    /// Two plugins were registered under the same name
    #[error("Plugin already registered: {name}")]
    DuplicatePlugin {
        /// The conflicting plugin name
        name: String,
    },

    /// Request payload too large
    #[error("Payload too large: limit={limit} bytes, received={actual} bytes")]
    PayloadTooLarge {
        /// Max allowed size
        limit: usize,
        /// Actual size
        actual: usize,
    },
}

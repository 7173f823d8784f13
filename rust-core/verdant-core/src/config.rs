//! # Configuration
//!
//! Plain settings with defaults and consuming builder setters.

use std::net::SocketAddr;
use std::time::Duration;

/// Response cache settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// Item limit; `None` clears the whole cache on every sweep
    pub max_items: Option<usize>,
    /// Age after which an entry is dropped by the sweep
    pub reset_duration: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_items: None,
            reset_duration: Duration::from_secs(300),
        }
    }
}

/// Application and server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Address to bind the server to
    pub address: SocketAddr,
    /// Enable keep-alive connections
    pub keep_alive: bool,
    /// Shutdown timeout for graceful shutdown (default: 30 seconds)
    pub shutdown_timeout: Duration,
    /// Max request body size in bytes
    pub max_body_size: usize,
    /// Redirect to the trailing-slash variant of an unmatched path
    pub path_correction: bool,
    /// Answer 405 instead of 404 when another method matches
    pub fire_method_not_allowed: bool,
    /// Response cache, disabled when `None`
    pub cache: Option<CacheConfig>,
    /// Number of idle request contexts kept for reuse
    pub pool_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            address: ([127, 0, 0, 1], 8000).into(),
            keep_alive: true,
            shutdown_timeout: Duration::from_secs(30),
            max_body_size: 1024 * 1024,
            path_correction: true,
            fire_method_not_allowed: false,
            cache: None,
            pool_size: 1024,
        }
    }
}

impl Config {
    /// Default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the listen address
    #[must_use]
    pub fn bind(mut self, address: SocketAddr) -> Self {
        self.address = address;
        self
    }

    /// Toggle keep-alive
    #[must_use]
    pub fn keep_alive(mut self, enabled: bool) -> Self {
        self.keep_alive = enabled;
        self
    }

    /// Set the graceful shutdown timeout
    #[must_use]
    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Set max request body size
    #[must_use]
    pub fn max_body_size(mut self, bytes: usize) -> Self {
        self.max_body_size = bytes;
        self
    }

    /// Toggle trailing-slash redirects
    #[must_use]
    pub fn path_correction(mut self, enabled: bool) -> Self {
        self.path_correction = enabled;
        self
    }

    /// Toggle 405 responses
    #[must_use]
    pub fn fire_method_not_allowed(mut self, enabled: bool) -> Self {
        self.fire_method_not_allowed = enabled;
        self
    }

    /// Enable the response cache
    #[must_use]
    pub fn cache(mut self, cache: CacheConfig) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Set the context pool capacity
    #[must_use]
    pub fn pool_size(mut self, size: usize) -> Self {
        self.pool_size = size;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.address.port(), 8000);
        assert!(config.keep_alive);
        assert!(config.path_correction);
        assert!(!config.fire_method_not_allowed);
        assert!(config.cache.is_none());
        assert_eq!(config.max_body_size, 1024 * 1024);
        assert_eq!(config.pool_size, 1024);
    }

    #[test]
    fn test_config_builder() {
        let config = Config::new()
            .bind(([0, 0, 0, 0], 9000).into())
            .fire_method_not_allowed(true)
            .cache(CacheConfig {
                max_items: Some(10),
                reset_duration: Duration::from_secs(60),
            })
            .pool_size(8);
        assert_eq!(config.address.port(), 9000);
        assert!(config.fire_method_not_allowed);
        assert_eq!(config.cache.and_then(|c| c.max_items), Some(10));
        assert_eq!(config.pool_size, 8);
    }
}

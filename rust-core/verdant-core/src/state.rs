//! # Application and Request State
//!
//! - [`AppState`]: shared by every request, lock-guarded, cheap to clone.
//! - [`Values`]: the per-request bag carried by a `Context`, cleared on reuse.
//!
//! ## Design Principles
//!
//! - **S**: Only handles state storage and retrieval
//! - **O**: Any `Send + Sync` type can be stored without changes here

use parking_lot::RwLock;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

/// Thread-safe application state container
///
/// Stores arbitrary typed values that can be shared across handlers, such as a
/// database handle. Synchronising access to the stored value itself is up to
/// the application.
///
/// # Example
///
/// ```ignore
/// let state = AppState::new();
/// state.set("database", pool);
/// let pool = state.get::<Pool>("database");
/// ```
#[derive(Clone, Default)]
pub struct AppState {
    data: Arc<RwLock<HashMap<String, Arc<dyn Any + Send + Sync>>>>,
}

impl AppState {
    /// Create a new empty state container
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value with a string key
    ///
    /// Overwrites any existing value with the same key.
    pub fn set<T: Send + Sync + 'static>(&self, key: impl Into<String>, value: T) {
        self.data.write().insert(key.into(), Arc::new(value));
    }

    /// Get a shared handle to a value by key
    ///
    /// # Arguments
    ///
    /// * `key` - Name the value was stored under
    ///
    /// # Returns
    ///
    /// `None` if key doesn't exist or type doesn't match.
    #[must_use]
    pub fn get<T: Send + Sync + 'static>(&self, key: &str) -> Option<Arc<T>> {
        let value = self.data.read().get(key).cloned()?;
        value.downcast::<T>().ok()
    }

    /// Check if a key exists
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.data.read().contains_key(key)
    }

    /// Remove a value by key
    pub fn remove(&self, key: &str) -> bool {
        self.data.write().remove(key).is_some()
    }

    /// Get the number of stored items
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Check if state is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let data = self.data.read();
        f.debug_struct("AppState")
            .field("keys", &data.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Per-request user values
#[derive(Default)]
pub struct Values {
    data: HashMap<String, Box<dyn Any + Send + Sync>>,
}

impl Values {
    /// Store a value, replacing any previous one under `key`
    pub fn set<T: Send + Sync + 'static>(&mut self, key: impl Into<String>, value: T) {
        self.data.insert(key.into(), Box::new(value));
    }

    /// Borrow a value if present and of type `T`
    #[must_use]
    pub fn get<T: 'static>(&self, key: &str) -> Option<&T> {
        self.data.get(key).and_then(|v| v.downcast_ref::<T>())
    }

    /// Remove a value
    pub fn remove(&mut self, key: &str) -> bool {
        self.data.remove(key).is_some()
    }

    /// Number of stored values
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the bag is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Drop every value, keeping the map allocation
    pub fn clear(&mut self) {
        self.data.clear();
    }
}

impl std::fmt::Debug for Values {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Values")
            .field("keys", &self.data.keys().collect::<Vec<_>>())
            .finish()
    }
}

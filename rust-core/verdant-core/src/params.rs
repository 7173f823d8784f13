//! Ordered path parameters captured for one request.

use std::sync::Arc;

/// A single captured parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    /// Parameter name, shared with the compiled pattern
    pub key: Arc<str>,
    /// Captured segment text
    pub value: String,
}

/// Path parameters in declaration order
///
/// Kept as a vector rather than a map: routes rarely declare more than a few
/// parameters, and clearing it between requests keeps the allocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    inner: Vec<Param>,
}

impl Params {
    /// Create an empty parameter list
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a parameter by name
    ///
    /// `None` means the route declares no such parameter; a declared parameter
    /// that captured nothing is `Some("")`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.inner
            .iter()
            .find(|p| &*p.key == key)
            .map(|p| p.value.as_str())
    }

    /// Append a parameter
    pub fn push(&mut self, key: Arc<str>, value: impl Into<String>) {
        self.inner.push(Param {
            key,
            value: value.into(),
        });
    }

    /// Iterate over `(name, value)` pairs in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.iter().map(|p| (&*p.key, p.value.as_str()))
    }

    /// Number of captured parameters
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Whether nothing was captured
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Drop all entries, keeping capacity
    pub fn clear(&mut self) {
        self.inner.clear();
    }

    /// Current capacity of the backing vector
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.inner.capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_preserves_order() {
        let mut params = Params::new();
        params.push(Arc::from("user"), "kataras");
        params.push(Arc::from("post"), "7");

        let collected: Vec<_> = params.iter().collect();
        assert_eq!(collected, vec![("user", "kataras"), ("post", "7")]);
        assert_eq!(params.get("post"), Some("7"));
        assert_eq!(params.get("missing"), None);
    }

    #[test]
    fn test_empty_value_is_present() {
        let mut params = Params::new();
        params.push(Arc::from("rest"), "");
        assert_eq!(params.get("rest"), Some(""));
    }

    #[test]
    fn test_clear_keeps_capacity() {
        let mut params = Params::new();
        for i in 0..8 {
            params.push(Arc::from("k"), i.to_string());
        }
        let cap = params.capacity();
        params.clear();
        assert!(params.is_empty());
        assert_eq!(params.capacity(), cap);
    }
}

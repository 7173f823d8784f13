//! Template rendering capability.
//!
//! Verdant ships no template engine. Applications install one through
//! `App::renderer`; the core only ever calls [`Renderer::execute`].

use crate::error::{Error, Result};
use std::io;

/// A template engine adapter
pub trait Renderer: Send + Sync {
    /// Execute template `name` against `data`, writing the output to `out`
    ///
    /// # Errors
    ///
    /// Unknown templates and execution failures, typically as `Error::Render`.
    fn execute(&self, out: &mut dyn io::Write, name: &str, data: &serde_json::Value)
        -> Result<()>;

    /// Content type set on responses this renderer produced
    fn content_type(&self) -> &'static str {
        "text/html; charset=utf-8"
    }
}

/// Stand-in handed to handlers when no renderer is installed; every call fails
#[derive(Debug, Default, Clone, Copy)]
pub struct NoRenderer;

impl Renderer for NoRenderer {
    fn execute(&self, _out: &mut dyn io::Write, _name: &str, _data: &serde_json::Value) -> Result<()> {
        Err(Error::MissingRenderer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_renderer_fails() {
        let mut out = Vec::new();
        let err = NoRenderer
            .execute(&mut out, "index", &serde_json::Value::Null)
            .unwrap_err();
        assert!(matches!(err, Error::MissingRenderer));
        assert!(out.is_empty());
    }
}

//! # Handlers
//!
//! A closed set of calling conventions. The variant is chosen once, when the
//! handler is constructed, so dispatch is a plain `match` with no inspection
//! of the function at request time.
//!
//! | Variant | Receives | Continues the chain |
//! |---|---|---|
//! | `Context` | `&mut Context` | only via `ctx.next()` |
//! | `Writer` | `&mut ResponseWriter` | automatically |
//! | `ContextRenderer` | `&mut Context`, `&dyn Renderer` | only via `ctx.next()` |
//! | `Raw` | `&Request`, `&mut ResponseWriter` | automatically |

use crate::context::Context;
use crate::middleware::Middleware;
use crate::render::{NoRenderer, Renderer};
use crate::request::Request;
use crate::response::ResponseWriter;
use std::fmt;
use std::sync::Arc;

type ContextFn = dyn Fn(&mut Context) + Send + Sync;
type WriterFn = dyn Fn(&mut ResponseWriter) + Send + Sync;
type ContextRendererFn = dyn Fn(&mut Context, &dyn Renderer) + Send + Sync;
type RawFn = dyn Fn(&Request, &mut ResponseWriter) + Send + Sync;

/// Calling convention of a handler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerKind {
    /// Wants the request context
    Context,
    /// Wants only the response writer
    Writer,
    /// Wants the context and the renderer
    ContextRenderer,
    /// Wants the raw request and response writer
    Raw,
}

/// A request handler or middleware
#[derive(Clone)]
pub enum Handler {
    /// `Fn(&mut Context)`
    Context(Arc<ContextFn>),
    /// `Fn(&mut ResponseWriter)`
    Writer(Arc<WriterFn>),
    /// `Fn(&mut Context, &dyn Renderer)`
    ContextRenderer(Arc<ContextRendererFn>),
    /// `Fn(&Request, &mut ResponseWriter)`, for adapting foreign handlers
    Raw(Arc<RawFn>),
}

impl Handler {
    /// Handler receiving the request context
    pub fn context<F>(f: F) -> Self
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        Self::Context(Arc::new(f))
    }

    /// Handler receiving only the response writer
    pub fn writer<F>(f: F) -> Self
    where
        F: Fn(&mut ResponseWriter) + Send + Sync + 'static,
    {
        Self::Writer(Arc::new(f))
    }

    /// Handler receiving the context and the installed renderer
    pub fn context_renderer<F>(f: F) -> Self
    where
        F: Fn(&mut Context, &dyn Renderer) + Send + Sync + 'static,
    {
        Self::ContextRenderer(Arc::new(f))
    }

    /// Handler receiving the raw request and response writer
    pub fn raw<F>(f: F) -> Self
    where
        F: Fn(&Request, &mut ResponseWriter) + Send + Sync + 'static,
    {
        Self::Raw(Arc::new(f))
    }

    /// Wrap a [`Middleware`] value
    pub fn middleware<M: Middleware>(m: M) -> Self {
        Self::Context(Arc::new(move |ctx: &mut Context| m.handle(ctx)))
    }

    /// Calling convention of this handler
    #[must_use]
    pub fn kind(&self) -> HandlerKind {
        match self {
            Self::Context(_) => HandlerKind::Context,
            Self::Writer(_) => HandlerKind::Writer,
            Self::ContextRenderer(_) => HandlerKind::ContextRenderer,
            Self::Raw(_) => HandlerKind::Raw,
        }
    }

    pub(crate) fn call(&self, ctx: &mut Context) {
        match self {
            Self::Context(f) => f(ctx),
            Self::Writer(f) => {
                f(ctx.writer_mut());
                ctx.next();
            }
            Self::ContextRenderer(f) => {
                let renderer = ctx.renderer();
                f(ctx, renderer.as_deref().unwrap_or(&NoRenderer));
            }
            Self::Raw(f) => {
                let (request, writer) = ctx.request_and_writer();
                f(request, writer);
                ctx.next();
            }
        }
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Handler").field(&self.kind()).finish()
    }
}

/// Conversion into a [`Handler`]
///
/// Closures taking `&mut Context` convert directly; the other conventions are
/// built explicitly with [`Handler::writer`], [`Handler::raw`] and friends.
pub trait IntoHandler {
    /// Perform the conversion
    fn into_handler(self) -> Handler;
}

impl IntoHandler for Handler {
    fn into_handler(self) -> Handler {
        self
    }
}

impl<F> IntoHandler for F
where
    F: Fn(&mut Context) + Send + Sync + 'static,
{
    fn into_handler(self) -> Handler {
        Handler::context(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_is_fixed_at_construction() {
        assert_eq!(Handler::context(|_| {}).kind(), HandlerKind::Context);
        assert_eq!(Handler::writer(|_| {}).kind(), HandlerKind::Writer);
        assert_eq!(
            Handler::context_renderer(|_, _| {}).kind(),
            HandlerKind::ContextRenderer
        );
        assert_eq!(Handler::raw(|_, _| {}).kind(), HandlerKind::Raw);
    }

    #[test]
    fn test_closure_converts_to_context_handler() {
        let h = (|ctx: &mut Context| ctx.write_str("hi")).into_handler();
        assert_eq!(h.kind(), HandlerKind::Context);
        assert_eq!(format!("{h:?}"), "Handler(Context)");
    }
}

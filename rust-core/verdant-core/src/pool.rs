//! # Context Pool
//!
//! Mutex-guarded free list of [`Context`] values. A context is reset when it is
//! handed out, so its parameter, header and body buffers keep their capacity
//! across requests.

use crate::context::{Context, Shared};
use crate::request::Request;
use parking_lot::Mutex;
use std::sync::Arc;

/// Pool of reusable request contexts
pub struct ContextPool {
    free: Mutex<Vec<Context>>,
    max_size: usize,
    shared: Arc<Shared>,
}

impl ContextPool {
    pub(crate) fn new(max_size: usize, shared: Arc<Shared>) -> Self {
        Self {
            free: Mutex::new(Vec::with_capacity(max_size)),
            max_size,
            shared,
        }
    }

    /// Take a context for `request`, creating one if the pool is empty
    pub fn acquire(&self, request: Request) -> Context {
        let mut ctx = self
            .free
            .lock()
            .pop()
            .unwrap_or_else(|| Context::new(self.shared.clone()));
        ctx.reset(request);
        ctx
    }

    /// Return a context; dropped when the pool is full
    pub fn release(&self, ctx: Context) {
        let mut free = self.free.lock();
        if free.len() < self.max_size {
            free.push(ctx);
        }
    }

    /// Number of idle contexts
    #[must_use]
    pub fn size(&self) -> usize {
        self.free.lock().len()
    }

    /// Pre-populate the pool
    pub fn warm(&self, count: usize) {
        let mut free = self.free.lock();
        let room = self.max_size.saturating_sub(free.len());
        for _ in 0..count.min(room) {
            free.push(Context::new(self.shared.clone()));
        }
    }
}

impl std::fmt::Debug for ContextPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextPool")
            .field("idle", &self.size())
            .field("max_size", &self.max_size)
            .finish()
    }
}

//! A minimal cooperative cancellation token.
//!
//! The Go module this crate is modelled on threads a `context.Context`
//! through every `Cache`/`Getter`/`Setter` call so a caller can cancel an
//! in-flight upstream load. `Context` plays that role here: it carries no
//! values (the Go original's `internal.WithSink` helper has no counterpart
//! once `Sink` is already an explicit parameter everywhere), only a
//! cancellation flag a [`Getter`](crate::Getter) may consult at its
//! discretion.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Why a cancellable loop such as
/// [`ByteLru::evict_expired_loop`](crate::ByteLru::evict_expired_loop)
/// stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// [`Context::cancel`] was called.
    Cancelled,
}

/// A cooperative cancellation token, cheaply cloneable and shareable across
/// threads.
#[derive(Debug, Clone, Default)]
pub struct Context {
    cancelled: Arc<AtomicBool>,
}

impl Context {
    /// Creates a fresh, non-cancelled context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a context that is already cancelled.
    pub fn cancelled() -> Self {
        let ctx = Self::new();
        ctx.cancel();
        ctx
    }

    /// Requests cancellation. Idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// True once [`Context::cancel`] has been called.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

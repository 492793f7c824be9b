//! The caller-owned destination buffer a [`Getter`](crate::Getter) fills.
//!
//! Grounded in `original_source/byte.go`. The Go original exposes a single
//! `cache.Sink` interface with a `SetBytes`/`UnsafeSetBytes` pair; this
//! keeps both the copying and the adopting variants but makes the adopting
//! one safe by taking the buffer by value instead of documenting a "don't
//! touch this slice again" contract.

use crate::error::Error;
use std::time::Instant;

/// A destination a loader writes encoded bytes and an optional expiry into.
///
/// Implementations decide how (or whether) to store an expiry; a `Sink`
/// with no expiry never expires on its own.
pub trait Sink {
    /// Copies `bytes` into the sink, replacing any previous contents.
    fn set_bytes(&mut self, bytes: &[u8], expire: Option<Instant>) -> Result<(), Error>;

    /// The sink's current contents, if any.
    fn bytes(&self) -> Option<&[u8]>;

    /// This sink's expiry, if set.
    fn expire(&self) -> Option<Instant>;

    /// Number of bytes currently held.
    fn len(&self) -> usize {
        self.bytes().map_or(0, <[u8]>::len)
    }

    /// True if the sink holds no bytes.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clears the sink back to empty, no expiry.
    fn reset(&mut self);
}

/// The simplest [`Sink`]: an owned byte buffer plus an optional expiry.
#[derive(Debug, Default, Clone)]
pub struct ByteSink {
    bytes: Option<Vec<u8>>,
    expire: Option<Instant>,
}

impl ByteSink {
    /// An empty sink with no expiry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adopts `bytes` by value instead of copying it, the safe equivalent
    /// of the Go original's `UnsafeSetBytes`. Since `bytes` is moved in,
    /// the caller cannot mutate it afterwards — ownership transfer makes
    /// the Go version's "don't touch this slice again" documentation
    /// comment into a compiler-enforced invariant.
    pub fn set_owned_bytes(&mut self, bytes: Vec<u8>, expire: Option<Instant>) {
        self.bytes = Some(bytes);
        self.expire = expire;
    }
}

impl Sink for ByteSink {
    fn set_bytes(&mut self, bytes: &[u8], expire: Option<Instant>) -> Result<(), Error> {
        self.bytes = Some(bytes.to_vec());
        self.expire = expire;
        Ok(())
    }

    fn bytes(&self) -> Option<&[u8]> {
        self.bytes.as_deref()
    }

    fn expire(&self) -> Option<Instant> {
        self.expire
    }

    fn reset(&mut self) {
        self.bytes = None;
        self.expire = None;
    }
}

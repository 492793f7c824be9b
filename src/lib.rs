//! An in-process, size- and TTL-bounded LRU cache with single-flight
//! request coalescing.
//!
//! A [`Store`] holds any number of named [`CacheNamespace`]s. Each
//! namespace is a [`ByteLru`] (size/TTL-bounded storage of raw bytes)
//! fronted by a [`SingleFlight`] coordinator, so that concurrent misses for
//! the same key share one call into the namespace's [`Getter`] instead of
//! each triggering their own. Callers read values out through a [`Sink`] —
//! [`ByteSink`] for raw bytes, or [`TypedSink`] to decode/encode a concrete
//! `T` via a [`SinkCodec`].
//!
//! Modelled on the `darvaza-proxy/cache` Go module's `x/memcache` package;
//! see `DESIGN.md` in this crate's repository for the full grounding
//! ledger.

mod byte_lru;
mod cache;
mod context;
mod error;
mod lru;
mod single_flight;
mod sink;
mod store;
mod typed_sink;
mod types;

pub use byte_lru::ByteLru;
pub use cache::CacheNamespace;
pub use context::{CancelReason, Context};
pub use error::{BoxError, Error, Message};
pub use lru::SimpleLru;
pub use single_flight::{AdderGetter, SingleFlight};
pub use sink::{ByteSink, Sink};
pub use store::Store;
pub use typed_sink::{SinkCodec, TypedSink};
pub use types::{Cache, Getter, GetterFn, Setter, SetterFn, Stats, Type};

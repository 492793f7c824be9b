//! Shared contracts and value types: the collaborator traits a cache
//! namespace is built from, plus the small value types exchanged across
//! its public API.
//!
//! Grounded in `original_source/types.go` (`Getter`, `Stats`, `CacheType`)
//! and `original_source/cache.go` (the `Cache` interface).

use crate::context::Context;
use crate::error::Error;
use crate::sink::Sink;
use std::time::Instant;

/// Which of a namespace's internal pools a [`Cache::stats`] call reports
/// on.
///
/// This crate, like `original_source/x/memcache`, keeps a single pool per
/// namespace; `HotCache` is accepted and reported against the same pool as
/// `MainCache` rather than rejected, matching spec.md's resolution of the
/// `Type`/`Stats(HotCache)` Open Question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum Type {
    /// The namespace's primary, owned pool.
    MainCache = 1,
    /// A secondary pool for entries owned by peers. Accepted for API
    /// compatibility; reported against the same pool as `MainCache`.
    HotCache = 2,
}

/// A snapshot of one pool's usage and traffic counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Stats {
    /// Sum of stored entry sizes, in bytes.
    pub bytes: i64,
    /// Number of entries currently stored.
    pub items: i64,
    /// Total `get` calls observed.
    pub gets: i64,
    /// Total `get` calls that were satisfied without an upstream load.
    pub hits: i64,
    /// Total entries evicted (by capacity or expiry) since creation.
    pub evictions: i64,
}

/// The public contract a cache namespace implements: a named, bounded
/// key/value store that recovers misses through a [`Getter`].
pub trait Cache<K> {
    /// The name this namespace was registered under.
    fn name(&self) -> &str;

    /// A snapshot of the requested pool's counters.
    fn stats(&self, ty: Type) -> Stats;

    /// Stores `bytes` under `key` directly, bypassing the upstream
    /// [`Getter`]; unblocks any in-flight [`Cache::get`] callers waiting on
    /// the same key with this value rather than the loader's.
    fn set(
        &self,
        ctx: &Context,
        key: &K,
        bytes: &[u8],
        expire: Option<Instant>,
        ty: Type,
    ) -> Result<(), Error>;

    /// Returns the value for `key`, loading it through the namespace's
    /// [`Getter`] on a miss. Concurrent misses for the same key are
    /// coalesced into a single upstream call.
    fn get(&self, ctx: &Context, key: &K, sink: &mut dyn Sink) -> Result<(), Error>;

    /// Removes `key`, if present, without consulting the upstream
    /// [`Getter`].
    fn remove(&self, ctx: &Context, key: &K);
}

/// Recovers a value for `key` on a cache miss, writing it into `sink`.
///
/// Mirrors `original_source/types.go`'s `Getter` interface; any matching
/// closure implements it via the blanket impl below, the same role
/// `groupcache.GetterFunc` plays for the Go original's function-valued
/// getters.
pub trait Getter<K>: Send + Sync {
    /// Loads the value for `key` into `sink`.
    fn get(&self, ctx: &Context, key: &K, sink: &mut dyn Sink) -> Result<(), Error>;
}

impl<K, F> Getter<K> for F
where
    F: Fn(&Context, &K, &mut dyn Sink) -> Result<(), Error> + Send + Sync,
{
    fn get(&self, ctx: &Context, key: &K, sink: &mut dyn Sink) -> Result<(), Error> {
        self(ctx, key, sink)
    }
}

/// A boxed, owned [`Getter`], the form a [`Store`](crate::Store) holds one
/// in. Named after `groupcache.GetterFunc`, the Go original's adapter for
/// function-valued getters.
pub type GetterFn<K> = Box<dyn Getter<K>>;

/// Symmetric counterpart to [`Getter`] for the write path: consulted by a
/// namespace before a direct [`Cache::set`] is allowed to take effect, for
/// callers that want to validate or transform a value on its way in. Not
/// present in `original_source` (the Go module only defines a read-side
/// `Getter`); added here because spec.md's external-interface table lists
/// it as a first-class collaborator alongside `Getter`.
pub trait Setter<K>: Send + Sync {
    /// Inspects or rewrites `bytes`/`expire` before they are written into
    /// the namespace's LRU. Returning `Err` aborts the `set`.
    fn set(
        &self,
        ctx: &Context,
        key: &K,
        bytes: &[u8],
        expire: Option<Instant>,
    ) -> Result<(), Error>;
}

impl<K, F> Setter<K> for F
where
    F: Fn(&Context, &K, &[u8], Option<Instant>) -> Result<(), Error> + Send + Sync,
{
    fn set(
        &self,
        ctx: &Context,
        key: &K,
        bytes: &[u8],
        expire: Option<Instant>,
    ) -> Result<(), Error> {
        self(ctx, key, bytes, expire)
    }
}

/// A boxed, owned [`Setter`].
pub type SetterFn<K> = Box<dyn Setter<K>>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::ByteSink;

    #[test]
    fn closure_satisfies_getter() {
        let getter: GetterFn<String> = Box::new(|_ctx: &Context, key: &String, sink: &mut dyn Sink| {
            sink.set_bytes(key.as_bytes(), None)
        });
        let mut sink = ByteSink::new();
        getter
            .get(&Context::new(), &"k".to_string(), &mut sink)
            .unwrap();
        assert_eq!(sink.bytes(), Some(&b"k"[..]));
    }

    #[test]
    fn closure_satisfies_setter() {
        let setter: SetterFn<String> =
            Box::new(|_ctx: &Context, _key: &String, bytes: &[u8], _expire| {
                if bytes.is_empty() {
                    Err(Error::NoData)
                } else {
                    Ok(())
                }
            });
        assert!(setter
            .set(&Context::new(), &"k".to_string(), b"v", None)
            .is_ok());
        assert!(setter
            .set(&Context::new(), &"k".to_string(), b"", None)
            .is_err());
    }

    #[test]
    fn hot_cache_and_main_cache_are_distinct_enum_values() {
        assert_ne!(Type::MainCache, Type::HotCache);
    }

    #[test]
    fn stats_default_is_zeroed() {
        let s = Stats::default();
        assert_eq!(s.bytes, 0);
        assert_eq!(s.items, 0);
        assert_eq!(s.gets, 0);
        assert_eq!(s.hits, 0);
        assert_eq!(s.evictions, 0);
    }
}

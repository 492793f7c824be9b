//! The per-namespace facade: composes [`ByteLru`] and [`SingleFlight`] into
//! the [`Cache`] contract, grounded in `original_source/x/memcache/cache.go`.

use crate::byte_lru::ByteLru;
use crate::context::Context;
use crate::error::Error;
use crate::single_flight::{AdderGetter, SingleFlight};
use crate::sink::Sink;
use crate::types::{Cache, GetterFn, Stats, Type};
use std::hash::Hash;
use std::sync::Arc;
use std::time::Instant;

impl<K> AdderGetter<K> for ByteLru<K>
where
    K: Hash + Eq + Clone + Send + Sync,
{
    fn get_bytes(&self, key: &K) -> Option<(Vec<u8>, Option<Instant>)> {
        self.get(key)
    }

    fn add_bytes(&self, key: K, bytes: Vec<u8>, expire: Option<Instant>) {
        self.add(key, bytes, expire)
    }
}

/// One named, bounded cache: a byte LRU fronted by single-flight
/// coalescing and a fixed upstream [`Getter`](crate::Getter).
pub struct CacheNamespace<K> {
    name: String,
    lru: Arc<ByteLru<K>>,
    single_flight: SingleFlight<K>,
    getter: GetterFn<K>,
    span: tracing::Span,
}

impl<K> CacheNamespace<K>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
{
    /// Creates a namespace holding up to `cache_bytes` of data, recovering
    /// misses through `getter`. `span` is entered for every log line this
    /// namespace emits for the rest of its lifetime.
    pub fn new(
        name: impl Into<String>,
        cache_bytes: usize,
        getter: GetterFn<K>,
        span: tracing::Span,
    ) -> Arc<Self> {
        let lru = Arc::new(ByteLru::new(cache_bytes));
        let single_flight = SingleFlight::new(lru.clone() as Arc<dyn AdderGetter<K>>);
        Arc::new(CacheNamespace {
            name: name.into(),
            lru,
            single_flight,
            getter,
            span,
        })
    }
}

impl<K> Cache<K> for CacheNamespace<K>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn stats(&self, _ty: Type) -> Stats {
        // A single pool backs both Type::MainCache and Type::HotCache;
        // see spec.md's Type/Stats(HotCache) Open Question resolution.
        self.lru.stats()
    }

    fn set(
        &self,
        _ctx: &Context,
        key: &K,
        bytes: &[u8],
        expire: Option<Instant>,
        _ty: Type,
    ) -> Result<(), Error> {
        if bytes.is_empty() {
            return Err(Error::NoData);
        }
        let _enter = self.span.enter();
        tracing::debug!(cache = %self.name, "set");
        self.single_flight.set(key, bytes.to_vec(), expire);
        Ok(())
    }

    fn get(&self, ctx: &Context, key: &K, sink: &mut dyn Sink) -> Result<(), Error> {
        let _enter = self.span.enter();
        self.single_flight.get(ctx, key, self.getter.as_ref(), sink)
    }

    fn remove(&self, _ctx: &Context, key: &K) {
        let _enter = self.span.enter();
        tracing::debug!(cache = %self.name, "remove");
        self.lru.remove(key);
        self.single_flight.forget(key);
    }
}

//! The registry of named cache namespaces, grounded in
//! `original_source/x/memcache/store.go`.

use crate::cache::CacheNamespace;
use crate::types::GetterFn;
use hashbrown::HashMap;
use parking_lot::Mutex;
use std::hash::Hash;
use std::sync::Arc;

/// Owns every live [`CacheNamespace`] for a given key type `K`, keyed by
/// name. Cheap to share: clone the `Arc<Store<K>>` you construct it behind.
pub struct Store<K> {
    caches: Mutex<HashMap<String, Arc<CacheNamespace<K>>>>,
    span: Mutex<tracing::Span>,
}

impl<K> Store<K>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
{
    /// An empty registry with no logging span bound.
    pub fn new() -> Self {
        Store {
            caches: Mutex::new(HashMap::new()),
            span: Mutex::new(tracing::Span::none()),
        }
    }

    /// Binds the span future [`Store::new_cache`] calls enter for their log
    /// lines. Namespaces already created keep whatever span was live at
    /// their own creation time; this does not rebind them.
    pub fn set_logger(&self, span: tracing::Span) {
        *self.span.lock() = span;
    }

    /// The namespace registered under `name`, if any.
    pub fn get_cache(&self, name: &str) -> Option<Arc<CacheNamespace<K>>> {
        self.caches.lock().get(name).cloned()
    }

    /// Registers a new namespace under `name` with a budget of
    /// `cache_bytes`, recovering misses through `getter`. Returns `None`
    /// if `name` is already registered.
    pub fn new_cache(
        &self,
        name: impl Into<String>,
        cache_bytes: usize,
        getter: GetterFn<K>,
    ) -> Option<Arc<CacheNamespace<K>>> {
        let name = name.into();
        let mut guard = self.caches.lock();
        if guard.contains_key(&name) {
            return None;
        }
        let span = self.span.lock().clone();
        tracing::debug!(parent: &span, cache = %name, "new_cache");
        let cache = CacheNamespace::new(name.clone(), cache_bytes, getter, span);
        guard.insert(name, cache.clone());
        Some(cache)
    }

    /// Removes `name` from the registry. The namespace itself lives on as
    /// long as some caller still holds the `Arc` returned by
    /// [`Store::new_cache`]/[`Store::get_cache`].
    pub fn deregister_cache(&self, name: &str) {
        self.caches.lock().remove(name);
    }
}

impl<K> Default for Store<K>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use crate::types::Cache;

    fn getter() -> GetterFn<&'static str> {
        Box::new(|_ctx: &Context, key: &&str, sink: &mut dyn crate::sink::Sink| {
            sink.set_bytes(key.as_bytes(), None)
        })
    }

    #[test]
    fn new_cache_then_get_cache_round_trips() {
        let store: Store<&str> = Store::new();
        let created = store.new_cache("widgets", 1024, getter()).unwrap();
        let fetched = store.get_cache("widgets").unwrap();
        assert_eq!(created.name(), fetched.name());
    }

    #[test]
    fn duplicate_name_is_rejected() {
        let store: Store<&str> = Store::new();
        assert!(store.new_cache("widgets", 1024, getter()).is_some());
        assert!(store.new_cache("widgets", 1024, getter()).is_none());
    }

    #[test]
    fn deregister_removes_from_registry() {
        let store: Store<&str> = Store::new();
        store.new_cache("widgets", 1024, getter()).unwrap();
        store.deregister_cache("widgets");
        assert!(store.get_cache("widgets").is_none());
    }

    #[test]
    fn missing_cache_is_none() {
        let store: Store<&str> = Store::new();
        assert!(store.get_cache("ghost").is_none());
    }
}

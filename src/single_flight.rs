//! Deduplicates concurrent cache misses for the same key into one upstream
//! [`Getter`] call, mirroring `original_source/x/memcache/singleflight.go`.
//!
//! The Go original's `outreacher` record (one per in-flight key) is backed
//! here by a `parking_lot::Mutex` + `parking_lot::Condvar` pair, the direct
//! Rust counterpart of the `sync.Mutex` + `sync.Cond` the Go source uses.

use crate::context::Context;
use crate::error::Error;
use crate::sink::{ByteSink, Sink};
use crate::types::Getter;
use hashbrown::HashMap;
use parking_lot::{Condvar, Mutex};
use std::hash::Hash;
use std::sync::Arc;
use std::time::Instant;

/// The narrow view of a byte store [`SingleFlight`] needs: look a key up,
/// and publish a freshly-loaded value. Implemented by [`ByteLru`](crate::ByteLru).
pub trait AdderGetter<K>: Send + Sync {
    /// Returns a copy of the stored bytes and expiry for `key`, if present.
    fn get_bytes(&self, key: &K) -> Option<(Vec<u8>, Option<Instant>)>;

    /// Stores `bytes` under `key`.
    fn add_bytes(&self, key: K, bytes: Vec<u8>, expire: Option<Instant>);
}

/// One key's in-flight load. Every field is only ever touched while
/// `SingleFlight::state` is locked.
struct Record {
    /// Number of callers (the leader plus any followers) still waiting on
    /// this record.
    waiters: usize,
    /// Set once the leader's load (or a racing direct `set`) has resolved.
    done: bool,
    err: Option<Error>,
    bytes: Vec<u8>,
    expire: Option<Instant>,
}

impl Record {
    fn pending() -> Self {
        Record {
            waiters: 1,
            done: false,
            err: None,
            bytes: Vec::new(),
            expire: None,
        }
    }

    fn result(&self) -> Result<(Vec<u8>, Option<Instant>), Error> {
        match &self.err {
            Some(err) => Err(err.clone()),
            None => Ok((self.bytes.clone(), self.expire)),
        }
    }
}

/// Coordinates concurrent misses against one [`AdderGetter`]-backed store.
pub struct SingleFlight<K> {
    store: Arc<dyn AdderGetter<K>>,
    inflight: Mutex<HashMap<K, Record>>,
    cond: Condvar,
}

impl<K> SingleFlight<K>
where
    K: Hash + Eq + Clone,
{
    /// Creates a coordinator over `store`.
    pub fn new(store: Arc<dyn AdderGetter<K>>) -> Self {
        SingleFlight {
            store,
            inflight: Mutex::new(HashMap::new()),
            cond: Condvar::new(),
        }
    }

    /// Writes `key`'s value into `sink`, loading it through `getter` on a
    /// miss. Concurrent calls for the same key block on the first caller's
    /// load rather than each invoking `getter` independently.
    pub fn get(
        &self,
        ctx: &Context,
        key: &K,
        getter: &dyn Getter<K>,
        sink: &mut dyn Sink,
    ) -> Result<(), Error> {
        if let Some((bytes, expire)) = self.store.get_bytes(key) {
            return sink.set_bytes(&bytes, expire);
        }

        let mut guard = self.inflight.lock();
        if let Some(rec) = guard.get_mut(key) {
            rec.waiters += 1;
            let result = self.wait_for(&mut guard, key);
            return Self::deliver(result, sink);
        }

        guard.insert(key.clone(), Record::pending());
        drop(guard);

        let mut local_sink = ByteSink::new();
        let load_result = getter.get(ctx, key, &mut local_sink);

        let mut guard = self.inflight.lock();
        let rec = guard
            .get_mut(key)
            .expect("leader's own in-flight record must still be present");

        if !rec.done {
            match load_result {
                Ok(()) => {
                    let bytes = local_sink.bytes().unwrap_or(&[]).to_vec();
                    let expire = local_sink.expire();
                    self.store.add_bytes(key.clone(), bytes.clone(), expire);
                    rec.bytes = bytes;
                    rec.expire = expire;
                    rec.err = None;
                }
                Err(err) => {
                    rec.err = Some(err);
                }
            }
            rec.done = true;
        }

        rec.waiters -= 1;
        let result = rec.result();
        let waiters = rec.waiters;
        if waiters == 0 {
            guard.remove(key);
        }
        self.cond.notify_all();
        drop(guard);

        Self::deliver(result, sink)
    }

    /// Writes `bytes` directly into the store, bypassing `Getter`. If a
    /// load for `key` is already in flight, this value wins: it completes
    /// that in-flight record (and any waiters on it) instead of letting the
    /// leader's eventual result — success or failure — overwrite it.
    pub fn set(&self, key: &K, bytes: Vec<u8>, expire: Option<Instant>) {
        self.store.add_bytes(key.clone(), bytes.clone(), expire);

        let mut guard = self.inflight.lock();
        if let Some(rec) = guard.get_mut(key) {
            rec.bytes = bytes;
            rec.expire = expire;
            rec.err = None;
            rec.done = true;
            self.cond.notify_all();
        }
    }

    /// Drops any in-flight record for `key` without touching the store.
    /// Used by `Cache::remove`.
    pub fn forget(&self, key: &K) {
        self.inflight.lock().remove(key);
    }

    fn wait_for(
        &self,
        guard: &mut parking_lot::MutexGuard<'_, HashMap<K, Record>>,
        key: &K,
    ) -> Result<(Vec<u8>, Option<Instant>), Error> {
        loop {
            if guard.get(key).is_some_and(|rec| rec.done) {
                break;
            }
            self.cond.wait(guard);
        }
        let rec = guard.get_mut(key).expect("record vanished while waiting");
        rec.waiters -= 1;
        let result = rec.result();
        let waiters = rec.waiters;
        if waiters == 0 {
            guard.remove(key);
        }
        result
    }

    fn deliver(
        result: Result<(Vec<u8>, Option<Instant>), Error>,
        sink: &mut dyn Sink,
    ) -> Result<(), Error> {
        let (bytes, expire) = result?;
        sink.set_bytes(&bytes, expire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Barrier;
    use std::thread;
    use std::time::Duration;

    struct FakeStore<K> {
        inner: Mutex<HashMap<K, (Vec<u8>, Option<Instant>)>>,
    }

    impl<K> FakeStore<K> {
        fn new() -> Self {
            FakeStore {
                inner: Mutex::new(HashMap::new()),
            }
        }
    }

    impl<K: Hash + Eq + Clone + Send + Sync> AdderGetter<K> for FakeStore<K> {
        fn get_bytes(&self, key: &K) -> Option<(Vec<u8>, Option<Instant>)> {
            self.inner.lock().get(key).cloned()
        }

        fn add_bytes(&self, key: K, bytes: Vec<u8>, expire: Option<Instant>) {
            self.inner.lock().insert(key, (bytes, expire));
        }
    }

    #[test]
    fn miss_then_hit_calls_loader_once() {
        let store: Arc<dyn AdderGetter<&str>> = Arc::new(FakeStore::new());
        let sf = SingleFlight::new(store);
        let calls = AtomicUsize::new(0);
        let getter = |_ctx: &Context, _key: &&str, sink: &mut dyn Sink| {
            calls.fetch_add(1, Ordering::SeqCst);
            sink.set_bytes(b"value", None)
        };

        let mut sink = ByteSink::new();
        sf.get(&Context::new(), &"k", &getter, &mut sink).unwrap();
        assert_eq!(sink.bytes(), Some(&b"value"[..]));

        let mut sink = ByteSink::new();
        sf.get(&Context::new(), &"k", &getter, &mut sink).unwrap();
        assert_eq!(sink.bytes(), Some(&b"value"[..]));

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn thundering_herd_collapses_into_single_upstream_call() {
        let store: Arc<dyn AdderGetter<&str>> = Arc::new(FakeStore::new());
        let sf = Arc::new(SingleFlight::new(store));
        let calls = Arc::new(AtomicUsize::new(0));
        let n = 32;
        let barrier = Arc::new(Barrier::new(n));

        let handles: Vec<_> = (0..n)
            .map(|_| {
                let sf = sf.clone();
                let calls = calls.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    let getter = |_ctx: &Context, _key: &&str, sink: &mut dyn Sink| {
                        calls.fetch_add(1, Ordering::SeqCst);
                        thread::sleep(Duration::from_millis(20));
                        sink.set_bytes(b"shared", None)
                    };
                    barrier.wait();
                    let mut sink = ByteSink::new();
                    sf.get(&Context::new(), &"k", &getter, &mut sink).unwrap();
                    sink.bytes().unwrap().to_vec()
                })
            })
            .collect();

        for h in handles {
            assert_eq!(h.join().unwrap(), b"shared");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn upstream_error_is_delivered_to_all_waiters() {
        let store: Arc<dyn AdderGetter<&str>> = Arc::new(FakeStore::new());
        let sf = Arc::new(SingleFlight::new(store));
        let barrier = Arc::new(Barrier::new(4));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let sf = sf.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    let getter = |_ctx: &Context, _key: &&str, _sink: &mut dyn Sink| {
                        thread::sleep(Duration::from_millis(10));
                        Err(Error::NoData)
                    };
                    barrier.wait();
                    let mut sink = ByteSink::new();
                    sf.get(&Context::new(), &"k", &getter, &mut sink)
                })
            })
            .collect();

        for h in handles {
            assert!(h.join().unwrap().is_err());
        }
    }

    #[test]
    fn set_unblocks_waiters_ahead_of_leader_error() {
        let store: Arc<dyn AdderGetter<&str>> = Arc::new(FakeStore::new());
        let sf = Arc::new(SingleFlight::new(store));
        let barrier = Arc::new(Barrier::new(2));

        let leader_sf = sf.clone();
        let leader_barrier = barrier.clone();
        let leader = thread::spawn(move || {
            let getter = |_ctx: &Context, _key: &&str, _sink: &mut dyn Sink| {
                thread::sleep(Duration::from_millis(40));
                Err(Error::Upstream(Arc::new(crate::error::Message(
                    "boom".into(),
                ))))
            };
            leader_barrier.wait();
            let mut sink = ByteSink::new();
            leader_sf.get(&Context::new(), &"k", &getter, &mut sink)
        });

        barrier.wait();
        thread::sleep(Duration::from_millis(10));
        sf.set(&"k", b"direct".to_vec(), None);

        let outcome = leader.join().unwrap();
        assert!(outcome.is_ok());
    }
}

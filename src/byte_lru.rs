//! A thread-safe [`SimpleLru`] specialised to `Vec<u8>` values, with the
//! byte-to-size unit scaling and traffic counters of
//! `original_source/x/memcache/lru.go`.
//!
//! The Go original scales byte counts down into a smaller unit so a
//! `uint32` entry-size field can address multi-gigabyte caches; this
//! crate's [`SimpleLru`] sizes are plain `usize` and need no such scaling
//! on a 64-bit target, but the same `calculate_unit`/`bytes_to_size`/
//! `size_to_bytes` scheme is kept so `Stats::bytes` reports the same
//! quantised figures the Go module would.

use crate::context::{CancelReason, Context};
use crate::lru::SimpleLru;
use crate::types::Stats;
use parking_lot::Mutex;
use std::hash::Hash;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

const KIB: usize = 1024;
const MIB: usize = KIB * 1024;
const GIB: usize = MIB * 1024;

/// The threshold a quantised size must fit under: `2^30`, per spec.md §3
/// ("`max / unit ≤ 2^30`").
const MAX_UNITS: usize = 1 << 30;

/// Picks the smallest divisor in `{1, KiB, MiB, GiB}` that keeps
/// `cache_bytes / divisor` within [`MAX_UNITS`], mirroring
/// `x/memcache/lru.go`'s `calculateUnit`.
fn calculate_unit(cache_bytes: usize) -> usize {
    for &unit in &[1, KIB, MIB, GIB] {
        if cache_bytes / unit <= MAX_UNITS {
            return unit;
        }
    }
    GIB
}

/// A size- and TTL-bounded cache of raw bytes, safe to share across
/// threads. Does not itself coordinate concurrent misses — that is
/// [`SingleFlight`](crate::SingleFlight)'s job.
pub struct ByteLru<K> {
    inner: Mutex<SimpleLru<K, Vec<u8>>>,
    unit: usize,
    gets: AtomicI64,
    hits: AtomicI64,
    evictions: Arc<AtomicI64>,
}

impl<K> ByteLru<K>
where
    K: Hash + Eq + Clone,
{
    /// Creates a cache with a maximum total size of `cache_bytes`.
    pub fn new(cache_bytes: usize) -> Self {
        let unit = calculate_unit(cache_bytes);
        let max_units = (cache_bytes / unit).max(1);

        let evictions = Arc::new(AtomicI64::new(0));
        let evict_counter = evictions.clone();
        let on_evict: Box<dyn FnMut(&K, &Vec<u8>, usize) + Send> =
            Box::new(move |_key, _value, _size| {
                evict_counter.fetch_add(1, Ordering::Relaxed);
            });

        ByteLru {
            inner: Mutex::new(SimpleLru::new(max_units, Some(on_evict))),
            unit,
            gets: AtomicI64::new(0),
            hits: AtomicI64::new(0),
            evictions,
        }
    }

    fn bytes_to_size(&self, n_bytes: usize) -> usize {
        if n_bytes == 0 {
            0
        } else {
            n_bytes.div_ceil(self.unit)
        }
    }

    fn size_to_bytes(&self, size: usize) -> usize {
        size * self.unit
    }

    /// Looks up `key`, returning a copy of its bytes and expiry on a hit.
    /// Updates the `gets`/`hits` counters.
    pub fn get(&self, key: &K) -> Option<(Vec<u8>, Option<Instant>)> {
        self.gets.fetch_add(1, Ordering::Relaxed);
        let mut guard = self.inner.lock();
        let hit = guard.get(key).map(|(bytes, expire)| (bytes.clone(), expire));
        if hit.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        }
        hit
    }

    /// Stores `bytes` under `key`, evicting as needed to stay within
    /// budget.
    pub fn add(&self, key: K, bytes: Vec<u8>, expire: Option<Instant>) {
        let size = self.bytes_to_size(bytes.len());
        self.inner.lock().add(key, bytes, size, expire);
    }

    /// Removes `key` if present.
    pub fn remove(&self, key: &K) {
        self.inner.lock().evict(key);
    }

    /// A snapshot of this cache's size and traffic counters.
    pub fn stats(&self) -> Stats {
        let guard = self.inner.lock();
        Stats {
            bytes: self.size_to_bytes(guard.size()) as i64,
            items: guard.len() as i64,
            gets: self.gets.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }

    /// Periodically sweeps expired entries until `ctx` is cancelled.
    /// Intended to run on its own background thread, mirroring
    /// `x/memcache/lru.go`'s janitor goroutine.
    pub fn evict_expired_loop(&self, ctx: &Context, period: Duration) -> CancelReason {
        loop {
            if ctx.is_cancelled() {
                return CancelReason::Cancelled;
            }
            std::thread::sleep(period);
            if ctx.is_cancelled() {
                return CancelReason::Cancelled;
            }
            self.inner.lock().evict_expired();
        }
    }
}

//! A non-thread-safe, size- and TTL-bounded least-recently-used cache.
//!
//! Ported from `original_source/x/simplelru/lru.go`, which keeps its
//! ordering with a `container/list.List` plus a side `map[K]*list.Element`.
//! Rust's aliasing rules make an intrusive pointer-based list an
//! unsafe-heavy translation, so this keeps the same O(1) move-to-back /
//! push-back / remove operations over a slab (`Vec<Option<Node<K, V>>>`)
//! addressed by index instead of by pointer.

use hashbrown::HashMap;
use std::hash::Hash;
use std::time::Instant;

struct Node<K, V> {
    key: K,
    value: V,
    size: usize,
    expire: Option<Instant>,
    prev: Option<usize>,
    next: Option<usize>,
}

fn is_expired(expire: Option<Instant>, now: Instant) -> bool {
    expire.is_some_and(|e| now > e)
}

/// A least-recently-used cache with a maximum total `size` and optional
/// per-entry expiry.
///
/// `K` must be `Clone` because a copy of every key lives both in the
/// index map and, for eviction callbacks, is handed back to the caller.
pub struct SimpleLru<K, V> {
    slots: Vec<Option<Node<K, V>>>,
    free: Vec<usize>,
    index: HashMap<K, usize>,
    head: Option<usize>,
    tail: Option<usize>,
    size: usize,
    count: usize,
    max_size: usize,
    on_evict: Option<Box<dyn FnMut(&K, &V, usize) + Send>>,
    on_add: Option<Box<dyn FnMut(&K, &V, usize, Option<Instant>) + Send>>,
}

impl<K, V> SimpleLru<K, V>
where
    K: Hash + Eq + Clone,
{
    /// Creates a new cache with the given maximum size and eviction callback.
    pub fn new(max_size: usize, on_evict: Option<Box<dyn FnMut(&K, &V, usize) + Send>>) -> Self {
        SimpleLru {
            slots: Vec::new(),
            free: Vec::new(),
            index: HashMap::new(),
            head: None,
            tail: None,
            size: 0,
            count: 0,
            max_size,
            on_evict,
            on_add: None,
        }
    }

    /// Registers a hook invoked after every [`SimpleLru::add`] and its
    /// subsequent pruning pass, with the original `(key, value, size,
    /// expire)` arguments. Not called if the entry itself did not survive
    /// pruning.
    pub fn set_on_add(&mut self, on_add: Box<dyn FnMut(&K, &V, usize, Option<Instant>) + Send>) {
        self.on_add = Some(on_add);
    }

    /// Number of entries currently stored.
    pub fn len(&self) -> usize {
        self.count
    }

    /// True if no entries are stored.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Sum of `size` across all stored entries.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Remaining capacity before the cache is considered over budget.
    pub fn available(&self) -> usize {
        self.max_size.saturating_sub(self.size)
    }

    fn needs_pruning(&self) -> bool {
        self.size > self.max_size
    }

    fn alloc(&mut self, node: Node<K, V>) -> usize {
        if let Some(idx) = self.free.pop() {
            self.slots[idx] = Some(node);
            idx
        } else {
            self.slots.push(Some(node));
            self.slots.len() - 1
        }
    }

    fn node(&self, idx: usize) -> &Node<K, V> {
        self.slots[idx].as_ref().expect("dangling slab index")
    }

    fn node_mut(&mut self, idx: usize) -> &mut Node<K, V> {
        self.slots[idx].as_mut().expect("dangling slab index")
    }

    fn unlink(&mut self, idx: usize) {
        let (prev, next) = {
            let n = self.node(idx);
            (n.prev, n.next)
        };
        match prev {
            Some(p) => self.node_mut(p).next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.node_mut(n).prev = prev,
            None => self.tail = prev,
        }
    }

    fn push_back(&mut self, idx: usize) {
        let old_tail = self.tail;
        {
            let n = self.node_mut(idx);
            n.prev = old_tail;
            n.next = None;
        }
        match old_tail {
            Some(t) => self.node_mut(t).next = Some(idx),
            None => self.head = Some(idx),
        }
        self.tail = Some(idx);
    }

    fn move_to_back(&mut self, idx: usize) {
        if self.tail == Some(idx) {
            return;
        }
        self.unlink(idx);
        self.push_back(idx);
    }

    /// Removes the entry at `idx` from the list, the index, and the slab,
    /// firing the eviction callback. Returns the removed key/value.
    fn remove_node(&mut self, idx: usize) -> (K, V) {
        self.unlink(idx);
        let node = self.slots[idx].take().expect("dangling slab index");
        self.free.push(idx);
        self.index.remove(&node.key);
        self.size -= node.size;
        self.count -= 1;

        if let Some(cb) = self.on_evict.as_mut() {
            cb(&node.key, &node.value, node.size);
        }
        (node.key, node.value)
    }

    /// Adds or replaces an entry, then prunes. Returns whether any entry
    /// (including possibly this one) was evicted during pruning.
    pub fn add(&mut self, key: K, value: V, size: usize, expire: Option<Instant>) -> bool {
        if let Some(&idx) = self.index.get(&key) {
            let old_size = self.node(idx).size;
            {
                let n = self.node_mut(idx);
                n.value = value;
                n.size = size;
                n.expire = expire;
            }
            self.size = self.size - old_size + size;
            self.move_to_back(idx);
        } else {
            let node = Node {
                key: key.clone(),
                value,
                size,
                expire,
                prev: None,
                next: None,
            };
            let idx = self.alloc(node);
            self.index.insert(key.clone(), idx);
            self.push_back(idx);
            self.size += size;
            self.count += 1;
        }

        let evicted = self.prune();

        if let Some(cb) = self.on_add.as_mut() {
            if let Some(&idx) = self.index.get(&key) {
                let n = self.node(idx);
                cb(&key, &n.value, size, expire);
            }
        }

        evicted
    }

    /// Removes `key` if present, firing the eviction callback.
    pub fn evict(&mut self, key: &K) {
        if let Some(&idx) = self.index.get(key) {
            self.remove_node(idx);
        }
    }

    /// Looks up `key`. On a live hit, moves it to the back (most recently
    /// used) and returns its value and expiry. On an expired hit, evicts it
    /// and reports a miss.
    pub fn get(&mut self, key: &K) -> Option<(&V, Option<Instant>)> {
        let idx = *self.index.get(key)?;
        let now = Instant::now();
        if is_expired(self.node(idx).expire, now) {
            self.remove_node(idx);
            return None;
        }
        self.move_to_back(idx);
        let n = self.node(idx);
        Some((&n.value, n.expire))
    }

    /// Evicts every currently-expired entry, scanning front (LRU) to back
    /// (MRU). Returns whether anything was evicted.
    pub fn evict_expired(&mut self) -> bool {
        let now = Instant::now();
        let mut evicted = false;
        let mut cur = self.head;
        while let Some(idx) = cur {
            let next = self.node(idx).next;
            if is_expired(self.node(idx).expire, now) {
                self.remove_node(idx);
                evicted = true;
            }
            cur = next;
        }
        evicted
    }

    /// Visits entries from least- to most-recently-used, evicting any
    /// expired entry it encounters along the way. Does not otherwise
    /// reorder entries. Stops as soon as `f` returns `true`.
    pub fn for_each<F>(&mut self, mut f: F)
    where
        F: FnMut(&K, &V) -> bool,
    {
        let now = Instant::now();
        let mut cur = self.head;
        while let Some(idx) = cur {
            let next = self.node(idx).next;
            if is_expired(self.node(idx).expire, now) {
                self.remove_node(idx);
                cur = next;
                continue;
            }
            let n = self.node(idx);
            if f(&n.key, &n.value) {
                break;
            }
            cur = next;
        }
    }

    /// Two-pass eviction: expired entries are preferred victims, then the
    /// least-recently-used regardless of expiry. Never evicts the last
    /// remaining entry — an entry whose own size exceeds `max_size` is
    /// always left in place rather than emptying the cache (spec.md §8,
    /// invariant 2).
    fn prune(&mut self) -> bool {
        let mut evicted = false;
        let now = Instant::now();

        if self.needs_pruning() {
            let mut cur = self.head;
            while let Some(idx) = cur {
                if !self.needs_pruning() || self.count <= 1 {
                    break;
                }
                let next = self.node(idx).next;
                if is_expired(self.node(idx).expire, now) {
                    self.remove_node(idx);
                    evicted = true;
                }
                cur = next;
            }
        }

        while self.needs_pruning() && self.count > 1 {
            let idx = match self.head {
                Some(i) => i,
                None => break,
            };
            self.remove_node(idx);
            evicted = true;
        }

        evicted
    }
}

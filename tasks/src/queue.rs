//! The pending-task priority queue.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::hash::Hash;

/// A pending entry: fire time, insertion sequence, key, payload.
///
/// Ordered by `(fire_at_ms, seq)` so two entries due at the same instant
/// fire in scheduling order.
struct Entry<K, P> {
    fire_at_ms: u64,
    seq: u64,
    key: K,
    payload: P,
}

impl<K, P> PartialEq for Entry<K, P> {
    fn eq(&self, other: &Self) -> bool {
        self.fire_at_ms == other.fire_at_ms && self.seq == other.seq
    }
}

impl<K, P> Eq for Entry<K, P> {}

impl<K, P> PartialOrd for Entry<K, P> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<K, P> Ord for Entry<K, P> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.fire_at_ms, self.seq).cmp(&(other.fire_at_ms, other.seq))
    }
}

/// Priority queue of delayed tasks with at most one live entry per key.
///
/// Scheduling an already-pending key replaces the entry; `cancel` removes
/// it. Replacement and cancellation are lazy: superseded heap entries stay
/// in the heap and are discarded when they surface, keyed off a live
/// sequence-number map.
pub struct TaskQueue<K, P> {
    heap: BinaryHeap<Reverse<Entry<K, P>>>,
    live: HashMap<K, u64>,
    next_seq: u64,
}

impl<K: Eq + Hash + Clone, P> Default for TaskQueue<K, P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Eq + Hash + Clone, P> TaskQueue<K, P> {
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            live: HashMap::new(),
            next_seq: 0,
        }
    }

    /// Number of live (non-superseded) entries.
    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.live.contains_key(key)
    }

    /// Schedule `payload` under `key` at `fire_at_ms`, replacing any entry
    /// already pending for the key.
    pub fn schedule(&mut self, key: K, fire_at_ms: u64, payload: P) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.live.insert(key.clone(), seq);
        self.heap.push(Reverse(Entry {
            fire_at_ms,
            seq,
            key,
            payload,
        }));
    }

    /// Cancel the pending entry for `key`, if any.
    pub fn cancel(&mut self, key: &K) {
        self.live.remove(key);
    }

    /// The fire time of the earliest live entry. Drops stale heap entries
    /// encountered on the way.
    pub fn next_fire_at(&mut self) -> Option<u64> {
        self.drop_stale();
        self.heap.peek().map(|Reverse(e)| e.fire_at_ms)
    }

    /// Pop the earliest live entry if it is due at `now_ms`.
    pub fn pop_due(&mut self, now_ms: u64) -> Option<(K, P)> {
        self.drop_stale();
        if self.heap.peek().is_some_and(|Reverse(e)| e.fire_at_ms <= now_ms) {
            let Reverse(entry) = self.heap.pop()?;
            self.live.remove(&entry.key);
            return Some((entry.key, entry.payload));
        }
        None
    }

    fn drop_stale(&mut self) {
        while let Some(Reverse(entry)) = self.heap.peek() {
            if self.live.get(&entry.key) == Some(&entry.seq) {
                break;
            }
            self.heap.pop();
        }
    }
}

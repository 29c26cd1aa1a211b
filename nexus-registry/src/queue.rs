//! Binary heap of immutable snapshots with lazy invalidation.
//!
//! A binary heap cannot cheaply update or delete an arbitrary element. This
//! queue never tries: every edit pushes a fresh [`HeapEntry`], and old
//! snapshots stay where they are until they surface at the root. There they
//! are checked against a [`StampSource`] and dropped if the stamp no longer
//! matches.
//!
//! Each stale entry was pushed exactly once and is discarded at most once,
//! so over `M` pushes and pops the total work is `O(M log M)`.

use core::cmp::Ordering;

use tracing::trace;

use crate::order::{MaxFirst, Order};
use crate::store::{Stamp, StampSource, Version};

/// Snapshot of a record taken when it was pushed.
///
/// Entries are never mutated after creation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeapEntry<K, P> {
    priority: P,
    stamp: Stamp,
    key: K,
}

impl<K, P> HeapEntry<K, P> {
    /// Creates a snapshot of `key` at `priority` with the store's current stamp.
    #[inline]
    pub fn new(key: K, priority: P, stamp: Stamp) -> Self {
        Self {
            priority,
            stamp,
            key,
        }
    }

    /// The key this snapshot refers to.
    #[inline]
    pub fn key(&self) -> &K {
        &self.key
    }

    /// Priority at push time.
    #[inline]
    pub fn priority(&self) -> &P {
        &self.priority
    }

    /// Insertion sequence of the record, used as tie-break.
    #[inline]
    pub fn seq(&self) -> u64 {
        self.stamp.seq
    }

    /// Record version at push time.
    #[inline]
    pub fn version(&self) -> Version {
        self.stamp.version
    }

    /// Full stamp at push time.
    #[inline]
    pub fn stamp(&self) -> Stamp {
        self.stamp
    }

    /// Consumes the snapshot, returning key and priority.
    #[inline]
    pub fn into_parts(self) -> (K, P) {
        (self.key, self.priority)
    }

    /// Returns `true` if `source` still reports this snapshot's stamp for its key.
    #[inline]
    pub fn is_valid<S: StampSource<K>>(&self, source: &S) -> bool {
        source.stamp(&self.key) == Some(self.stamp)
    }
}

/// Priority queue over [`HeapEntry`] snapshots with validation on read.
///
/// Entries are ordered by `(order.rank(priority), seq asc)`: the configured
/// [`Order`] decides, and among equal priorities the earliest inserted record
/// wins.
///
/// # Example
///
/// ```
/// use nexus_registry::{HeapEntry, LazyQueue, Store};
///
/// let mut store: Store<&str, u32, ()> = Store::new();
/// let mut queue: LazyQueue<&str, u32> = LazyQueue::new();
///
/// let stamp = store.insert("a", 5, ()).unwrap();
/// queue.push(HeapEntry::new("a", 5, stamp));
/// let stamp = store.insert("b", 9, ()).unwrap();
/// queue.push(HeapEntry::new("b", 9, stamp));
///
/// // Raise "a" above "b". The old snapshot stays queued.
/// let stamp = store.edit_priority(&"a", 20).unwrap();
/// queue.push(HeapEntry::new("a", 20, stamp));
/// assert_eq!(queue.len(), 3);
///
/// let top = queue.pop_valid_top(&store).unwrap();
/// assert_eq!(*top.key(), "a");
/// store.remove(&"a").unwrap();
///
/// let top = queue.pop_valid_top(&store).unwrap();
/// assert_eq!(*top.key(), "b");
/// store.remove(&"b").unwrap();
///
/// // Stale "a" at priority 5 is discarded on the way.
/// assert!(queue.pop_valid_top(&store).is_none());
/// assert!(queue.is_empty());
/// ```
#[derive(Clone, Debug)]
pub struct LazyQueue<K, P, O = MaxFirst> {
    heap: Vec<HeapEntry<K, P>>,
    order: O,
    discarded: u64,
}

impl<K, P, O: Default> Default for LazyQueue<K, P, O> {
    fn default() -> Self {
        Self::with_order(O::default())
    }
}

impl<K, P, O: Default> LazyQueue<K, P, O> {
    /// Creates an empty queue with the default order.
    pub fn new() -> Self {
        Self::default()
    }
}

impl<K, P, O> LazyQueue<K, P, O> {
    /// Creates an empty queue ordered by `order`.
    pub fn with_order(order: O) -> Self {
        Self::with_capacity_and_order(0, order)
    }

    /// Creates an empty queue with pre-allocated capacity.
    pub fn with_capacity_and_order(capacity: usize, order: O) -> Self {
        Self {
            heap: Vec::with_capacity(capacity),
            order,
            discarded: 0,
        }
    }

    /// Number of queued snapshots, stale ones included.
    #[inline]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Returns `true` if nothing is queued.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// The comparator this queue was built with.
    #[inline]
    pub fn order(&self) -> &O {
        &self.order
    }

    /// Total stale snapshots dropped since construction.
    #[inline]
    pub fn discarded(&self) -> u64 {
        self.discarded
    }

    /// Drops every queued snapshot.
    pub fn clear(&mut self) {
        self.heap.clear();
    }
}

impl<K, P, O> LazyQueue<K, P, O>
where
    O: Order<P>,
{
    /// Pushes a snapshot. O(log n). No validity check is made.
    pub fn push(&mut self, entry: HeapEntry<K, P>) {
        trace!(seq = entry.seq(), version = %entry.version(), "queue push");
        let pos = self.heap.len();
        self.heap.push(entry);
        self.sift_up(pos);
    }

    /// Returns the best valid snapshot without consuming it.
    ///
    /// Stale snapshots found at the root are discarded permanently. The
    /// returned entry stays queued.
    pub fn peek_valid_top<S>(&mut self, source: &S) -> Option<&HeapEntry<K, P>>
    where
        S: StampSource<K>,
    {
        self.discard_stale(source);
        self.heap.first()
    }

    /// Removes and returns the best valid snapshot.
    ///
    /// Stale snapshots found on the way are discarded permanently. The caller
    /// is responsible for retiring the record in the store if it is consuming it.
    pub fn pop_valid_top<S>(&mut self, source: &S) -> Option<HeapEntry<K, P>>
    where
        S: StampSource<K>,
    {
        self.discard_stale(source);
        self.pop_root()
    }

    /// Drops every stale snapshot and rebuilds the heap. O(n).
    ///
    /// Returns the number of snapshots dropped.
    pub fn retain_valid<S>(&mut self, source: &S) -> usize
    where
        S: StampSource<K>,
    {
        let before = self.heap.len();
        self.heap.retain(|entry| entry.is_valid(source));
        let dropped = before - self.heap.len();
        self.discarded += dropped as u64;

        // Floyd heapify
        for pos in (0..self.heap.len() / 2).rev() {
            self.sift_down(pos);
        }
        dropped
    }

    fn discard_stale<S>(&mut self, source: &S)
    where
        S: StampSource<K>,
    {
        while let Some(root) = self.heap.first() {
            if root.is_valid(source) {
                return;
            }
            if let Some(stale) = self.pop_root() {
                self.discarded += 1;
                trace!(
                    seq = stale.seq(),
                    version = %stale.version(),
                    "discarding stale heap entry"
                );
            }
        }
    }

    fn pop_root(&mut self) -> Option<HeapEntry<K, P>> {
        let last = self.heap.pop()?;
        if self.heap.is_empty() {
            return Some(last);
        }
        let root = core::mem::replace(&mut self.heap[0], last);
        self.sift_down(0);
        Some(root)
    }

    /// Ordering of the entries at heap positions `a` and `b`.
    #[inline]
    fn rank(&self, a: usize, b: usize) -> Ordering {
        let (a, b) = (&self.heap[a], &self.heap[b]);
        self.order
            .rank(&a.priority, &b.priority)
            .then_with(|| a.stamp.seq.cmp(&b.stamp.seq))
    }

    fn sift_up(&mut self, pos: usize) {
        let mut hole = pos;
        while hole > 0 {
            let parent = (hole - 1) / 2;
            if self.rank(hole, parent).is_lt() {
                self.heap.swap(hole, parent);
                hole = parent;
            } else {
                break;
            }
        }
    }

    fn sift_down(&mut self, pos: usize) {
        let len = self.heap.len();
        if len <= 1 {
            return;
        }

        // Phase 1: descend to a leaf, always following the better child
        let mut hole = pos;
        loop {
            let left = 2 * hole + 1;
            if left >= len {
                break;
            }
            let right = left + 1;
            let better = if right < len && self.rank(right, left).is_lt() {
                right
            } else {
                left
            };
            self.heap.swap(hole, better);
            hole = better;
        }

        // Phase 2: sift back up, but never above the starting position
        while hole > pos {
            let parent = (hole - 1) / 2;
            if self.rank(hole, parent).is_lt() {
                self.heap.swap(hole, parent);
                hole = parent;
            } else {
                break;
            }
        }
    }
}

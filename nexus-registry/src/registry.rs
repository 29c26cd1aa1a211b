//! Indexed priority registry: a [`Store`] and a [`LazyQueue`] kept in step.
//!
//! Every mutation goes to the store first, then pushes a fresh snapshot into
//! the queue. Old snapshots are never touched; they fail validation when they
//! reach the root and are dropped there.
//!
//! Per key the lifecycle is:
//!
//! ```text
//! Absent --add--> Active --edit--> Active --remove / exec_top--> Absent
//! ```
//!
//! Every public operation either applies to both structures or fails before
//! touching either.

use core::hash::Hash;

use thiserror::Error;
use tracing::{debug, trace};

use crate::config::Compaction;
use crate::order::{MaxFirst, Order};
use crate::queue::{HeapEntry, LazyQueue};
use crate::store::{Record, Store, StoreError};

/// Errors visible to registry callers. All are recoverable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// `add` on a key that is already active.
    #[error("key already registered")]
    DuplicateKey,
    /// Edit, removal or lookup of a key that is not active.
    #[error("key not registered")]
    NotFound,
    /// Nothing valid left to serve.
    #[error("no entries")]
    NoEntries,
}

impl From<StoreError> for RegistryError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateKey => RegistryError::DuplicateKey,
            StoreError::NotFound => RegistryError::NotFound,
        }
    }
}

/// A record consumed by [`Registry::exec_top`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Top<K, P, A> {
    /// Key of the consumed record.
    pub key: K,
    /// Priority it was served at.
    pub priority: P,
    /// Its payload.
    pub attributes: A,
}

/// Borrowed view of the current top record, from [`Registry::peek_top`].
#[derive(Debug, PartialEq, Eq)]
pub struct TopRef<'a, K, P, A> {
    /// Key of the top record.
    pub key: &'a K,
    /// Its current priority.
    pub priority: &'a P,
    /// Its payload.
    pub attributes: &'a A,
}

/// Counters describing queue bloat.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RegistryStats {
    /// Active records.
    pub live: usize,
    /// Snapshots physically in the queue.
    pub queued: usize,
    /// Queued snapshots that no longer match their record.
    pub stale: usize,
    /// Stale snapshots dropped since construction.
    pub discarded: u64,
}

/// In-memory registry of uniquely keyed records served in priority order.
///
/// Ordering is `(order.rank(priority), insertion asc)`: with the default
/// [`MaxFirst`] the highest priority is served first, and among equal
/// priorities the key added earliest wins. Editing a key keeps its original
/// insertion rank.
///
/// The registry is a single-owner structure. To share it between threads,
/// wrap the whole thing in one lock, see [`SharedRegistry`](crate::SharedRegistry).
///
/// # Example
///
/// ```
/// use nexus_registry::{Registry, RegistryError};
///
/// let mut tasks: Registry<u32, u32, &str> = Registry::new();
///
/// tasks.add(1, 5, "user-a").unwrap();
/// tasks.add(2, 9, "user-b").unwrap();
/// tasks.edit_priority(&1, 20).unwrap();
///
/// let top = tasks.exec_top().unwrap();
/// assert_eq!((top.key, top.attributes), (1, "user-a"));
///
/// tasks.remove(&2).unwrap();
/// assert_eq!(tasks.exec_top(), Err(RegistryError::NoEntries));
/// ```
#[derive(Clone, Debug)]
pub struct Registry<K, P, A, O = MaxFirst> {
    store: Store<K, P, A>,
    queue: LazyQueue<K, P, O>,
    compaction: Compaction,
}

impl<K, P, A, O> Default for Registry<K, P, A, O>
where
    K: Hash + Eq,
    O: Default,
{
    fn default() -> Self {
        Self::from_parts(Store::new(), LazyQueue::new(), Compaction::default())
    }
}

impl<K, P, A, O> Registry<K, P, A, O>
where
    K: Hash + Eq,
{
    /// Creates an empty registry with the default order and compaction policy.
    pub fn new() -> Self
    where
        O: Default,
    {
        Self::default()
    }

    /// Creates an empty registry served in `order`.
    pub fn with_order(order: O) -> Self {
        Self::from_parts(
            Store::new(),
            LazyQueue::with_order(order),
            Compaction::default(),
        )
    }

    pub(crate) fn from_parts(
        store: Store<K, P, A>,
        queue: LazyQueue<K, P, O>,
        compaction: Compaction,
    ) -> Self {
        Self {
            store,
            queue,
            compaction,
        }
    }

    /// Number of active records.
    #[inline]
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Returns `true` if no record is active.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Returns `true` if `key` is active.
    #[inline]
    pub fn contains(&self, key: &K) -> bool {
        self.store.contains(key)
    }

    /// Returns the active record for `key`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] if `key` is not active.
    pub fn get(&self, key: &K) -> Result<&Record<P, A>, RegistryError> {
        self.store.get(key).ok_or(RegistryError::NotFound)
    }

    /// Iterates active records in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &Record<P, A>)> {
        self.store.iter()
    }

    /// The comparator this registry was built with.
    #[inline]
    pub fn order(&self) -> &O {
        self.queue.order()
    }

    /// The compaction policy in effect.
    #[inline]
    pub fn compaction(&self) -> Compaction {
        self.compaction
    }

    /// Current bloat counters.
    pub fn stats(&self) -> RegistryStats {
        let live = self.store.len();
        let queued = self.queue.len();
        RegistryStats {
            live,
            queued,
            stale: queued.saturating_sub(live),
            discarded: self.queue.discarded(),
        }
    }

    /// Drops every record and snapshot.
    pub fn clear(&mut self) {
        self.store.clear();
        self.queue.clear();
    }

    /// Removes `key` without serving it, returning its priority and payload.
    ///
    /// Queued snapshots of `key` are left in place and invalidate themselves.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] if `key` is not active.
    pub fn remove(&mut self, key: &K) -> Result<(P, A), RegistryError>
    where
        O: Order<P>,
    {
        let (record, version) = self.store.remove(key)?;
        trace!(seq = record.seq(), %version, "record removed");
        self.maybe_compact();
        Ok(record.into_parts())
    }

    /// Serves the current top record and retires it.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NoEntries`] if no active record remains.
    pub fn exec_top(&mut self) -> Result<Top<K, P, A>, RegistryError>
    where
        O: Order<P>,
    {
        let entry = self
            .queue
            .pop_valid_top(&self.store)
            .ok_or(RegistryError::NoEntries)?;
        let (record, _) = self.store.remove(entry.key())?;
        trace!(seq = record.seq(), "record served");

        let (key, _) = entry.into_parts();
        let (priority, attributes) = record.into_parts();
        self.maybe_compact();
        Ok(Top {
            key,
            priority,
            attributes,
        })
    }

    /// Returns the record [`exec_top`](Self::exec_top) would serve, without
    /// retiring it.
    ///
    /// Takes `&mut self` because stale snapshots at the root are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NoEntries`] if no active record remains.
    pub fn peek_top(&mut self) -> Result<TopRef<'_, K, P, A>, RegistryError>
    where
        O: Order<P>,
    {
        let Self { store, queue, .. } = self;
        let entry = queue
            .peek_valid_top(&*store)
            .ok_or(RegistryError::NoEntries)?;
        let record = store.get(entry.key()).ok_or(RegistryError::NotFound)?;
        Ok(TopRef {
            key: entry.key(),
            priority: record.priority(),
            attributes: record.attributes(),
        })
    }

    /// Rebuilds the queue keeping only valid snapshots. O(n).
    ///
    /// Returns the number of stale snapshots dropped.
    pub fn compact(&mut self) -> usize
    where
        O: Order<P>,
    {
        let before = self.queue.len();
        let dropped = self.queue.retain_valid(&self.store);
        debug!(before, after = self.queue.len(), dropped, "compacted queue");
        dropped
    }

    fn maybe_compact(&mut self)
    where
        O: Order<P>,
    {
        if self
            .compaction
            .should_compact(self.queue.len(), self.store.len())
        {
            self.compact();
        }
    }
}

impl<K, P, A, O> Registry<K, P, A, O>
where
    K: Hash + Eq + Clone,
    P: Clone,
    O: Order<P>,
{
    /// Registers a new record.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateKey`] if `key` is already active.
    /// Nothing is modified in that case.
    pub fn add(&mut self, key: K, priority: P, attributes: A) -> Result<(), RegistryError> {
        let stamp = self.store.insert(key.clone(), priority.clone(), attributes)?;
        self.queue.push(HeapEntry::new(key, priority, stamp));
        Ok(())
    }

    /// Changes the priority of an active record, keeping its payload.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] if `key` is not active.
    pub fn edit_priority(&mut self, key: &K, priority: P) -> Result<(), RegistryError> {
        let stamp = self.store.edit_priority(key, priority.clone())?;
        self.queue.push(HeapEntry::new(key.clone(), priority, stamp));
        self.maybe_compact();
        Ok(())
    }

    /// Replaces priority and payload of an active record.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] if `key` is not active.
    pub fn edit(&mut self, key: &K, priority: P, attributes: A) -> Result<(), RegistryError> {
        let stamp = self.store.edit(key, priority.clone(), attributes)?;
        self.queue.push(HeapEntry::new(key.clone(), priority, stamp));
        self.maybe_compact();
        Ok(())
    }
}

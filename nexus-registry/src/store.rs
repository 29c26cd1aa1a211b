//! Versioned record store.
//!
//! The store is the single source of truth for which keys exist and what
//! their current priority is. Every record carries a [`Stamp`]: the
//! insertion sequence assigned when the key was added, plus a [`Version`]
//! that advances by exactly one on every edit or removal.
//!
//! The queue never asks the store for records directly. It validates its
//! snapshots through [`StampSource`], so any keyed container that can report
//! a stamp can back a [`LazyQueue`](crate::LazyQueue).

use core::hash::Hash;

use rustc_hash::FxHashMap;
use thiserror::Error;

/// Per-record edit counter.
///
/// Starts at 0 when a key is added and increments by one on each edit or
/// removal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version(u64);

impl Version {
    /// Version of a freshly inserted record.
    pub const INITIAL: Version = Version(0);

    /// Returns the following version.
    #[inline]
    pub const fn next(self) -> Version {
        Version(self.0 + 1)
    }

    /// Returns the raw counter.
    #[inline]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl core::fmt::Display for Version {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// Identity of one generation of one record.
///
/// `seq` is unique per insert, so a key that is removed and added again
/// never matches a stamp from its earlier life even though its version
/// restarts at [`Version::INITIAL`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Stamp {
    /// Insertion sequence number. Doubles as the tie-break key.
    pub seq: u64,
    /// Edit counter at the time the stamp was taken.
    pub version: Version,
}

/// Errors returned by [`Store`] mutations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Pure insert on a key that already exists.
    #[error("key already present in store")]
    DuplicateKey,
    /// Edit or removal of a key that does not exist.
    #[error("key not found in store")]
    NotFound,
}

/// Anything that can report the live stamp of a key.
///
/// Returning `None` means the key is absent, which invalidates every
/// snapshot taken for it.
pub trait StampSource<K> {
    /// Returns the current stamp for `key`, if the key is live.
    fn stamp(&self, key: &K) -> Option<Stamp>;
}

/// A live record: priority, opaque attributes, and stamp.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Record<P, A> {
    priority: P,
    attributes: A,
    stamp: Stamp,
}

impl<P, A> Record<P, A> {
    /// Current priority.
    #[inline]
    pub fn priority(&self) -> &P {
        &self.priority
    }

    /// Attached payload.
    #[inline]
    pub fn attributes(&self) -> &A {
        &self.attributes
    }

    /// Current version.
    #[inline]
    pub fn version(&self) -> Version {
        self.stamp.version
    }

    /// Insertion sequence number.
    #[inline]
    pub fn seq(&self) -> u64 {
        self.stamp.seq
    }

    /// Current stamp.
    #[inline]
    pub fn stamp(&self) -> Stamp {
        self.stamp
    }

    /// Consumes the record, returning its priority and attributes.
    #[inline]
    pub fn into_parts(self) -> (P, A) {
        (self.priority, self.attributes)
    }
}

/// Keyed map of versioned records.
///
/// # Example
///
/// ```
/// use nexus_registry::{Store, StoreError, Version};
///
/// let mut store: Store<u32, u8, &str> = Store::new();
///
/// let stamp = store.insert(7, 5, "write report").unwrap();
/// assert_eq!(stamp.version, Version::INITIAL);
/// assert_eq!(store.insert(7, 1, "dup"), Err(StoreError::DuplicateKey));
///
/// let stamp = store.edit_priority(&7, 9).unwrap();
/// assert_eq!(stamp.version.get(), 1);
/// assert_eq!(store.get(&7).map(|r| *r.priority()), Some(9));
///
/// let (_, version) = store.remove(&7).unwrap();
/// assert_eq!(version.get(), 2);
/// assert!(store.get(&7).is_none());
/// ```
#[derive(Clone, Debug)]
pub struct Store<K, P, A> {
    records: FxHashMap<K, Record<P, A>>,
    next_seq: u64,
}

impl<K, P, A> Default for Store<K, P, A> {
    fn default() -> Self {
        Self {
            records: FxHashMap::default(),
            next_seq: 0,
        }
    }
}

impl<K, P, A> Store<K, P, A>
where
    K: Hash + Eq,
{
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty store with room for `capacity` records.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
            next_seq: 0,
        }
    }

    /// Number of live records.
    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if no record is live.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns `true` if `key` is live.
    #[inline]
    pub fn contains(&self, key: &K) -> bool {
        self.records.contains_key(key)
    }

    /// Returns the record for `key`, or `None` if absent.
    #[inline]
    pub fn get(&self, key: &K) -> Option<&Record<P, A>> {
        self.records.get(key)
    }

    /// Iterates live records in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &Record<P, A>)> {
        self.records.iter()
    }

    /// Inserts a new record at [`Version::INITIAL`] with a fresh sequence number.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DuplicateKey`] if `key` is already live. The store
    /// is left untouched.
    pub fn insert(&mut self, key: K, priority: P, attributes: A) -> Result<Stamp, StoreError> {
        if self.records.contains_key(&key) {
            return Err(StoreError::DuplicateKey);
        }
        Ok(self.insert_new(key, priority, attributes))
    }

    /// Inserts `key`, or overwrites its priority and attributes if it is live.
    ///
    /// Overwriting keeps the sequence number and advances the version.
    pub fn put(&mut self, key: K, priority: P, attributes: A) -> Stamp {
        match self.records.get_mut(&key) {
            Some(record) => {
                record.priority = priority;
                record.attributes = attributes;
                record.stamp.version = record.stamp.version.next();
                record.stamp
            }
            None => self.insert_new(key, priority, attributes),
        }
    }

    /// Replaces priority and attributes of a live record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if `key` is absent.
    pub fn edit(&mut self, key: &K, priority: P, attributes: A) -> Result<Stamp, StoreError> {
        let record = self.records.get_mut(key).ok_or(StoreError::NotFound)?;
        record.priority = priority;
        record.attributes = attributes;
        record.stamp.version = record.stamp.version.next();
        Ok(record.stamp)
    }

    /// Replaces the priority of a live record, keeping its attributes.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if `key` is absent.
    pub fn edit_priority(&mut self, key: &K, priority: P) -> Result<Stamp, StoreError> {
        let record = self.records.get_mut(key).ok_or(StoreError::NotFound)?;
        record.priority = priority;
        record.stamp.version = record.stamp.version.next();
        Ok(record.stamp)
    }

    /// Deletes a record outright.
    ///
    /// Returns the removed record together with the version the removal
    /// advanced it to. Every outstanding snapshot of `key` is stale afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if `key` is absent.
    pub fn remove(&mut self, key: &K) -> Result<(Record<P, A>, Version), StoreError> {
        let record = self.records.remove(key).ok_or(StoreError::NotFound)?;
        let version = record.stamp.version.next();
        Ok((record, version))
    }

    /// Drops every record. Sequence numbers keep counting.
    pub fn clear(&mut self) {
        self.records.clear();
    }

    fn insert_new(&mut self, key: K, priority: P, attributes: A) -> Stamp {
        let stamp = Stamp {
            seq: self.next_seq,
            version: Version::INITIAL,
        };
        self.next_seq += 1;
        self.records.insert(
            key,
            Record {
                priority,
                attributes,
                stamp,
            },
        );
        stamp
    }
}

impl<K, P, A> StampSource<K> for Store<K, P, A>
where
    K: Hash + Eq,
{
    #[inline]
    fn stamp(&self, key: &K) -> Option<Stamp> {
        self.records.get(key).map(Record::stamp)
    }
}

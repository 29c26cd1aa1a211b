//! Thread-safe handle around a [`Registry`].
//!
//! The store and the queue must change together, so the whole registry sits
//! behind one lock. Each method is a single critical section; use
//! [`SharedRegistry::with`] when several steps must be atomic together.

use core::hash::Hash;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::order::{MaxFirst, Order};
use crate::registry::{Registry, RegistryError, RegistryStats, Top};

/// Cloneable, lock-protected [`Registry`].
///
/// Reads that would borrow from the registry return owned clones instead,
/// since the lock is released before the method returns.
///
/// # Example
///
/// ```
/// use nexus_registry::SharedRegistry;
/// use std::thread;
///
/// let tasks: SharedRegistry<u32, u32, ()> = SharedRegistry::default();
///
/// let handles: Vec<_> = (0..4u32)
///     .map(|t| {
///         let tasks = tasks.clone();
///         thread::spawn(move || {
///             for i in 0..10 {
///                 tasks.add(t * 10 + i, i, ()).unwrap();
///             }
///         })
///     })
///     .collect();
/// for h in handles {
///     h.join().unwrap();
/// }
///
/// assert_eq!(tasks.len(), 40);
/// assert_eq!(tasks.exec_top().unwrap().priority, 9);
/// ```
pub struct SharedRegistry<K, P, A, O = MaxFirst> {
    inner: Arc<Mutex<Registry<K, P, A, O>>>,
}

impl<K, P, A, O> Clone for SharedRegistry<K, P, A, O> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, P, A, O> Default for SharedRegistry<K, P, A, O>
where
    K: Hash + Eq,
    O: Default,
{
    fn default() -> Self {
        Self::new(Registry::default())
    }
}

impl<K, P, A, O> core::fmt::Debug for SharedRegistry<K, P, A, O>
where
    K: Hash + Eq,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        // not reentrant: formatting from inside `with` must not block
        match self.inner.try_lock() {
            Some(registry) => f
                .debug_struct("SharedRegistry")
                .field("stats", &registry.stats())
                .finish(),
            None => f
                .debug_struct("SharedRegistry")
                .field("stats", &format_args!("<locked>"))
                .finish(),
        }
    }
}

impl<K, P, A, O> From<Registry<K, P, A, O>> for SharedRegistry<K, P, A, O> {
    fn from(registry: Registry<K, P, A, O>) -> Self {
        Self::new(registry)
    }
}

impl<K, P, A, O> SharedRegistry<K, P, A, O> {
    /// Wraps an existing registry.
    pub fn new(registry: Registry<K, P, A, O>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(registry)),
        }
    }

    /// Runs `f` with exclusive access to the registry.
    pub fn with<R>(&self, f: impl FnOnce(&mut Registry<K, P, A, O>) -> R) -> R {
        let mut registry = self.inner.lock();
        f(&mut registry)
    }

    /// Returns the registry if this is the last handle, otherwise gives the
    /// handle back.
    pub fn try_into_inner(self) -> Result<Registry<K, P, A, O>, Self> {
        Arc::try_unwrap(self.inner)
            .map(Mutex::into_inner)
            .map_err(|inner| Self { inner })
    }
}

impl<K, P, A, O> SharedRegistry<K, P, A, O>
where
    K: Hash + Eq,
{
    /// See [`Registry::len`].
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// See [`Registry::is_empty`].
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// See [`Registry::contains`].
    pub fn contains(&self, key: &K) -> bool {
        self.inner.lock().contains(key)
    }

    /// See [`Registry::stats`].
    pub fn stats(&self) -> RegistryStats {
        self.inner.lock().stats()
    }

    /// See [`Registry::clear`].
    pub fn clear(&self) {
        self.inner.lock().clear();
    }
}

impl<K, P, A, O> SharedRegistry<K, P, A, O>
where
    K: Hash + Eq + Clone,
    P: Clone,
    O: Order<P>,
{
    /// See [`Registry::add`].
    pub fn add(&self, key: K, priority: P, attributes: A) -> Result<(), RegistryError> {
        self.inner.lock().add(key, priority, attributes)
    }

    /// See [`Registry::edit_priority`].
    pub fn edit_priority(&self, key: &K, priority: P) -> Result<(), RegistryError> {
        self.inner.lock().edit_priority(key, priority)
    }

    /// See [`Registry::edit`].
    pub fn edit(&self, key: &K, priority: P, attributes: A) -> Result<(), RegistryError> {
        self.inner.lock().edit(key, priority, attributes)
    }

    /// See [`Registry::remove`].
    pub fn remove(&self, key: &K) -> Result<(P, A), RegistryError> {
        self.inner.lock().remove(key)
    }

    /// See [`Registry::exec_top`].
    pub fn exec_top(&self) -> Result<Top<K, P, A>, RegistryError> {
        self.inner.lock().exec_top()
    }

    /// See [`Registry::compact`].
    pub fn compact(&self) -> usize {
        self.inner.lock().compact()
    }

    /// Cloned view of [`Registry::peek_top`].
    pub fn peek_top(&self) -> Result<Top<K, P, A>, RegistryError>
    where
        A: Clone,
    {
        let mut registry = self.inner.lock();
        let top = registry.peek_top()?;
        Ok(Top {
            key: top.key.clone(),
            priority: top.priority.clone(),
            attributes: top.attributes.clone(),
        })
    }

    /// Cloned priority and payload of an active record.
    pub fn get(&self, key: &K) -> Result<(P, A), RegistryError>
    where
        A: Clone,
    {
        let registry = self.inner.lock();
        let record = registry.get(key)?;
        Ok((record.priority().clone(), record.attributes().clone()))
    }
}

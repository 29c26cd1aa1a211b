//! Registry construction.

use thiserror::Error;
use tracing::debug;

use crate::order::MaxFirst;
use crate::queue::LazyQueue;
use crate::registry::Registry;
use crate::store::Store;

const DEFAULT_MIN_ENTRIES: usize = 64;
const DEFAULT_MAX_STALE_RATIO: f64 = 0.5;

/// Error during registry construction.
#[derive(Clone, Copy, Debug, PartialEq, Error)]
pub enum ConfigError {
    /// Stale ratio must lie in `(0.0, 1.0)`.
    #[error("stale ratio {0} is outside (0.0, 1.0)")]
    InvalidStaleRatio(f64),
}

/// When the registry rebuilds its queue to shed stale snapshots.
///
/// Compaction is an O(n) pass over the queue. It never changes which record
/// `exec_top` returns next, only how much dead weight the heap carries.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Compaction {
    /// Stale snapshots are only ever dropped when they surface at the root.
    Disabled,
    /// Rebuild once the queue holds at least `min_entries` snapshots and the
    /// stale fraction exceeds `max_stale_ratio`. The ratio must lie in
    /// `(0.0, 1.0)`: at 1.0 the fraction could never exceed it.
    Ratio {
        /// Queue length below which compaction is never attempted.
        min_entries: usize,
        /// Stale fraction that triggers a rebuild.
        max_stale_ratio: f64,
    },
}

impl Default for Compaction {
    fn default() -> Self {
        Compaction::Ratio {
            min_entries: DEFAULT_MIN_ENTRIES,
            max_stale_ratio: DEFAULT_MAX_STALE_RATIO,
        }
    }
}

impl Compaction {
    fn validate(&self) -> Result<(), ConfigError> {
        match *self {
            Compaction::Disabled => Ok(()),
            Compaction::Ratio {
                max_stale_ratio, ..
            } => {
                if max_stale_ratio > 0.0 && max_stale_ratio < 1.0 {
                    Ok(())
                } else {
                    Err(ConfigError::InvalidStaleRatio(max_stale_ratio))
                }
            }
        }
    }

    /// Returns `true` if a queue of `queued` snapshots backing `live` records
    /// should be rebuilt.
    pub(crate) fn should_compact(&self, queued: usize, live: usize) -> bool {
        match *self {
            Compaction::Disabled => false,
            Compaction::Ratio {
                min_entries,
                max_stale_ratio,
            } => {
                if queued == 0 || queued < min_entries {
                    return false;
                }
                let stale = queued.saturating_sub(live);
                stale as f64 / queued as f64 > max_stale_ratio
            }
        }
    }
}

/// Builder for [`Registry`].
///
/// # Example
///
/// ```
/// use nexus_registry::{Compaction, MinFirst, Registry, RegistryBuilder};
///
/// let registry: Registry<u64, u64, String, MinFirst> = RegistryBuilder::default()
///     .capacity(1024)
///     .order(MinFirst)
///     .compaction(Compaction::Disabled)
///     .build()
///     .unwrap();
/// assert!(registry.is_empty());
/// ```
#[derive(Clone, Debug)]
pub struct RegistryBuilder<O = MaxFirst> {
    capacity: usize,
    order: O,
    compaction: Compaction,
}

impl Default for RegistryBuilder<MaxFirst> {
    fn default() -> Self {
        Self {
            capacity: 0,
            order: MaxFirst,
            compaction: Compaction::default(),
        }
    }
}

impl RegistryBuilder<MaxFirst> {
    /// Builder with the default order ([`MaxFirst`]) and compaction policy.
    pub fn new() -> Self {
        Self::default()
    }
}

impl<O> RegistryBuilder<O> {
    /// Pre-allocate room for at least this many records. Default: 0.
    pub fn capacity(mut self, records: usize) -> Self {
        self.capacity = records;
        self
    }

    /// Comparator deciding which priority is served first. Default: [`MaxFirst`].
    pub fn order<O2>(self, order: O2) -> RegistryBuilder<O2> {
        RegistryBuilder {
            capacity: self.capacity,
            order,
            compaction: self.compaction,
        }
    }

    /// Compaction policy. Default: ratio 0.5 once 64 snapshots are queued.
    pub fn compaction(mut self, compaction: Compaction) -> Self {
        self.compaction = compaction;
        self
    }

    /// Build the registry.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidStaleRatio`] if the compaction ratio is
    /// not in `(0.0, 1.0)`.
    pub fn build<K, P, A>(self) -> Result<Registry<K, P, A, O>, ConfigError>
    where
        K: core::hash::Hash + Eq,
    {
        self.compaction.validate()?;
        debug!(
            capacity = self.capacity,
            compaction = ?self.compaction,
            "building registry"
        );
        Ok(Registry::from_parts(
            Store::with_capacity(self.capacity),
            LazyQueue::with_capacity_and_order(self.capacity, self.order),
            self.compaction,
        ))
    }
}

//! Keyed priority registry with versioned records and lazy heap invalidation.
//!
//! A binary heap is the natural structure for "serve the best item next", but
//! it has no cheap way to change or delete an element in the middle. This
//! crate pairs a heap with a keyed store and never edits the heap in place:
//!
//! ```text
//! Store (map)        - owns records, one per key, each with a version stamp
//! LazyQueue (heap)   - owns immutable snapshots (priority, seq, key, stamp)
//! ```
//!
//! Every edit bumps the record's version in the store and pushes a new
//! snapshot. Old snapshots stay queued and are dropped when they reach the
//! root and their stamp no longer matches the store.
//!
//! # Quick Start
//!
//! ```
//! use nexus_registry::{Registry, RegistryError};
//!
//! // key = task id, priority = u32, attributes = owning user id
//! let mut tasks: Registry<u32, u32, u64> = Registry::new();
//!
//! tasks.add(101, 5, 1).unwrap();
//! tasks.add(102, 9, 2).unwrap();
//! tasks.edit_priority(&101, 20).unwrap();
//!
//! assert_eq!(tasks.exec_top().unwrap().attributes, 1);
//! assert_eq!(tasks.exec_top().unwrap().attributes, 2);
//! assert_eq!(tasks.exec_top(), Err(RegistryError::NoEntries));
//! ```
//!
//! # Ordering
//!
//! Records are served by `(order.rank(priority), insertion sequence asc)`.
//! The default order is [`MaxFirst`]; [`MinFirst`] and closures via
//! [`OrderBy`] can be chosen at construction. Equal priorities go to the key
//! that was added first, and editing a key does not change its insertion rank.
//!
//! # Cost
//!
//! | Operation | Cost |
//! |-----------|------|
//! | `add` | O(log n) |
//! | `edit_priority` / `edit` | O(log n) amortized |
//! | `remove` | O(1) amortized |
//! | `exec_top` | O(log n) amortized |
//! | `peek_top` | O(log n) amortized |
//! | `compact` | O(n) |
//!
//! Each stale snapshot was pushed once and is dropped once, so a sequence of
//! `M` operations costs `O(M log M)` in total. [`Compaction`] bounds the
//! number of stale snapshots held at any moment. Under a `Ratio` policy,
//! `edit_priority`, `edit`, `remove` and `exec_top` may trigger an O(n)
//! rebuild; it runs only once the stale fraction passes the ratio, so its
//! cost is spread over the stale snapshots that caused it.
//!
//! # Concurrency
//!
//! [`Registry`] is single-owner. The store and queue must change as one
//! step, so sharing goes through [`SharedRegistry`], which keeps the whole
//! registry behind a single mutex.

#![warn(missing_docs)]

pub mod config;
pub mod order;
pub mod queue;
pub mod registry;
pub mod shared;
pub mod store;

pub use config::{Compaction, ConfigError, RegistryBuilder};
pub use order::{MaxFirst, MinFirst, Order, OrderBy};
pub use queue::{HeapEntry, LazyQueue};
pub use registry::{Registry, RegistryError, RegistryStats, Top, TopRef};
pub use shared::SharedRegistry;
pub use store::{Record, Stamp, StampSource, Store, StoreError, Version};

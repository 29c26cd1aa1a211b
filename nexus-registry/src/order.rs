//! Priority ordering used by the queue.
//!
//! An [`Order`] decides which of two priorities is served first. The queue
//! is a min-heap over [`Order::rank`]: the priority that ranks `Less` sits
//! closer to the root. Equal ranks fall back to insertion sequence, earliest
//! first, so the full ordering is `(rank(priority), seq asc)`.

use core::cmp::Ordering;

/// Comparator over priorities, fixed at construction time.
///
/// `rank(a, b)` returns [`Ordering::Less`] when `a` must be served before `b`.
/// Implementations must be a total order and must not change between calls;
/// the heap never re-sorts entries that are already queued.
///
/// # Example
///
/// ```
/// use nexus_registry::{MaxFirst, MinFirst, Order};
/// use std::cmp::Ordering;
///
/// assert_eq!(MaxFirst.rank(&9, &5), Ordering::Less);
/// assert_eq!(MinFirst.rank(&9, &5), Ordering::Greater);
/// ```
pub trait Order<P> {
    /// Compares two priorities in service order.
    fn rank(&self, a: &P, b: &P) -> Ordering;

    /// Returns `true` if `a` is served strictly before `b`.
    #[inline]
    fn precedes(&self, a: &P, b: &P) -> bool {
        self.rank(a, b).is_lt()
    }
}

/// Highest priority is served first. The default order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MaxFirst;

impl<P: Ord> Order<P> for MaxFirst {
    #[inline]
    fn rank(&self, a: &P, b: &P) -> Ordering {
        b.cmp(a)
    }
}

/// Lowest priority is served first (deadlines, timestamps).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MinFirst;

impl<P: Ord> Order<P> for MinFirst {
    #[inline]
    fn rank(&self, a: &P, b: &P) -> Ordering {
        a.cmp(b)
    }
}

/// Adapts a closure into an [`Order`].
///
/// ```
/// use nexus_registry::{Order, OrderBy};
///
/// // Serve the priority closest to 100 first.
/// let order = OrderBy(|a: &i64, b: &i64| (a - 100).abs().cmp(&(b - 100).abs()));
/// assert!(order.precedes(&98, &90));
/// ```
#[derive(Clone, Copy)]
pub struct OrderBy<F>(pub F);

impl<P, F> Order<P> for OrderBy<F>
where
    F: Fn(&P, &P) -> Ordering,
{
    #[inline]
    fn rank(&self, a: &P, b: &P) -> Ordering {
        (self.0)(a, b)
    }
}

impl<F> core::fmt::Debug for OrderBy<F> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("OrderBy(..)")
    }
}

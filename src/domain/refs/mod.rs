//! Intrusive strong/weak reference counting.
//!
//! A managed object embeds a [`CounterSlot`] and implements [`RefCounted`].
//! The first [`Ref`] taken over a heap-allocated object allocates its
//! [`ReferenceCounter`] and attaches it to the slot; further strong and weak
//! handles find the counter through that slot.
//!
//! Lifetime rules:
//! - the object is dropped exactly when the strong count reaches zero;
//! - the counter is freed exactly when both counts are zero, which happens on
//!   the strong path if no weak handles exist, otherwise on the last weak release;
//! - a [`WeakRef`] never caches a pointer; every read re-checks the counter.
//!
//! Handles hold raw pointers and are therefore `!Send + !Sync`. All counts are
//! plain `Cell`s and every operation runs to completion on the calling thread.

mod counter;
mod strong;
mod weak;

pub use counter::{live_counters, ReferenceCounter};
pub use strong::Ref;
pub use weak::WeakRef;

use std::cell::Cell;
use std::fmt;
use std::ptr::NonNull;

/// Capability of a type to take part in shared ownership through [`Ref`] and
/// [`WeakRef`].
///
/// Implementors expose a single [`CounterSlot`] field. The slot is owned by the
/// handles: an object must never clear or replace it on its own.
///
/// # Safety
///
/// `counter_slot` must return a slot stored inside `self`, and the same slot
/// on every call. Handles free the object through the counter found in that
/// slot, so a slot shared with another object would let a handle free memory
/// it never allocated. A slot whose counter belongs to a different object is
/// additionally rejected with a panic.
///
/// ```
/// use refcache::domain::refs::{CounterSlot, Ref, RefCounted};
///
/// struct Node {
///     slot: CounterSlot<Node>,
///     value: u32,
/// }
///
/// // SAFETY: `slot` is a field of `Node`.
/// unsafe impl RefCounted for Node {
///     fn counter_slot(&self) -> &CounterSlot<Self> {
///         &self.slot
///     }
/// }
///
/// let node = Ref::new(Node { slot: CounterSlot::new(), value: 3 });
/// assert_eq!(node.get().map(|n| n.value), Some(3));
/// ```
///
/// A plain `impl` is rejected:
///
/// ```compile_fail
/// use refcache::domain::refs::{CounterSlot, RefCounted};
///
/// struct Node {
///     slot: CounterSlot<Node>,
/// }
///
/// impl RefCounted for Node {
///     fn counter_slot(&self) -> &CounterSlot<Self> {
///         &self.slot
///     }
/// }
/// ```
pub unsafe trait RefCounted: Sized {
    fn counter_slot(&self) -> &CounterSlot<Self>;
}

/// The counter attached to `object`, if any.
///
/// Panics if the slot holds a counter whose back pointer names another
/// object.
pub(crate) fn attached_counter<T: RefCounted>(
    object: &T,
) -> Option<NonNull<ReferenceCounter<T>>> {
    let counter = object.counter_slot().get()?;
    // SAFETY: an attached slot points at a live counter.
    let owner = unsafe { counter.as_ref() }.object();
    if owner != Some(NonNull::from(object)) {
        panic!("counter slot does not belong to this object");
    }
    Some(counter)
}

/// The managed object's back reference to its [`ReferenceCounter`].
///
/// Empty until the first strong handle is taken over a heap object. Cloning a
/// slot yields an empty one: a copied object is a new object.
pub struct CounterSlot<T> {
    counter: Cell<Option<NonNull<ReferenceCounter<T>>>>,
}

impl<T> CounterSlot<T> {
    pub const fn new() -> Self {
        Self {
            counter: Cell::new(None),
        }
    }

    /// Whether the object is currently counter-managed.
    pub fn is_attached(&self) -> bool {
        self.counter.get().is_some()
    }

    pub(crate) fn get(&self) -> Option<NonNull<ReferenceCounter<T>>> {
        self.counter.get()
    }

    pub(crate) fn attach(&self, counter: NonNull<ReferenceCounter<T>>) {
        if self.counter.get().is_some() {
            panic!("counter slot already attached to a reference counter");
        }
        self.counter.set(Some(counter));
    }

    pub(crate) fn detach(&self) {
        self.counter.set(None);
    }
}

impl<T> Default for CounterSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for CounterSlot<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for CounterSlot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CounterSlot")
            .field("attached", &self.is_attached())
            .finish()
    }
}

impl<T> Drop for CounterSlot<T> {
    fn drop(&mut self) {
        // Only the handles may free a counter-managed object, and they detach
        // the slot before doing so.
        if self.counter.get().is_some() && !std::thread::panicking() {
            panic!("managed object dropped while still attached to its reference counter");
        }
    }
}

//! Shared bookkeeping record for one managed object.

use std::cell::Cell;
use std::fmt;
use std::ptr::NonNull;

thread_local! {
    static LIVE_COUNTERS: Cell<usize> = const { Cell::new(0) };
}

/// Number of reference counters currently allocated on this thread.
///
/// Handles are `!Send`, so every counter is allocated and freed on the thread
/// that created its object.
pub fn live_counters() -> usize {
    LIVE_COUNTERS.with(Cell::get)
}

/// Strong count, weak count, deleted flag and a non-owning back reference
/// for exactly one managed object.
///
/// Only [`Ref`](super::Ref) and [`WeakRef`](super::WeakRef) mutate it.
pub struct ReferenceCounter<T> {
    strong: Cell<usize>,
    weak: Cell<usize>,
    deleted: Cell<bool>,
    object: Cell<Option<NonNull<T>>>,
}

impl<T> ReferenceCounter<T> {
    /// Heap-allocates a counter with zero counts for `object`.
    pub(crate) fn allocate(object: NonNull<T>) -> NonNull<Self> {
        let counter = Box::new(Self {
            strong: Cell::new(0),
            weak: Cell::new(0),
            deleted: Cell::new(false),
            object: Cell::new(Some(object)),
        });
        LIVE_COUNTERS.with(|live| live.set(live.get() + 1));
        tracing::trace!(object = ?object, "reference counter allocated");
        NonNull::from(Box::leak(counter))
    }

    /// Frees a counter previously returned by [`ReferenceCounter::allocate`].
    ///
    /// # Safety
    /// `counter` must come from `allocate`, must not have been freed yet, and
    /// no reference into it may be used afterwards.
    pub(crate) unsafe fn free(counter: NonNull<Self>) {
        // SAFETY: upheld by the caller.
        let counter = unsafe { Box::from_raw(counter.as_ptr()) };
        if counter.strong.get() != 0 || counter.weak.get() != 0 {
            panic!(
                "reference counter freed with live handles (strong {}, weak {})",
                counter.strong.get(),
                counter.weak.get()
            );
        }
        LIVE_COUNTERS.with(|live| live.set(live.get() - 1));
        tracing::trace!("reference counter freed");
    }

    pub fn strong_count(&self) -> usize {
        self.strong.get()
    }

    pub fn weak_count(&self) -> usize {
        self.weak.get()
    }

    /// Whether the object was dropped while weak handles still observed it.
    pub fn is_deleted(&self) -> bool {
        self.deleted.get()
    }

    /// The managed object, unless it has already been dropped.
    pub(crate) fn object(&self) -> Option<NonNull<T>> {
        if self.deleted.get() {
            None
        } else {
            self.object.get()
        }
    }

    pub(crate) fn acquire_strong(&self) {
        let count = self
            .strong
            .get()
            .checked_add(1)
            .unwrap_or_else(|| panic!("strong reference count overflow"));
        self.strong.set(count);
    }

    /// Decrements the strong count and returns the remaining count.
    pub(crate) fn release_strong(&self) -> usize {
        let count = self
            .strong
            .get()
            .checked_sub(1)
            .unwrap_or_else(|| panic!("strong reference count underflow"));
        self.strong.set(count);
        count
    }

    pub(crate) fn acquire_weak(&self) {
        let count = self
            .weak
            .get()
            .checked_add(1)
            .unwrap_or_else(|| panic!("weak reference count overflow"));
        self.weak.set(count);
    }

    /// Decrements the weak count and returns the remaining count.
    pub(crate) fn release_weak(&self) -> usize {
        let count = self
            .weak
            .get()
            .checked_sub(1)
            .unwrap_or_else(|| panic!("weak reference count underflow"));
        self.weak.set(count);
        count
    }

    /// Records that the object is gone while the counter lives on for weak
    /// observers.
    pub(crate) fn mark_deleted(&self) {
        self.deleted.set(true);
        self.object.set(None);
    }

    /// Detaches and returns the object pointer without marking the counter
    /// deleted.
    pub(crate) fn take_object(&self) -> Option<NonNull<T>> {
        self.object.take()
    }
}

impl<T> fmt::Debug for ReferenceCounter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReferenceCounter")
            .field("strong", &self.strong.get())
            .field("weak", &self.weak.get())
            .field("deleted", &self.deleted.get())
            .finish()
    }
}

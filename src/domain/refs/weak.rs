//! Weak handle: observes a managed object without keeping it alive.

use std::fmt;
use std::ptr::NonNull;

use super::counter::ReferenceCounter;
use super::strong::Ref;
use super::{attached_counter, RefCounted};

/// Non-owning handle bound to an object's [`ReferenceCounter`].
///
/// Holding a `WeakRef` keeps the counter alive, never the object. Every read
/// goes through the counter and reports absence once the object is gone.
pub struct WeakRef<T: RefCounted> {
    counter: Option<NonNull<ReferenceCounter<T>>>,
}

impl<T: RefCounted> WeakRef<T> {
    /// An unbound handle.
    pub const fn new() -> Self {
        Self { counter: None }
    }

    /// Observes `object` if it is counter-managed; unbound otherwise.
    pub fn from_object(object: &T) -> Self {
        match attached_counter(object) {
            // SAFETY: an attached slot points at a live counter.
            Some(counter) => Self::bind(counter, unsafe { counter.as_ref() }),
            None => Self::new(),
        }
    }

    fn bind(ptr: NonNull<ReferenceCounter<T>>, counter: &ReferenceCounter<T>) -> Self {
        if counter.is_deleted() {
            return Self::new();
        }
        counter.acquire_weak();
        Self { counter: Some(ptr) }
    }

    /// The bound counter, if any.
    pub fn counter(&self) -> Option<&ReferenceCounter<T>> {
        // SAFETY: a bound weak handle holds a weak count, which keeps the
        // counter allocated.
        self.counter.map(|c| unsafe { c.as_ref() })
    }

    pub fn is_bound(&self) -> bool {
        self.counter.is_some()
    }

    /// True iff bound and the object has not been dropped.
    pub fn object_exists(&self) -> bool {
        self.counter().is_some_and(|c| !c.is_deleted())
    }

    /// The object pointer while it is alive, re-checked on every call.
    ///
    /// Dereferencing the result is only sound while some strong handle is
    /// known to be held; prefer [`WeakRef::upgrade`].
    pub fn ptr(&self) -> Option<NonNull<T>> {
        self.counter()?.object()
    }

    /// A new strong handle, or an unset one if the object is gone.
    pub fn upgrade(&self) -> Ref<T> {
        Ref::from_weak(self)
    }

    /// Releases this handle's weak count and unbinds it.
    ///
    /// The last weak release frees the counter once no strong handle is left.
    pub fn reset(&mut self) {
        let Some(counter_ptr) = self.counter.take() else {
            return;
        };
        // SAFETY: the weak count held until now kept the counter allocated.
        let counter = unsafe { counter_ptr.as_ref() };
        if counter.release_weak() > 0 || counter.strong_count() > 0 {
            return;
        }

        if !counter.is_deleted() {
            // Unreachable while the strong path upholds its invariants; an
            // object still attached here has no other owner left.
            if let Some(object) = counter.take_object() {
                tracing::warn!(
                    object = ?object,
                    "dropping object released by its last weak handle"
                );
                // SAFETY: no strong handle remains and the object is a leaked box.
                unsafe { object.as_ref() }.counter_slot().detach();
                drop(unsafe { Box::from_raw(object.as_ptr()) });
            }
        }
        // SAFETY: both counts are zero and the object no longer refers to it.
        unsafe { ReferenceCounter::free(counter_ptr) };
    }
}

impl<T: RefCounted> Default for WeakRef<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: RefCounted> Clone for WeakRef<T> {
    fn clone(&self) -> Self {
        match self.counter {
            // SAFETY: see `counter`.
            Some(ptr) => Self::bind(ptr, unsafe { ptr.as_ref() }),
            None => Self::new(),
        }
    }
}

impl<T: RefCounted> Drop for WeakRef<T> {
    fn drop(&mut self) {
        self.reset();
    }
}

impl<T: RefCounted> From<&Ref<T>> for WeakRef<T> {
    fn from(strong: &Ref<T>) -> Self {
        strong.get().map_or_else(Self::new, Self::from_object)
    }
}

impl<T: RefCounted> fmt::Debug for WeakRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakRef")
            .field("counter", &self.counter())
            .finish()
    }
}

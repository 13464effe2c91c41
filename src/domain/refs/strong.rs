//! Strong handle: keeps a managed object alive.

use std::fmt;
use std::marker::PhantomData;
use std::ptr::{self, NonNull};

use super::counter::ReferenceCounter;
use super::weak::WeakRef;
use super::{attached_counter, RefCounted};

/// Owning handle over a [`RefCounted`] object.
///
/// Several `Ref`s may alias one object; the object is dropped when the last of
/// them is released. A `Ref` may also be unset, in which case every accessor
/// reports absence.
pub struct Ref<T: RefCounted> {
    ptr: Option<NonNull<T>>,
    _owns: PhantomData<T>,
}

impl<T: RefCounted> Ref<T> {
    /// An unset handle.
    pub const fn null() -> Self {
        Self {
            ptr: None,
            _owns: PhantomData,
        }
    }

    /// Moves `value` to the heap and takes the first strong handle over it.
    pub fn new(value: T) -> Self {
        Self::from_box(Box::new(value))
    }

    pub fn from_box(value: Box<T>) -> Self {
        if value.counter_slot().is_attached() {
            panic!("boxed object is already attached to a reference counter");
        }
        let ptr = NonNull::from(Box::leak(value));
        let counter = ReferenceCounter::allocate(ptr);
        // SAFETY: `ptr` was just leaked from a box and is uniquely ours.
        unsafe { ptr.as_ref() }.counter_slot().attach(counter);
        // SAFETY: `counter` was just allocated.
        unsafe { counter.as_ref() }.acquire_strong();
        Self {
            ptr: Some(ptr),
            _owns: PhantomData,
        }
    }

    /// Wraps an object that is never freed.
    ///
    /// If the object is not counter-managed the handle does no counting at
    /// all; releasing it is a no-op.
    pub fn from_static(object: &'static T) -> Self {
        if let Some(counter) = attached_counter(object) {
            // SAFETY: an attached slot points at a live counter.
            unsafe { counter.as_ref() }.acquire_strong();
        }
        Self {
            ptr: Some(NonNull::from(object)),
            _owns: PhantomData,
        }
    }

    /// Takes another strong handle over an object reached through a borrow,
    /// such as `&self` inside a method of the managed type.
    ///
    /// Returns an unset handle when the object is not counter-managed: a
    /// borrowed object without a counter may live on the stack or inside a
    /// registry that owns it outright, and cannot be pinned.
    pub fn from_object(object: &T) -> Self {
        match attached_counter(object) {
            Some(counter) => {
                // SAFETY: an attached slot points at a live counter, and the
                // borrow proves the object has not been dropped.
                unsafe { counter.as_ref() }.acquire_strong();
                Self {
                    ptr: Some(NonNull::from(object)),
                    _owns: PhantomData,
                }
            }
            None => Self::null(),
        }
    }

    /// Upgrades a weak handle; unset if the object is already gone.
    pub fn from_weak(weak: &WeakRef<T>) -> Self {
        match weak.ptr() {
            Some(ptr) => {
                // SAFETY: `WeakRef::ptr` only yields live objects.
                Self::from_object(unsafe { ptr.as_ref() })
            }
            None => Self::null(),
        }
    }

    /// The held pointer, without touching any count.
    pub fn ptr(&self) -> Option<NonNull<T>> {
        self.ptr
    }

    /// The held pointer, or null.
    pub fn as_ptr(&self) -> *const T {
        self.ptr.map_or(ptr::null(), |p| p.as_ptr().cast_const())
    }

    pub fn get(&self) -> Option<&T> {
        // SAFETY: this handle holds a strong count (or the object is 'static),
        // so the object outlives the borrow of `self`.
        self.ptr.map(|p| unsafe { p.as_ref() })
    }

    pub fn is_set(&self) -> bool {
        self.ptr.is_some()
    }

    /// The object's counter, or `None` when unset or not counter-managed.
    pub fn counter(&self) -> Option<&ReferenceCounter<T>> {
        let counter = attached_counter(self.get()?)?;
        // SAFETY: the counter outlives every strong handle on its object.
        Some(unsafe { counter.as_ref() })
    }

    pub fn strong_count(&self) -> usize {
        self.counter().map_or(0, ReferenceCounter::strong_count)
    }

    pub fn weak_count(&self) -> usize {
        self.counter().map_or(0, ReferenceCounter::weak_count)
    }

    pub fn downgrade(&self) -> WeakRef<T> {
        WeakRef::from(self)
    }

    /// Whether both handles are set and point at the same object.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        matches!((self.ptr, other.ptr), (Some(a), Some(b)) if a == b)
    }

    /// Re-points this handle at `other`'s object.
    ///
    /// Assigning the object this handle already holds changes nothing.
    pub fn assign(&mut self, other: &Self) {
        if self.ptr == other.ptr {
            return;
        }
        let next = other.clone();
        self.reset();
        *self = next;
    }

    /// Releases this handle's strong count and unsets it.
    ///
    /// Releasing the last strong handle drops the object. The counter is freed
    /// alongside it when no weak handle remains; otherwise it is marked deleted
    /// and left to the weak handles.
    pub fn reset(&mut self) {
        let Some(ptr) = self.ptr.take() else {
            return;
        };
        // SAFETY: the strong count held until now kept the object alive.
        let object = unsafe { ptr.as_ref() };
        let Some(counter_ptr) = attached_counter(object) else {
            return;
        };
        // SAFETY: attached slots point at live counters.
        let counter = unsafe { counter_ptr.as_ref() };
        if counter.release_strong() > 0 {
            return;
        }

        if counter.weak_count() == 0 {
            object.counter_slot().detach();
            // SAFETY: both counts are zero and the slot no longer points here.
            unsafe { ReferenceCounter::free(counter_ptr) };
        } else {
            counter.mark_deleted();
            // Detach before dropping so nothing reachable from the object's
            // destructor can find the counter through it.
            object.counter_slot().detach();
        }
        tracing::trace!(object = ?ptr, "managed object dropped");
        // SAFETY: counter-managed objects are always leaked boxes, and this
        // was the last strong handle.
        drop(unsafe { Box::from_raw(ptr.as_ptr()) });
    }
}

impl<T: RefCounted> Default for Ref<T> {
    fn default() -> Self {
        Self::null()
    }
}

impl<T: RefCounted> Clone for Ref<T> {
    fn clone(&self) -> Self {
        match self.get() {
            Some(object) if object.counter_slot().is_attached() => Self::from_object(object),
            // Uncounted 'static object.
            Some(_) => Self {
                ptr: self.ptr,
                _owns: PhantomData,
            },
            None => Self::null(),
        }
    }
}

impl<T: RefCounted> Drop for Ref<T> {
    fn drop(&mut self) {
        self.reset();
    }
}

impl<T: RefCounted> From<&WeakRef<T>> for Ref<T> {
    fn from(weak: &WeakRef<T>) -> Self {
        Self::from_weak(weak)
    }
}

/// Two handles are equal only if both are set and alias the same object.
impl<T: RefCounted> PartialEq for Ref<T> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl<T: RefCounted> fmt::Debug for Ref<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ref")
            .field("ptr", &self.as_ptr())
            .field("counter", &self.counter())
            .finish()
    }
}

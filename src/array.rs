use core::alloc::Layout;
use core::fmt::Debug;
use core::iter::FusedIterator;
use core::marker::PhantomData;
use core::ops::Deref;
use core::ops::DerefMut;
use core::ptr::NonNull;

use crate::allocator::Allocator;
use crate::allocator::Global;
use crate::error::TryReserveError;
use crate::error::infallible;
use crate::type_info::TypeInfo;

/// The first allocation holds about this many bytes of elements.
const MIN_INITIAL_BYTES: usize = 64;

/// Untyped growable buffer of `len` values described by a [`TypeInfo`].
///
/// Dropping it frees the buffer without dropping values.
struct RawArray<A: Allocator> {
    ptr: NonNull<u8>,
    len: usize,
    capacity: usize,
    layout: Layout,
    alloc: A,
}

impl<A: Allocator> Drop for RawArray<A> {
    fn drop(&mut self) {
        self.release_buffer();
    }
}

impl<A: Allocator> RawArray<A> {
    const fn new_in(dangling: NonNull<u8>, alloc: A) -> Self {
        Self {
            ptr: dangling,
            len: 0,
            capacity: 0,
            layout: Layout::new::<()>(),
            alloc,
        }
    }

    #[inline(always)]
    fn capacity(&self, info: &TypeInfo) -> usize {
        if info.size() == 0 {
            usize::MAX
        } else {
            self.capacity
        }
    }

    #[inline(always)]
    fn slot(&self, info: &TypeInfo, index: usize) -> *mut u8 {
        // SAFETY: callers stay within `0..=capacity`, which lies inside the
        // allocation or one past its end. Zero-sized values never offset.
        unsafe { self.ptr.as_ptr().add(index * info.size()) }
    }

    /// Moves the values into a buffer of exactly `new_capacity` slots.
    fn try_resize(&mut self, info: &TypeInfo, new_capacity: usize) -> Result<(), TryReserveError> {
        debug_assert!(new_capacity >= self.len);
        if info.size() == 0 {
            return Ok(());
        }
        if new_capacity == 0 {
            self.release_buffer();
            self.ptr = info.dangling();
            return Ok(());
        }

        let layout = info.array_layout(new_capacity)?;
        // SAFETY: element size and capacity are both nonzero.
        let buffer = unsafe { self.alloc.allocate(layout) };
        let buffer = NonNull::new(buffer).ok_or(TryReserveError::AllocError { layout })?;

        trace_event!(
            trace,
            old_capacity = self.capacity,
            new_capacity,
            bytes = layout.size(),
            "array resize"
        );

        // SAFETY: the new buffer holds `new_capacity >= len` slots and does not
        // overlap the old one.
        unsafe { info.move_range(buffer.as_ptr(), self.ptr.as_ptr(), self.len) };
        self.release_buffer();
        self.ptr = buffer;
        self.capacity = new_capacity;
        self.layout = layout;
        Ok(())
    }

    /// Doubles the capacity, starting from roughly 64 bytes.
    #[cold]
    #[inline(never)]
    fn grow_one(&mut self, info: &TypeInfo) {
        let new_capacity = if info.size() == 0 {
            Err(TryReserveError::CapacityOverflow)
        } else if self.capacity == 0 {
            Ok((MIN_INITIAL_BYTES / info.size()).max(1))
        } else {
            self.capacity
                .checked_mul(2)
                .ok_or(TryReserveError::CapacityOverflow)
        };
        infallible(new_capacity.and_then(|capacity| self.try_resize(info, capacity)));
    }

    fn try_reserve(&mut self, info: &TypeInfo, additional: usize) -> Result<(), TryReserveError> {
        let target = self
            .len
            .checked_add(additional)
            .ok_or(TryReserveError::CapacityOverflow)?;
        if target <= self.capacity(info) {
            return Ok(());
        }

        let new_capacity = target.max(self.capacity.saturating_mul(2));
        let result = self.try_resize(info, new_capacity);
        if let Err(_error) = &result {
            trace_event!(debug, error = %_error, requested = target, "array reservation failed");
        }
        result
    }

    fn shrink_to_fit(&mut self, info: &TypeInfo) {
        if info.size() != 0 && self.len < self.capacity {
            trace_event!(debug, from = self.capacity, to = self.len, "shrinking array");
            infallible(self.try_resize(info, self.len));
        }
    }

    fn truncate(&mut self, info: &TypeInfo, len: usize) {
        if len >= self.len {
            return;
        }
        let dropped = self.len - len;
        // Shorten first so a panicking destructor cannot cause a double drop.
        self.len = len;
        // SAFETY: slots `len..len + dropped` were initialized and are no longer
        // counted.
        unsafe { info.destruct_range(self.slot(info, len), dropped) };
    }

    fn reset(&mut self, info: &TypeInfo) {
        self.truncate(info, 0);
        if self.capacity != 0 {
            trace_event!(debug, bytes = self.layout.size(), "releasing array");
        }
        self.release_buffer();
        self.ptr = info.dangling();
    }

    /// Frees the buffer, leaving `ptr` dangling. Values are not dropped.
    fn release_buffer(&mut self) {
        if self.capacity != 0 {
            self.capacity = 0;
            let layout = core::mem::replace(&mut self.layout, Layout::new::<()>());
            // SAFETY: the buffer came from `self.alloc` with `layout`.
            unsafe { self.alloc.deallocate(self.ptr.as_ptr(), layout) };
        }
    }

    /// Replaces the contents with clones of `src`'s values.
    ///
    /// The buffer is kept when both arrays share an allocator and it is big
    /// enough; otherwise it is released and `src`'s allocator adopted.
    fn clone_from_raw(&mut self, info: &TypeInfo, src: &Self)
    where
        A: Clone,
    {
        if self.alloc.is_same(&src.alloc) {
            self.truncate(info, 0);
        } else {
            self.reset(info);
            self.alloc = src.alloc.clone();
        }

        if self.capacity(info) < src.len {
            infallible(self.try_resize(info, src.len));
        }

        // SAFETY: the destination holds at least `src.len` free slots and the
        // source values are initialized. A panicking clone drops what was
        // written so far, and `len` is only set afterwards.
        unsafe { info.copy_range(self.ptr.as_ptr(), src.ptr.as_ptr(), src.len) };
        self.len = src.len;
    }
}

/// A dense, growable array with an injectable allocator.
///
/// Growth doubles the capacity; the first allocation holds about 64 bytes of
/// elements (at least one). Zero-sized elements never allocate.
///
/// # Examples
///
/// ```rust
/// use rh_hash::Array;
///
/// let mut array = Array::new();
/// array.push(1u32);
/// array.push(2);
/// array.push(3);
///
/// assert_eq!(array.swap_remove(0), 1);
/// assert_eq!(&array[..], &[3, 2]);
/// assert_eq!(array.capacity(), 16);
/// ```
pub struct Array<T, A: Allocator = Global> {
    raw: RawArray<A>,
    _phantom: PhantomData<T>,
}

// SAFETY: the array owns its values and buffer exclusively.
unsafe impl<T: Send, A: Allocator + Send> Send for Array<T, A> {}
// SAFETY: shared access only hands out shared references to values.
unsafe impl<T: Sync, A: Allocator + Sync> Sync for Array<T, A> {}

impl<T, A: Allocator> Drop for Array<T, A> {
    fn drop(&mut self) {
        self.raw.truncate(&Self::INFO, 0);
    }
}

impl<T> Array<T> {
    /// Creates an empty array without allocating.
    pub const fn new() -> Self {
        Self::new_in(Global)
    }

    /// Creates an array with room for at least `capacity` elements.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_in(capacity, Global)
    }
}

impl<T> Default for Array<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone, A: Allocator> Array<T, A> {
    const CLONE_INFO: TypeInfo = TypeInfo::cloneable::<T>();
}

impl<T, A: Allocator> Array<T, A> {
    const INFO: TypeInfo = TypeInfo::of::<T>();

    /// Creates an empty array that allocates from `alloc`.
    pub const fn new_in(alloc: A) -> Self {
        Self {
            raw: RawArray::new_in(NonNull::<T>::dangling().cast(), alloc),
            _phantom: PhantomData,
        }
    }

    /// Creates an array with room for at least `capacity` elements,
    /// allocating from `alloc`.
    pub fn with_capacity_in(capacity: usize, alloc: A) -> Self {
        let mut array = Self::new_in(alloc);
        array.reserve(capacity);
        array
    }

    /// Returns a reference to the array's allocator.
    pub fn allocator(&self) -> &A {
        &self.raw.alloc
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.raw.len
    }

    /// Returns `true` if the array holds no elements.
    pub fn is_empty(&self) -> bool {
        self.raw.len == 0
    }

    /// Number of elements the array can hold without reallocating.
    ///
    /// Always `usize::MAX` for zero-sized elements.
    pub fn capacity(&self) -> usize {
        self.raw.capacity(&Self::INFO)
    }

    /// The elements as a slice.
    pub fn as_slice(&self) -> &[T] {
        // SAFETY: `ptr` is aligned and non-null, and `0..len` is initialized.
        unsafe { core::slice::from_raw_parts(self.raw.ptr.as_ptr().cast(), self.raw.len) }
    }

    /// The elements as a mutable slice.
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        // SAFETY: as in `as_slice`, with exclusive access.
        unsafe { core::slice::from_raw_parts_mut(self.raw.ptr.as_ptr().cast(), self.raw.len) }
    }

    /// Appends an element, growing the buffer if it is full.
    ///
    /// # Panics
    ///
    /// Panics with "capacity overflow" if the capacity cannot be doubled.
    pub fn push(&mut self, value: T) {
        if self.raw.len == self.capacity() {
            self.raw.grow_one(&Self::INFO);
        }
        // SAFETY: `len < capacity`, so the slot is inside the buffer and free.
        unsafe { self.raw.slot(&Self::INFO, self.raw.len).cast::<T>().write(value) };
        self.raw.len += 1;
    }

    /// Removes the last element and returns it.
    pub fn pop(&mut self) -> Option<T> {
        if self.raw.len == 0 {
            return None;
        }
        self.raw.len -= 1;
        // SAFETY: the slot at the old `len - 1` is initialized and no longer
        // counted.
        Some(unsafe { self.raw.slot(&Self::INFO, self.raw.len).cast::<T>().read() })
    }

    /// Removes the element at `index` and returns it, moving the last element
    /// into its place. Does not preserve order.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len()`.
    pub fn swap_remove(&mut self, index: usize) -> T {
        let len = self.raw.len;
        assert!(
            index < len,
            "swap_remove index (is {index}) should be < len (is {len})"
        );

        let last = len - 1;
        // SAFETY: `index` and `last` are initialized. After the read the hole at
        // `index` is refilled from `last`, which then stops being counted.
        unsafe {
            let value = self.raw.slot(&Self::INFO, index).cast::<T>().read();
            if index != last {
                Self::INFO.move_range(
                    self.raw.slot(&Self::INFO, index),
                    self.raw.slot(&Self::INFO, last),
                    1,
                );
            }
            self.raw.len = last;
            value
        }
    }

    /// Drops every element past `len`.
    pub fn truncate(&mut self, len: usize) {
        self.raw.truncate(&Self::INFO, len);
    }

    /// Drops every element, keeping the allocation.
    pub fn clear(&mut self) {
        self.raw.truncate(&Self::INFO, 0);
    }

    /// Drops every element and frees the allocation.
    pub fn reset(&mut self) {
        self.raw.reset(&Self::INFO);
    }

    /// Reserves capacity for at least `additional` more elements.
    ///
    /// # Panics
    ///
    /// Panics if the capacity overflows and calls the allocation error handler
    /// if the allocator fails.
    pub fn reserve(&mut self, additional: usize) {
        infallible(self.raw.try_reserve(&Self::INFO, additional));
    }

    /// Reserves capacity for at least `additional` more elements, reporting
    /// failure instead of panicking.
    pub fn try_reserve(&mut self, additional: usize) -> Result<(), TryReserveError> {
        self.raw.try_reserve(&Self::INFO, additional)
    }

    /// Shrinks the capacity to the length. An empty array frees its buffer.
    pub fn shrink_to_fit(&mut self) {
        self.raw.shrink_to_fit(&Self::INFO);
    }
}

impl<T, A: Allocator> Deref for Array<T, A> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T, A: Allocator> DerefMut for Array<T, A> {
    fn deref_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

impl<T, A> Clone for Array<T, A>
where
    T: Clone,
    A: Allocator + Clone,
{
    fn clone(&self) -> Self {
        let mut array = Self::new_in(self.raw.alloc.clone());
        array.raw.clone_from_raw(&Self::CLONE_INFO, &self.raw);
        array
    }

    /// Reuses the existing buffer when both arrays share an allocator and it
    /// is large enough.
    fn clone_from(&mut self, source: &Self) {
        self.raw.clone_from_raw(&Self::CLONE_INFO, &source.raw);
    }
}

impl<T: PartialEq, A: Allocator, B: Allocator> PartialEq<Array<T, B>> for Array<T, A> {
    fn eq(&self, other: &Array<T, B>) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<T: Eq, A: Allocator> Eq for Array<T, A> {}

impl<T: Debug, A: Allocator> Debug for Array<T, A> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T> FromIterator<T> for Array<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut array = Self::new();
        array.extend(iter);
        array
    }
}

impl<T, A: Allocator> Extend<T> for Array<T, A> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        let iter = iter.into_iter();
        self.reserve(iter.size_hint().0);
        for value in iter {
            self.push(value);
        }
    }
}

impl<'a, T, A: Allocator> IntoIterator for &'a Array<T, A> {
    type Item = &'a T;
    type IntoIter = core::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, T, A: Allocator> IntoIterator for &'a mut Array<T, A> {
    type Item = &'a mut T;
    type IntoIter = core::slice::IterMut<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

impl<T, A: Allocator> IntoIterator for Array<T, A> {
    type Item = T;
    type IntoIter = IntoIter<T, A>;

    fn into_iter(mut self) -> Self::IntoIter {
        let end = core::mem::replace(&mut self.raw.len, 0);
        IntoIter {
            array: self,
            next: 0,
            end,
        }
    }
}

/// An owning iterator over the elements of an [`Array`].
pub struct IntoIter<T, A: Allocator = Global> {
    array: Array<T, A>,
    next: usize,
    end: usize,
}

impl<T, A: Allocator> Iterator for IntoIter<T, A> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        if self.next == self.end {
            return None;
        }
        // SAFETY: slots `next..end` are initialized and owned by the iterator;
        // each is read once.
        let value = unsafe {
            self.array
                .raw
                .slot(&Array::<T, A>::INFO, self.next)
                .cast::<T>()
                .read()
        };
        self.next += 1;
        Some(value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.end - self.next;
        (remaining, Some(remaining))
    }
}

impl<T, A: Allocator> Drop for IntoIter<T, A> {
    fn drop(&mut self) {
        let start = core::mem::replace(&mut self.next, self.end);
        // SAFETY: the unread slots are initialized; the array frees the buffer
        // afterwards.
        unsafe {
            Array::<T, A>::INFO.destruct_range(
                self.array.raw.slot(&Array::<T, A>::INFO, start),
                self.end - start,
            );
        }
    }
}

impl<T, A: Allocator> ExactSizeIterator for IntoIter<T, A> {}
impl<T, A: Allocator> FusedIterator for IntoIter<T, A> {}

use core::alloc::Layout;
use core::mem;
use core::ptr;
use core::ptr::NonNull;

use crate::error::TryReserveError;

type CloneRangeFn = unsafe fn(dst: *mut u8, src: *const u8, count: usize);
type DropRangeFn = unsafe fn(ptr: *mut u8, count: usize);

/// Per-type descriptor used by the untyped buffer manager.
///
/// Carries the element size and alignment plus the range operations needed to
/// clone, move and destroy runs of values living in raw memory. The typed
/// containers build one as an associated constant, so the descriptor for a
/// given `T` is always the same value.
#[derive(Clone, Copy)]
pub struct TypeInfo {
    size: usize,
    align: usize,
    clone_range: Option<CloneRangeFn>,
    drop_range: Option<DropRangeFn>,
}

impl core::fmt::Debug for TypeInfo {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TypeInfo")
            .field("size", &self.size)
            .field("align", &self.align)
            .field("cloneable", &self.clone_range.is_some())
            .field("needs_drop", &self.drop_range.is_some())
            .finish()
    }
}

impl TypeInfo {
    /// Descriptor for a type that can be moved and dropped but not cloned.
    pub const fn of<T>() -> Self {
        Self {
            size: mem::size_of::<T>(),
            align: mem::align_of::<T>(),
            clone_range: None,
            drop_range: if mem::needs_drop::<T>() {
                Some(drop_range::<T>)
            } else {
                None
            },
        }
    }

    /// Descriptor for a `Clone` type; `copy_range` runs `T::clone`.
    pub const fn cloneable<T: Clone>() -> Self {
        Self {
            clone_range: Some(clone_range::<T>),
            ..Self::of::<T>()
        }
    }

    /// Descriptor for a bitwise-copyable type; `copy_range` is a `memcpy`.
    pub const fn trivial<T: Copy>() -> Self {
        Self {
            clone_range: Some(memcpy_range::<T>),
            ..Self::of::<T>()
        }
    }

    /// Element size in bytes.
    #[inline(always)]
    pub const fn size(&self) -> usize {
        self.size
    }

    /// Element alignment in bytes.
    #[inline(always)]
    pub const fn align(&self) -> usize {
        self.align
    }

    /// Whether `destruct_range` has any work to do.
    #[inline(always)]
    pub const fn needs_drop(&self) -> bool {
        self.drop_range.is_some()
    }

    /// Whether `copy_range` is available.
    #[inline(always)]
    pub const fn is_cloneable(&self) -> bool {
        self.clone_range.is_some()
    }

    /// Layout of an array of `count` elements.
    pub fn array_layout(&self, count: usize) -> Result<Layout, TryReserveError> {
        let bytes = self
            .size
            .checked_mul(count)
            .ok_or(TryReserveError::CapacityOverflow)?;
        Layout::from_size_align(bytes, self.align).map_err(|_| TryReserveError::CapacityOverflow)
    }

    /// A well aligned, non-null pointer for zero-length value regions.
    #[inline]
    pub fn dangling(&self) -> NonNull<u8> {
        // SAFETY: alignments are never zero.
        unsafe { NonNull::new_unchecked(ptr::without_provenance_mut(self.align)) }
    }

    /// Clone-constructs `count` values from `src` into `dst`.
    ///
    /// If a clone panics, the values already written to `dst` are dropped
    /// before unwinding continues.
    ///
    /// # Panics
    ///
    /// Panics if the descriptor was built with [`TypeInfo::of`].
    ///
    /// # Safety
    ///
    /// `src` must hold `count` initialized values of the described type, `dst`
    /// must be valid for `count` writes and the regions must not overlap.
    #[inline]
    pub unsafe fn copy_range(&self, dst: *mut u8, src: *const u8, count: usize) {
        let Some(clone_range) = self.clone_range else {
            panic!("copy_range called on a descriptor without a clone operation");
        };
        // SAFETY: forwarded contract.
        unsafe { clone_range(dst, src, count) }
    }

    /// Moves `count` values from `src` to `dst`.
    ///
    /// Rust moves are bitwise, so this is a plain copy. Afterwards the values
    /// at `src` are logically uninitialized and must not be dropped.
    ///
    /// # Safety
    ///
    /// `src` must hold `count` initialized values, `dst` must be valid for
    /// `count` writes and the regions must not overlap.
    #[inline]
    pub unsafe fn move_range(&self, dst: *mut u8, src: *const u8, count: usize) {
        // SAFETY: forwarded contract; `size * count` fits in the allocation
        // both regions belong to.
        unsafe { ptr::copy_nonoverlapping(src, dst, self.size * count) }
    }

    /// Drops `count` values in place starting at `ptr`.
    ///
    /// # Safety
    ///
    /// `ptr` must hold `count` initialized values; they are uninitialized
    /// afterwards.
    #[inline]
    pub unsafe fn destruct_range(&self, ptr: *mut u8, count: usize) {
        if let Some(drop_range) = self.drop_range
            && count > 0
        {
            // SAFETY: forwarded contract.
            unsafe { drop_range(ptr, count) }
        }
    }
}

unsafe fn drop_range<T>(ptr: *mut u8, count: usize) {
    // SAFETY: the caller guarantees `count` initialized values of `T`.
    unsafe { ptr::drop_in_place(ptr::slice_from_raw_parts_mut(ptr.cast::<T>(), count)) }
}

unsafe fn memcpy_range<T: Copy>(dst: *mut u8, src: *const u8, count: usize) {
    // SAFETY: the caller guarantees both regions hold `count` slots of `T`.
    unsafe { ptr::copy_nonoverlapping(src.cast::<T>(), dst.cast::<T>(), count) }
}

unsafe fn clone_range<T: Clone>(dst: *mut u8, src: *const u8, count: usize) {
    struct Guard<T> {
        dst: *mut T,
        written: usize,
    }

    impl<T> Drop for Guard<T> {
        fn drop(&mut self) {
            // SAFETY: exactly `written` values have been initialized.
            unsafe {
                ptr::drop_in_place(ptr::slice_from_raw_parts_mut(self.dst, self.written));
            }
        }
    }

    let src = src.cast::<T>();
    let mut guard = Guard {
        dst: dst.cast::<T>(),
        written: 0,
    };

    while guard.written < count {
        // SAFETY: `written < count`, both regions hold `count` slots.
        unsafe {
            let value = (*src.add(guard.written)).clone();
            guard.dst.add(guard.written).write(value);
        }
        guard.written += 1;
    }

    mem::forget(guard);
}

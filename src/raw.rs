use core::alloc::Layout;
use core::ptr;
use core::ptr::NonNull;

use crate::allocator::Allocator;
use crate::error::TryReserveError;
use crate::error::infallible;
use crate::index::Insert;
use crate::index::Probe;
use crate::index::RawIndex;
use crate::index::Sizing;
use crate::type_info::TypeInfo;

/// Metadata stays 8-byte aligned; values follow at their own alignment.
const METADATA_ALIGN: usize = 8;

#[derive(Debug, Clone, Copy)]
struct DataLayout {
    layout: Layout,
    values_offset: usize,
}

impl DataLayout {
    fn new(info: &TypeInfo, sizing: &Sizing) -> Result<Self, TryReserveError> {
        let metadata = Layout::from_size_align(sizing.alloc_size(), METADATA_ALIGN)
            .map_err(|_| TryReserveError::CapacityOverflow)?;
        let values = info.array_layout(sizing.capacity())?;
        let (layout, values_offset) = metadata
            .extend(values)
            .map_err(|_| TryReserveError::CapacityOverflow)?;

        Ok(DataLayout {
            layout,
            values_offset,
        })
    }
}

/// Untyped storage behind the hash containers.
///
/// One allocation holds the index metadata followed by a dense array of
/// `len()` values described by a [`TypeInfo`]. Every method that touches
/// values takes the descriptor; callers must always pass the one for the type
/// they store.
///
/// Dropping a `RawTable` frees the buffer but never drops values. The typed
/// owner destroys them first.
pub(crate) struct RawTable<A: Allocator> {
    index: RawIndex,
    values: NonNull<u8>,
    layout: Layout,
    alloc: A,
}

impl<A: Allocator> Drop for RawTable<A> {
    fn drop(&mut self) {
        self.free_buffer();
    }
}

impl<A: Allocator> RawTable<A> {
    pub(crate) const fn new_in(alloc: A) -> Self {
        Self {
            index: RawIndex::new(),
            values: NonNull::dangling(),
            layout: Layout::new::<()>(),
            alloc,
        }
    }

    #[inline(always)]
    pub(crate) fn index(&self) -> &RawIndex {
        &self.index
    }

    #[inline(always)]
    pub(crate) fn len(&self) -> usize {
        self.index.len()
    }

    #[inline(always)]
    pub(crate) fn capacity(&self) -> usize {
        self.index.capacity()
    }

    pub(crate) fn allocator(&self) -> &A {
        &self.alloc
    }

    pub(crate) fn set_load_factor(&mut self, load_factor: f32) {
        self.index.set_load_factor(load_factor);
    }

    /// Bytes held by the combined buffer.
    pub(crate) fn allocation_size(&self) -> usize {
        self.layout.size()
    }

    /// Pointer to the value slot at `index`.
    ///
    /// Slots at or past `len()` are uninitialized.
    #[inline(always)]
    pub(crate) fn value_ptr(&self, info: &TypeInfo, index: usize) -> *mut u8 {
        debug_assert!(index <= self.capacity());
        // SAFETY: `index <= capacity`, so the offset stays inside the value
        // region or one past its end.
        unsafe { self.values.as_ptr().add(index * info.size()) }
    }

    /// Start of the dense value array.
    #[inline(always)]
    pub(crate) fn values(&self) -> NonNull<u8> {
        self.values
    }

    /// Advances `probe` to the next candidate index.
    #[inline(always)]
    pub(crate) fn find(&self, probe: &mut Probe) -> Option<usize> {
        self.index.find(probe).map(|ix| ix as usize)
    }

    /// Grows until at least one more element fits.
    #[cold]
    #[inline(never)]
    pub(crate) fn grow(&mut self, info: &TypeInfo, min_initial_entries: usize) {
        infallible(self.try_grow(info, min_initial_entries));
    }

    pub(crate) fn try_grow(
        &mut self,
        info: &TypeInfo,
        min_initial_entries: usize,
    ) -> Result<(), TryReserveError> {
        let sizing = self.index.grow(min_initial_entries)?;
        self.rehash_into(info, sizing)
    }

    pub(crate) fn try_reserve(
        &mut self,
        info: &TypeInfo,
        additional: usize,
    ) -> Result<(), TryReserveError> {
        let target = self
            .len()
            .checked_add(additional)
            .ok_or(TryReserveError::CapacityOverflow)?;
        if target <= self.capacity() {
            return Ok(());
        }

        let result = self
            .index
            .resize_for(target)
            .and_then(|sizing| self.rehash_into(info, sizing));
        if let Err(_error) = &result {
            trace_event!(debug, error = %_error, requested = target, "reservation failed");
        }
        result
    }

    pub(crate) fn shrink_to_fit(&mut self, info: &TypeInfo) {
        if self.len() == 0 {
            if self.index.is_allocated() {
                trace_event!(debug, bytes = self.layout.size(), "releasing empty table");
            }
            self.reset(info);
            return;
        }

        let sizing = infallible(self.index.resize_for(self.len()));
        if sizing.capacity() < self.capacity() {
            trace_event!(
                debug,
                from = self.capacity(),
                to = sizing.capacity(),
                "shrinking table"
            );
            infallible(self.rehash_into(info, sizing));
        }
    }

    /// Moves metadata and values into a fresh buffer described by `sizing`
    /// and frees the old one.
    fn rehash_into(&mut self, info: &TypeInfo, sizing: Sizing) -> Result<(), TryReserveError> {
        let data = DataLayout::new(info, &sizing)?;

        // SAFETY: the metadata region is never empty, so the layout has a
        // non-zero size.
        let buffer = unsafe { self.alloc.allocate(data.layout) };
        let buffer = NonNull::new(buffer).ok_or(TryReserveError::AllocError {
            layout: data.layout,
        })?;

        trace_event!(
            trace,
            old_capacity = self.capacity(),
            new_capacity = sizing.capacity(),
            num_entries = sizing.num_entries(),
            bytes = data.layout.size(),
            "rehash"
        );

        // SAFETY: the new buffer is `data.layout` bytes, its metadata region
        // spans `alloc_size` bytes and is initialized by the `write_bytes`
        // below. The value region starts at `values_offset`, is aligned for
        // the value type and holds `sizing.capacity() >= len()` slots. The old
        // and new buffers are distinct allocations.
        unsafe {
            ptr::write_bytes(buffer.as_ptr(), 0, sizing.alloc_size());

            let values = buffer.add(data.values_offset);
            info.move_range(values.as_ptr(), self.values.as_ptr(), self.len());

            let old_buffer = self.index.rehash(&sizing, buffer);
            let old_layout = core::mem::replace(&mut self.layout, data.layout);
            self.values = values;

            if let Some(old_buffer) = old_buffer {
                self.alloc.deallocate(old_buffer.as_ptr(), old_layout);
            }
        }

        Ok(())
    }

    /// Adds an entry for a value already written to `value_ptr(len())` and
    /// returns its dense index.
    ///
    /// `probe` either starts fresh or resumes where a lookup for the same
    /// value gave up, skipping the buckets it already rejected.
    ///
    /// # Safety
    ///
    /// `len() < capacity()` must hold and the slot at `len()` must be
    /// initialized. A resumed probe must come from the current buffer with no
    /// mutation since.
    #[inline]
    pub(crate) unsafe fn commit_insert(&mut self, mut probe: Probe) -> usize {
        loop {
            // SAFETY: the caller guarantees a free slot.
            if let Insert::Inserted(index) = unsafe { self.index.insert(&mut probe) } {
                return index as usize;
            }
        }
    }

    /// Moves the value the probe stopped at into `out` and deletes it.
    ///
    /// # Safety
    ///
    /// `probe` must have just produced the candidate `index` from
    /// [`find`](Self::find), and `out` must be valid for one value write.
    pub(crate) unsafe fn remove_found(
        &mut self,
        info: &TypeInfo,
        probe: &Probe,
        index: usize,
        out: *mut u8,
    ) {
        // SAFETY: `index < len()` holds an initialized value; the probe
        // contract is forwarded.
        unsafe {
            info.move_range(out, self.value_ptr(info, index), 1);
            let relocation = self.index.remove(probe);
            self.apply_relocation(info, relocation);
        }
    }

    /// Moves the value at dense `index` into `out` and deletes it.
    ///
    /// # Safety
    ///
    /// `out` must be valid for one value write.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len()`.
    pub(crate) unsafe fn remove_index(&mut self, info: &TypeInfo, index: usize, out: *mut u8) {
        assert!(
            index < self.len(),
            "swap_remove_index: index {index} out of bounds for length {}",
            self.len()
        );
        // SAFETY: bounds checked above.
        unsafe {
            info.move_range(out, self.value_ptr(info, index), 1);
            let relocation = self.index.remove_index(index);
            self.apply_relocation(info, relocation);
        }
    }

    #[inline(always)]
    unsafe fn apply_relocation(
        &mut self,
        info: &TypeInfo,
        relocation: Option<crate::index::Relocation>,
    ) {
        if let Some(relocation) = relocation {
            // SAFETY: `src` was the last initialized slot and `dst` was just
            // vacated, both inside the value region.
            unsafe {
                info.move_range(
                    self.value_ptr(info, relocation.dst as usize),
                    self.value_ptr(info, relocation.src as usize),
                    1,
                );
            }
        }
    }

    /// Forgets every entry without running destructors and returns how many
    /// values are left in `0..len` for the caller to take over.
    pub(crate) fn take_all(&mut self) -> usize {
        let len = self.len();
        self.index.clear();
        len
    }

    /// Drops every value, keeping the buffer.
    pub(crate) fn clear(&mut self, info: &TypeInfo) {
        let len = self.take_all();
        // SAFETY: the first `len` slots were initialized and are no longer
        // referenced by the index.
        unsafe { info.destruct_range(self.values.as_ptr(), len) };
    }

    /// Drops every value and releases the buffer.
    pub(crate) fn reset(&mut self, info: &TypeInfo) {
        self.clear(info);
        self.free_buffer();
    }

    fn free_buffer(&mut self) {
        if let Some(buffer) = self.index.reset() {
            let layout = core::mem::replace(&mut self.layout, Layout::new::<()>());
            // SAFETY: the buffer came from `self.alloc` with `layout`.
            unsafe { self.alloc.deallocate(buffer.as_ptr(), layout) };
        }
        self.values = NonNull::dangling();
    }

    /// Replaces the contents with clones of `src`'s values, in the same dense
    /// order.
    ///
    /// The buffer is kept when both tables share an allocator and it is big
    /// enough; otherwise it is released and `src`'s allocator adopted.
    pub(crate) fn clone_from_raw(&mut self, info: &TypeInfo, src: &Self)
    where
        A: Clone,
    {
        if self.alloc.is_same(&src.alloc) {
            self.clear(info);
        } else {
            self.reset(info);
            self.alloc = src.alloc.clone();
        }
        self.index.set_load_factor(src.index.load_factor());

        if self.capacity() < src.len() {
            let sizing = infallible(self.index.resize_for(src.len()));
            infallible(self.rehash_into(info, sizing));
        }

        for i in 0..src.len() {
            // SAFETY: slot `i == len()` is free since `capacity >= src.len()`;
            // the source slot is initialized. The entry is only added once the
            // clone succeeded.
            unsafe {
                info.copy_range(self.value_ptr(info, i), src.value_ptr(info, i), 1);
                self.commit_insert(Probe::new(src.index.hash_at(i)));
            }
        }
    }

    /// A copy of `src` in a new buffer from a clone of its allocator.
    pub(crate) fn clone_raw(info: &TypeInfo, src: &Self) -> Self
    where
        A: Clone,
    {
        let mut table = Self::new_in(src.alloc.clone());
        table.clone_from_raw(info, src);
        table
    }
}

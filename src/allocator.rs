use core::alloc::Layout;

/// Allocation capability injected into every container.
///
/// All buffer ownership flows through an allocator: containers never call the
/// global allocator directly. Two allocators that report [`is_same`] can free
/// each other's memory, which lets `clone_from` reuse the destination buffer
/// instead of reallocating.
///
/// [`is_same`]: Allocator::is_same
///
/// # Safety
///
/// Memory returned by `allocate` must stay valid until it is passed back to
/// `deallocate` on the same allocator, or on one that `is_same` reports equal.
pub unsafe trait Allocator {
    /// Allocates a block of memory matching `layout`.
    ///
    /// Returns a null pointer on failure.
    ///
    /// # Safety
    ///
    /// `layout` must have a non-zero size.
    unsafe fn allocate(&self, layout: Layout) -> *mut u8;

    /// Deallocates a block of memory.
    ///
    /// # Safety
    ///
    /// `ptr` must have been returned by `allocate` with the same `layout`.
    unsafe fn deallocate(&self, ptr: *mut u8, layout: Layout);

    /// Returns true if memory from `self` may be released through `other` and
    /// vice versa.
    fn is_same(&self, other: &Self) -> bool;
}

/// The platform allocator, backed by the `alloc` crate's global allocator.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Global;

// SAFETY: forwards to the global allocator, which upholds the contract.
unsafe impl Allocator for Global {
    #[inline]
    unsafe fn allocate(&self, layout: Layout) -> *mut u8 {
        // SAFETY: the caller guarantees a non-zero size.
        unsafe { alloc::alloc::alloc(layout) }
    }

    #[inline]
    unsafe fn deallocate(&self, ptr: *mut u8, layout: Layout) {
        // SAFETY: the caller guarantees `ptr` came from `allocate(layout)`.
        unsafe { alloc::alloc::dealloc(ptr, layout) }
    }

    #[inline]
    fn is_same(&self, _other: &Self) -> bool {
        true
    }
}

// SAFETY: forwards to `A`; identity is the identity of the referenced
// allocator.
unsafe impl<A: Allocator + ?Sized> Allocator for &A {
    #[inline]
    unsafe fn allocate(&self, layout: Layout) -> *mut u8 {
        // SAFETY: forwarded contract.
        unsafe { (**self).allocate(layout) }
    }

    #[inline]
    unsafe fn deallocate(&self, ptr: *mut u8, layout: Layout) {
        // SAFETY: forwarded contract.
        unsafe { (**self).deallocate(ptr, layout) }
    }

    #[inline]
    fn is_same(&self, other: &Self) -> bool {
        (**self).is_same(*other)
    }
}

/// An allocator that counts live allocations and the total number of calls.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct CountingAllocator {
    pub(crate) allocations: core::cell::Cell<usize>,
    pub(crate) deallocations: core::cell::Cell<usize>,
}

#[cfg(test)]
impl CountingAllocator {
    pub(crate) fn live(&self) -> usize {
        self.allocations.get() - self.deallocations.get()
    }
}

#[cfg(test)]
// SAFETY: forwards to `Global`.
unsafe impl Allocator for CountingAllocator {
    unsafe fn allocate(&self, layout: Layout) -> *mut u8 {
        self.allocations.set(self.allocations.get() + 1);
        // SAFETY: forwarded contract.
        unsafe { Global.allocate(layout) }
    }

    unsafe fn deallocate(&self, ptr: *mut u8, layout: Layout) {
        self.deallocations.set(self.deallocations.get() + 1);
        // SAFETY: forwarded contract.
        unsafe { Global.deallocate(ptr, layout) }
    }

    fn is_same(&self, other: &Self) -> bool {
        core::ptr::eq(self, other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_round_trip() {
        let layout = Layout::from_size_align(64, 8).unwrap();
        unsafe {
            let ptr = Global.allocate(layout);
            assert!(!ptr.is_null());
            assert_eq!(ptr as usize % 8, 0);
            ptr.write_bytes(0xAB, 64);
            Global.deallocate(ptr, layout);
        }
    }

    #[test]
    fn reference_identity() {
        let a = CountingAllocator::default();
        let b = CountingAllocator::default();

        assert!((&a).is_same(&&a));
        assert!(!(&a).is_same(&&b));
        assert!(Global.is_same(&Global));
    }

    #[test]
    fn reference_identity_follows_referent() {
        let first = Global;
        let second = Global;
        assert!(<&Global as Allocator>::is_same(&&first, &&second));

        let a = CountingAllocator::default();
        let b = CountingAllocator::default();
        assert!(<&CountingAllocator as Allocator>::is_same(&&a, &&a));
        assert!(!<&CountingAllocator as Allocator>::is_same(&&a, &&b));
    }

    #[test]
    fn counting_tracks_calls() {
        let counter = CountingAllocator::default();
        let layout = Layout::new::<u64>();
        unsafe {
            let ptr = (&counter).allocate(layout);
            assert_eq!(counter.live(), 1);
            (&counter).deallocate(ptr, layout);
        }
        assert_eq!(counter.allocations.get(), 1);
        assert_eq!(counter.live(), 0);
    }
}

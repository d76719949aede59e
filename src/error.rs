use core::alloc::Layout;

use thiserror::Error;

/// The error type for `try_reserve` methods.
#[derive(Error, Clone, Copy, Debug, PartialEq, Eq)]
pub enum TryReserveError {
    /// The computed capacity exceeded what the index can address (2^28
    /// entries) or what a `Layout` can describe.
    #[error("capacity overflow")]
    CapacityOverflow,

    /// The allocator returned an error.
    #[error("memory allocation of {} bytes failed", layout.size())]
    AllocError {
        /// The layout of the allocation request that failed.
        layout: Layout,
    },
}

/// Converts a fallible reservation result into the infallible behavior used by
/// `reserve`, `insert` and friends: overflow panics, allocation failure is
/// routed to the global allocation error handler.
#[inline]
pub(crate) fn infallible<T>(result: Result<T, TryReserveError>) -> T {
    match result {
        Ok(value) => value,
        Err(TryReserveError::CapacityOverflow) => capacity_overflow(),
        Err(TryReserveError::AllocError { layout }) => alloc::alloc::handle_alloc_error(layout),
    }
}

#[cold]
#[inline(never)]
pub(crate) fn capacity_overflow() -> ! {
    panic!("capacity overflow");
}

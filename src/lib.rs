#![warn(missing_docs)]
#![doc = include_str!("../README.md")]
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;
#[cfg(all(test, not(feature = "std")))]
extern crate std;

/// Emits a `tracing` event when the `tracing` feature is enabled.
macro_rules! trace_event {
    ($level:ident, $($arg:tt)+) => {
        #[cfg(feature = "tracing")]
        tracing::$level!($($arg)+);
    };
}

/// The allocation capability injected into every container.
pub mod allocator;

/// A dense growable array over the untyped buffer manager.
pub mod array;

/// Error types for fallible reservations.
pub mod error;

/// Integer mixers, the buffer hash and hasher builders.
pub mod hash;

/// A HashMap implementation using Robin Hood hashing.
///
/// This module provides a `HashMap` that wraps the `HashTable` and provides
/// a standard key-value map interface with configurable hashers.
pub mod hash_map;

/// A hash set implementation using Robin Hood hashing.
///
/// This module provides a `HashSet` that wraps the `HashTable` and provides
/// a standard set interface with configurable hashers.
pub mod hash_set;

pub mod hash_table;

pub mod index;

mod raw;

/// Per-type descriptors for clone, move and drop over raw memory.
pub mod type_info;

#[cfg(test)]
mod hash_map_proptest;

pub use allocator::Allocator;
pub use allocator::Global;
pub use array::Array;
pub use error::TryReserveError;
pub use hash::DefaultHashBuilder;
pub use hash_map::Entry;
pub use hash_map::HashMap;
pub use hash_set::HashSet;
pub use hash_table::HashTable;
pub use type_info::TypeInfo;

//! The Robin Hood hash index.
//!
//! [`RawIndex`] maps 32-bit hashes to dense element indices `0..len`. It owns
//! no value storage and allocates nothing: the caller sizes a buffer with
//! [`RawIndex::grow`] or [`RawIndex::resize_for`], hands it over with
//! [`RawIndex::rehash`] and frees whatever buffer comes back.
//!
//! Lookups are resumable. A [`Probe`] carries the scan position, and every
//! call to [`RawIndex::find`] or [`RawIndex::insert`] stops at the next
//! *potential* match. Comparing the actual keys is the caller's job.
//!
//! ```rust
//! # use core::ptr::NonNull;
//! # use rh_hash::index::{Insert, Probe, RawIndex};
//! let mut index = RawIndex::new();
//! let sizing = index.grow(0).unwrap();
//! let mut buffer = vec![0u64; sizing.alloc_size() / 8];
//! let old = unsafe { index.rehash(&sizing, NonNull::from(&mut buffer[..]).cast()) };
//! assert!(old.is_none());
//!
//! let keys = [10u32, 20, 30];
//! for &key in &keys {
//!     let mut probe = Probe::new(key);
//!     // SAFETY: three elements fit in the default sizing.
//!     let inserted = unsafe { index.insert(&mut probe) };
//!     assert!(matches!(inserted, Insert::Inserted(_)));
//! }
//!
//! let mut probe = Probe::new(20);
//! let found = index.find(&mut probe).map(|ix| keys[ix as usize]);
//! assert_eq!(found, Some(20));
//! ```

use core::fmt::Debug;
use core::ptr::NonNull;

use crate::error::TryReserveError;

/// Entry count used by the first [`RawIndex::grow`] when no minimum is given.
pub const DEFAULT_ENTRY_COUNT: usize = 16;

/// Load factor used while none has been set.
pub const DEFAULT_LOAD_FACTOR: f32 = 0.8;

const MIN_ENTRY_COUNT: usize = 4;
const MAX_ENTRY_COUNT: usize = 1 << 28;

/// Significant hash bits. The top four bits of an entry hold the distance.
const HASH_MASK: u32 = 0x0fff_ffff;
const DISTANCE_SHIFT: u32 = 28;
const CLAMPED: u32 = 15;

/// One bucket of the entries array.
///
/// Bits `[0, N)` hold the dense index, bits `[N, 28)` the matching hash bits
/// and bits `[28, 32)` the scan distance, where 1 is the home bucket and 15
/// means "15 or more, resolve through `hashes`". Zero is an empty bucket.
#[derive(Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
struct Slot(u32);

impl Slot {
    const EMPTY: Slot = Slot(0);

    #[inline(always)]
    fn new(payload: u32, distance: u32) -> Self {
        Slot(payload | distance.min(CLAMPED) << DISTANCE_SHIFT)
    }

    #[inline(always)]
    fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[inline(always)]
    fn distance(self) -> u32 {
        self.0 >> DISTANCE_SHIFT
    }

    #[inline(always)]
    fn index(self, mask: u32) -> u32 {
        self.0 & mask
    }

    /// Hash bits and index, without the distance.
    #[inline(always)]
    fn payload(self) -> u32 {
        self.0 & HASH_MASK
    }

    #[inline(always)]
    fn with_index(self, mask: u32, index: u32) -> Self {
        Slot((self.0 & !mask) | index)
    }

    /// True if the hash bits above `mask` and the clamped distance match.
    #[inline(always)]
    fn matches(self, mask: u32, hash: u32, distance: u32) -> bool {
        (self.0 ^ (hash | distance << DISTANCE_SHIFT)) & !mask == 0
    }
}

/// Scan state shared by [`RawIndex::find`], [`RawIndex::insert`] and
/// [`RawIndex::remove`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Probe {
    hash: u32,
    scan: u32,
}

impl Probe {
    /// Starts a scan for `hash`. Only the low 28 bits are significant.
    #[inline(always)]
    pub fn new(hash: u32) -> Self {
        Self {
            hash: hash & HASH_MASK,
            scan: 0,
        }
    }

    /// The masked hash this probe scans for.
    #[inline(always)]
    pub fn hash(&self) -> u32 {
        self.hash
    }
}

/// Outcome of one [`RawIndex::insert`] step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Insert {
    /// A potential existing match at this dense index. Compare the keys and
    /// call `insert` again with the same probe to continue.
    Candidate(u32),
    /// Nothing matched; the new element was assigned this dense index.
    Inserted(u32),
}

/// A dense-index move the caller has to mirror in its value storage after a
/// removal: the element at `src` now lives at `dst`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Relocation {
    /// The hole left by the removed element.
    pub dst: u32,
    /// The former last index.
    pub src: u32,
}

/// Buffer requirements for the next rehash.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Sizing {
    capacity: usize,
    num_entries: usize,
    alloc_size: usize,
}

impl Sizing {
    /// Element capacity after the rehash.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Length of the entries array after the rehash.
    pub fn num_entries(&self) -> usize {
        self.num_entries
    }

    /// Bytes of metadata (`entries` then `hashes`), a multiple of 8.
    pub fn alloc_size(&self) -> usize {
        self.alloc_size
    }
}

/// Robin Hood open-addressing index over a caller-managed buffer.
///
/// The index never frees memory on its own; dropping it leaks nothing because
/// the buffer belongs to whoever passed it to [`rehash`](Self::rehash).
pub struct RawIndex {
    entries: NonNull<Slot>,
    hashes: NonNull<u32>,
    mask: u32,
    capacity: u32,
    size: u32,
    load_factor: f32,
}

impl Debug for RawIndex {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        struct Slots<'a>(&'a RawIndex);

        impl Debug for Slots<'_> {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                let mask = self.0.mask;
                let mut list = f.debug_list();
                for slot in self.0.entries() {
                    if slot.is_empty() {
                        list.entry(&format_args!("-"));
                    } else {
                        list.entry(&format_args!(
                            "#{} d{} h{:07x}",
                            slot.index(mask),
                            slot.distance(),
                            self.0.hashes()[slot.index(mask) as usize],
                        ));
                    }
                }
                list.finish()
            }
        }

        f.debug_struct("RawIndex")
            .field("size", &self.size)
            .field("capacity", &self.capacity)
            .field("num_entries", &self.num_entries())
            .field("load_factor", &self.load_factor)
            .field("entries", &Slots(self))
            .finish()
    }
}

impl Default for RawIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl RawIndex {
    /// Creates an empty index with no buffer.
    pub const fn new() -> Self {
        Self {
            entries: NonNull::dangling(),
            hashes: NonNull::dangling(),
            mask: u32::MAX,
            capacity: 0,
            size: 0,
            load_factor: 0.0,
        }
    }

    /// Number of elements.
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.size as usize
    }

    /// True if there are no elements.
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Elements that fit before the next rehash.
    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.capacity as usize
    }

    /// Length of the entries array, zero without a buffer.
    #[inline(always)]
    pub fn num_entries(&self) -> usize {
        self.mask.wrapping_add(1) as usize
    }

    /// True once a buffer has been installed by [`rehash`](Self::rehash).
    #[inline(always)]
    pub fn is_allocated(&self) -> bool {
        self.mask != u32::MAX
    }

    /// Bytes of metadata in the current buffer.
    pub fn alloc_size(&self) -> usize {
        metadata_size(self.capacity(), self.num_entries())
    }

    /// The configured load factor, `0.0` meaning the default.
    pub fn load_factor(&self) -> f32 {
        self.load_factor
    }

    /// Sets the load factor used by later sizing calls.
    ///
    /// `0.0` restores the default of 0.8. The current buffer is unaffected
    /// until the next rehash.
    ///
    /// # Panics
    ///
    /// Panics unless `load_factor` is `0.0` or strictly between 0 and 1.
    pub fn set_load_factor(&mut self, load_factor: f32) {
        assert!(
            load_factor == 0.0 || (load_factor > 0.0 && load_factor < 1.0),
            "load factor must be in (0, 1), got {load_factor}"
        );
        self.load_factor = load_factor;
    }

    /// The stored hash of the element at dense index `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len()`.
    #[inline]
    pub fn hash_at(&self, index: usize) -> u32 {
        self.hashes()[..self.len()][index]
    }

    #[inline(always)]
    fn effective_load_factor(&self) -> f64 {
        if self.load_factor == 0.0 {
            f64::from(DEFAULT_LOAD_FACTOR)
        } else {
            f64::from(self.load_factor)
        }
    }

    #[inline(always)]
    fn entries(&self) -> &[Slot] {
        // SAFETY: an allocated index has `mask + 1` initialized slots at
        // `entries`; an unallocated one yields an empty slice over a dangling
        // pointer.
        unsafe { core::slice::from_raw_parts(self.entries.as_ptr(), self.num_entries()) }
    }

    #[inline(always)]
    fn hashes(&self) -> &[u32] {
        // SAFETY: `hashes` has room for `capacity` words. Words at or past
        // `size` may be stale but are always initialized integers because the
        // buffer was handed over as initialized memory.
        unsafe { core::slice::from_raw_parts(self.hashes.as_ptr(), self.capacity()) }
    }

    #[inline(always)]
    fn parts_mut(&mut self) -> (&mut [Slot], &mut [u32]) {
        // SAFETY: the two regions are disjoint (hashes start right after the
        // last slot) and sized as in `entries`/`hashes`.
        unsafe {
            (
                core::slice::from_raw_parts_mut(self.entries.as_ptr(), self.num_entries()),
                core::slice::from_raw_parts_mut(self.hashes.as_ptr(), self.capacity()),
            )
        }
    }

    /// Advances `probe` to the next potential match.
    ///
    /// Returns the dense index of a bucket whose hash bits and clamped
    /// distance agree with the probe, or `None` once a bucket closer to its
    /// home than the probe is reached. Call again with the same probe to skip
    /// a false positive.
    #[inline]
    pub fn find(&self, probe: &mut Probe) -> Option<u32> {
        if self.size == 0 {
            return None;
        }

        let mask = self.mask;
        let entries = self.entries();
        let hashes = self.hashes();
        let mut scan = probe.scan;
        loop {
            let ix = probe.hash.wrapping_add(scan) & mask;
            // SAFETY: the position is reduced by `mask` and there are
            // `mask + 1` entries.
            let slot = unsafe { *entries.get_unchecked(ix as usize) };
            scan += 1;
            let distance = scan.min(CLAMPED);
            if slot.matches(mask, probe.hash, distance)
                && (distance < CLAMPED || resolve_distance(slot, ix, mask, hashes) == scan)
            {
                probe.scan = scan;
                return Some(slot.index(mask));
            }
            // Empty buckets have distance zero and end the scan too.
            if slot.distance() < distance {
                return None;
            }
        }
    }

    /// Advances `probe` like [`find`](Self::find), inserting a new element
    /// when no further candidate exists.
    ///
    /// On [`Insert::Inserted`] the new element received dense index
    /// `len() - 1` and its hash is recorded. Residents closer to their home
    /// bucket than the element being placed are displaced onward.
    ///
    /// # Safety
    ///
    /// `len() < capacity()` must hold, which also implies a buffer is
    /// installed. Grow and rehash first otherwise.
    pub unsafe fn insert(&mut self, probe: &mut Probe) -> Insert {
        debug_assert!(
            self.size < self.capacity,
            "insert into a full index ({} of {})",
            self.size,
            self.capacity
        );

        let mask = self.mask;
        let hash = probe.hash;
        let size = self.size;
        let (entries, hashes) = self.parts_mut();

        // Recorded up front, the displacement chain may need to resolve the
        // clamped distance of the new element.
        hashes[size as usize] = hash;

        let mut carry = (hash & !mask) | size;
        let mut scan = probe.scan;
        let mut ix;
        loop {
            ix = hash.wrapping_add(scan) & mask;
            scan += 1;
            let slot = entries[ix as usize];
            if slot.is_empty() {
                entries[ix as usize] = Slot::new(carry, scan);
                break;
            }

            // An equal key shares the whole hash, so a clamped resident is
            // only a candidate when its exact distance equals `scan`.
            let resident = resolve_distance(slot, ix, mask, hashes);
            if resident == scan && slot.matches(mask, hash, scan.min(CLAMPED)) {
                probe.scan = scan;
                return Insert::Candidate(slot.index(mask));
            }
            if resident < scan {
                entries[ix as usize] = Slot::new(carry, scan);
                carry = slot.payload();
                scan = resident;
                displace(entries, hashes, mask, ix, carry, scan);
                break;
            }
        }

        self.size += 1;
        Insert::Inserted(size)
    }

    /// Removes the element `probe` last stopped at with backward-shift
    /// deletion.
    ///
    /// Returns the relocation to mirror when the removed element was not the
    /// last one: the former last element now has dense index `dst`.
    ///
    /// # Safety
    ///
    /// The probe's most recent [`find`](Self::find) or
    /// [`insert`](Self::insert) call on this index must have returned a
    /// candidate, with no mutation of the index since.
    pub unsafe fn remove(&mut self, probe: &Probe) -> Option<Relocation> {
        debug_assert!(probe.scan > 0 && self.size > 0);

        let mask = self.mask;
        let last = self.size - 1;
        let (entries, hashes) = self.parts_mut();

        let mut ix = probe.hash.wrapping_add(probe.scan).wrapping_sub(1) & mask;
        let removed = entries[ix as usize].index(mask);

        loop {
            let next = ix.wrapping_add(1) & mask;
            let slot = entries[next as usize];
            if slot.distance() <= 1 {
                break;
            }

            entries[ix as usize] = if slot.distance() < CLAMPED {
                Slot(slot.0 - (1 << DISTANCE_SHIFT))
            } else {
                let home = hashes[slot.index(mask) as usize];
                Slot::new(slot.payload(), next.wrapping_sub(home) & mask)
            };
            ix = next;
        }
        entries[ix as usize] = Slot::EMPTY;

        let relocation = if removed < last {
            let moved = hashes[last as usize];
            hashes[removed as usize] = moved;

            let mut ix = moved & mask;
            while entries[ix as usize].is_empty() || entries[ix as usize].index(mask) != last {
                ix = ix.wrapping_add(1) & mask;
            }
            entries[ix as usize] = entries[ix as usize].with_index(mask, removed);

            Some(Relocation {
                dst: removed,
                src: last,
            })
        } else {
            None
        };

        self.size = last;
        relocation
    }

    /// Removes the element with dense index `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len()`.
    pub fn remove_index(&mut self, index: usize) -> Option<Relocation> {
        assert!(
            index < self.len(),
            "index {index} out of bounds for length {}",
            self.len()
        );

        let mask = self.mask;
        let index = index as u32;
        let hash = self.hashes()[index as usize];
        let entries = self.entries();

        let mut scan = 0u32;
        loop {
            let slot = entries[(hash.wrapping_add(scan) & mask) as usize];
            scan += 1;
            if !slot.is_empty() && slot.index(mask) == index {
                break;
            }
        }

        // SAFETY: `scan` is one past the bucket owning `index`, exactly the
        // state a successful `find` would leave behind.
        unsafe { self.remove(&Probe { hash, scan }) }
    }

    /// Computes the sizing of the next growth step.
    ///
    /// The first buffer gets `min_initial_entries` (rounded up to a power of
    /// two) or [`DEFAULT_ENTRY_COUNT`] entries; later ones double. The entry
    /// count is doubled further until the capacity leaves room for at least
    /// one more element.
    pub fn grow(&self, min_initial_entries: usize) -> Result<Sizing, TryReserveError> {
        let num_entries = if self.is_allocated() {
            self.num_entries() * 2
        } else if min_initial_entries == 0 {
            DEFAULT_ENTRY_COUNT
        } else {
            min_initial_entries
                .checked_next_power_of_two()
                .ok_or(TryReserveError::CapacityOverflow)?
        };

        self.sizing(num_entries, self.len() + 1)
    }

    /// Computes the sizing for holding `target` elements.
    ///
    /// The entry count is derived from `target` and the load factor rather
    /// than doubled, so this can also shrink. The capacity is never below the
    /// current length.
    pub fn resize_for(&self, target: usize) -> Result<Sizing, TryReserveError> {
        let estimate = (target as f64 / self.effective_load_factor() - 0.5).max(0.0);
        if estimate >= MAX_ENTRY_COUNT as f64 {
            return Err(TryReserveError::CapacityOverflow);
        }

        let num_entries = (estimate as usize).next_power_of_two();
        self.sizing(num_entries, target.max(self.len()))
    }

    fn sizing(&self, num_entries: usize, min_capacity: usize) -> Result<Sizing, TryReserveError> {
        let load_factor = self.effective_load_factor();
        let mut num_entries = num_entries.max(MIN_ENTRY_COUNT);
        loop {
            if num_entries > MAX_ENTRY_COUNT {
                return Err(TryReserveError::CapacityOverflow);
            }

            // One bucket always stays empty so every scan terminates.
            let capacity = ((num_entries as f64 * load_factor) as usize).min(num_entries - 1);
            if capacity >= min_capacity {
                return Ok(Sizing {
                    capacity,
                    num_entries,
                    alloc_size: metadata_size(capacity, num_entries),
                });
            }
            num_entries *= 2;
        }
    }

    /// Moves the index into `buffer`, re-inserting every element by its stored
    /// hash in dense order. Dense indices are unchanged.
    ///
    /// Returns the previous buffer, if any, for the caller to free.
    ///
    /// # Safety
    ///
    /// `buffer` must be valid for reads and writes of `sizing.alloc_size()`
    /// bytes, 4-byte aligned, initialized (any bit pattern), and must not
    /// overlap the current buffer. `sizing.capacity()` must be at least
    /// `len()`.
    pub unsafe fn rehash(&mut self, sizing: &Sizing, buffer: NonNull<u8>) -> Option<NonNull<u8>> {
        debug_assert!(sizing.capacity >= self.len());
        debug_assert!(sizing.num_entries.is_power_of_two());

        let entries = buffer.cast::<Slot>();
        let replacement = RawIndex {
            entries,
            // SAFETY: the buffer holds `num_entries` slots followed by
            // `capacity` hashes.
            hashes: unsafe { entries.add(sizing.num_entries).cast() },
            mask: (sizing.num_entries - 1) as u32,
            capacity: sizing.capacity as u32,
            size: 0,
            load_factor: self.load_factor,
        };
        let old = core::mem::replace(self, replacement);

        // SAFETY: the new buffer has `num_entries` slots, and zero is empty.
        unsafe { core::ptr::write_bytes(self.entries.as_ptr(), 0, sizing.num_entries) };

        for &hash in &old.hashes()[..old.len()] {
            let mut probe = Probe::new(hash);
            // SAFETY: `capacity >= old.len()`, so every re-insertion has room.
            while let Insert::Candidate(_) = unsafe { self.insert(&mut probe) } {}
        }

        old.is_allocated().then(|| old.entries.cast())
    }

    /// Copies the complete metadata into `buffer`, producing an index with the
    /// same layout and dense order.
    ///
    /// # Safety
    ///
    /// `buffer` must be valid for writes of `alloc_size()` bytes and 4-byte
    /// aligned. The returned index refers to `buffer`.
    pub unsafe fn duplicate_into(&self, buffer: NonNull<u8>) -> RawIndex {
        if !self.is_allocated() {
            return RawIndex {
                load_factor: self.load_factor,
                ..RawIndex::new()
            };
        }

        // SAFETY: both buffers hold `alloc_size()` bytes and are distinct.
        unsafe {
            core::ptr::copy_nonoverlapping(
                self.entries.as_ptr().cast::<u8>(),
                buffer.as_ptr(),
                self.alloc_size(),
            );
        }

        let entries = buffer.cast::<Slot>();
        RawIndex {
            entries,
            // SAFETY: same layout as `self`.
            hashes: unsafe { entries.add(self.num_entries()).cast() },
            ..*self
        }
    }

    /// Removes every element, keeping the buffer.
    pub fn clear(&mut self) {
        if self.is_allocated() {
            let (entries, _) = self.parts_mut();
            entries.fill(Slot::EMPTY);
        }
        self.size = 0;
    }

    /// Returns to the unallocated state and hands back the buffer, if any.
    ///
    /// The load factor survives the reset.
    pub fn reset(&mut self) -> Option<NonNull<u8>> {
        let replacement = RawIndex {
            load_factor: self.load_factor,
            ..RawIndex::new()
        };
        let old = core::mem::replace(self, replacement);
        old.is_allocated().then(|| old.entries.cast())
    }

    /// Panics unless every structural and Robin Hood invariant holds.
    ///
    /// Walks the whole table; meant for tests only.
    #[cfg(any(test, feature = "validate"))]
    pub fn validate(&self) {
        if !self.is_allocated() {
            assert_eq!(self.size, 0, "unallocated index with elements");
            assert_eq!(self.capacity, 0, "unallocated index with capacity");
            return;
        }

        let mask = self.mask;
        let num_entries = self.num_entries();
        assert!(num_entries.is_power_of_two(), "{num_entries} entries");
        assert!(self.size <= self.capacity, "{:#?}", self);
        assert!((self.capacity as usize) < num_entries, "{:#?}", self);

        let entries = self.entries();
        let hashes = self.hashes();
        let mut seen = alloc::vec![false; self.len()];
        let mut occupied = 0usize;

        for (ix, &slot) in entries.iter().enumerate() {
            if slot.is_empty() {
                continue;
            }
            occupied += 1;

            let index = slot.index(mask) as usize;
            assert!(index < self.len(), "slot {ix} points past the end: {:#?}", self);
            assert!(!seen[index], "dense index {index} referenced twice: {:#?}", self);
            seen[index] = true;

            let hash = hashes[index];
            assert_eq!(hash & !HASH_MASK, 0, "unmasked hash at {index}");
            assert_eq!(
                slot.payload() & !mask,
                hash & !mask,
                "hash bits of slot {ix} disagree with hashes[{index}]"
            );

            let distance = true_distance(ix as u32, hash, mask);
            assert_eq!(
                slot.distance(),
                distance.min(CLAMPED),
                "slot {ix} stores the wrong distance: {:#?}",
                self
            );

            if distance > 1 {
                let prev_ix = (ix as u32).wrapping_sub(1) & mask;
                let prev = entries[prev_ix as usize];
                assert!(!prev.is_empty(), "gap before slot {ix}: {:#?}", self);
                let prev_distance = true_distance(prev_ix, hashes[prev.index(mask) as usize], mask);
                assert!(
                    prev_distance + 1 >= distance,
                    "Robin Hood order broken at slot {ix}: {:#?}",
                    self
                );
            }
        }

        assert_eq!(occupied, self.len(), "{:#?}", self);
    }
}

/// Resolves the exact distance of `slot`, stored at `ix`.
#[inline(always)]
fn resolve_distance(slot: Slot, ix: u32, mask: u32, hashes: &[u32]) -> u32 {
    let distance = slot.distance();
    if distance == CLAMPED {
        true_distance(ix, hashes[slot.index(mask) as usize], mask)
    } else {
        distance
    }
}

#[inline(always)]
fn true_distance(ix: u32, hash: u32, mask: u32) -> u32 {
    (ix.wrapping_sub(hash) & mask) + 1
}

/// Re-homes a displaced resident, swapping with every poorer resident on the
/// way, until an empty bucket takes the last one.
#[inline]
fn displace(entries: &mut [Slot], hashes: &[u32], mask: u32, mut ix: u32, mut carry: u32, mut scan: u32) {
    loop {
        ix = ix.wrapping_add(1) & mask;
        scan += 1;
        let slot = entries[ix as usize];
        if slot.is_empty() {
            entries[ix as usize] = Slot::new(carry, scan);
            return;
        }

        let resident = resolve_distance(slot, ix, mask, hashes);
        if resident < scan {
            entries[ix as usize] = Slot::new(carry, scan);
            carry = slot.payload();
            scan = resident;
        }
    }
}

#[inline(always)]
fn metadata_size(capacity: usize, num_entries: usize) -> usize {
    ((capacity + num_entries) * core::mem::size_of::<u32>() + 7) & !7
}

/// Probe-length statistics for an index.
#[cfg(any(test, feature = "stats"))]
#[derive(Debug, Clone)]
pub struct DebugStats {
    /// Number of elements currently in the index
    pub populated: usize,
    /// Maximum element count before a rehash
    pub capacity: usize,
    /// Length of the entries array
    pub num_entries: usize,
    /// Configured load factor (0.8 when unset)
    pub load_factor: f64,
    /// Actual fill ratio (populated / num_entries)
    pub fill: f64,
    /// Longest scan distance
    pub max_distance: usize,
    /// Mean scan distance
    pub mean_distance: f64,
    /// Entries whose distance had to be clamped
    pub clamped: usize,
    /// Bytes used by the metadata
    pub metadata_bytes: usize,
}

#[cfg(any(test, feature = "stats"))]
impl DebugStats {
    /// Pretty-print the statistics.
    #[cfg(feature = "std")]
    pub fn print(&self) {
        println!("=== Robin Hood Index Statistics ===");
        println!(
            "Population: {}/{} (load factor {:.2})",
            self.populated, self.capacity, self.load_factor
        );
        println!(
            "Entries: {} ({:.2}% filled)",
            self.num_entries,
            self.fill * 100.0
        );
        println!(
            "Distance: mean {:.3}, max {}, {} clamped",
            self.mean_distance, self.max_distance, self.clamped
        );
        println!("Metadata: {} bytes", self.metadata_bytes);
    }
}

#[cfg(any(test, feature = "stats"))]
impl RawIndex {
    /// Number of bins in [`probe_histogram`](Self::probe_histogram).
    pub const HISTOGRAM_BINS: usize = 16;

    /// Histogram of exact scan distances.
    ///
    /// Bin `i` counts elements at distance `i + 1`; the last bin also holds
    /// everything further out.
    pub fn probe_histogram(&self) -> alloc::vec::Vec<usize> {
        let mut hist = alloc::vec![0usize; Self::HISTOGRAM_BINS];
        let hashes = self.hashes();
        for (ix, &slot) in self.entries().iter().enumerate() {
            if slot.is_empty() {
                continue;
            }
            let distance = resolve_distance(slot, ix as u32, self.mask, hashes) as usize;
            hist[(distance - 1).min(Self::HISTOGRAM_BINS - 1)] += 1;
        }
        hist
    }

    /// Returns distance and fill statistics.
    pub fn debug_stats(&self) -> DebugStats {
        let hashes = self.hashes();
        let mut max_distance = 0usize;
        let mut total = 0usize;
        let mut clamped = 0usize;
        for (ix, &slot) in self.entries().iter().enumerate() {
            if slot.is_empty() {
                continue;
            }
            if slot.distance() == CLAMPED {
                clamped += 1;
            }
            let distance = resolve_distance(slot, ix as u32, self.mask, hashes) as usize;
            max_distance = max_distance.max(distance);
            total += distance;
        }

        DebugStats {
            populated: self.len(),
            capacity: self.capacity(),
            num_entries: self.num_entries(),
            load_factor: self.effective_load_factor(),
            fill: if self.num_entries() == 0 {
                0.0
            } else {
                self.len() as f64 / self.num_entries() as f64
            },
            max_distance,
            mean_distance: if self.is_empty() {
                0.0
            } else {
                total as f64 / self.len() as f64
            },
            clamped,
            metadata_bytes: self.alloc_size(),
        }
    }

    /// Pretty-prints the probe histogram as a horizontal bar chart.
    #[cfg(feature = "std")]
    pub fn print_probe_histogram(&self) {
        let hist = self.probe_histogram();
        let max = *hist.iter().max().unwrap_or(&0);
        if max == 0 {
            println!("probe histogram: empty");
            return;
        }

        let max_bar = 60usize;
        let total_units = max_bar * 8;
        println!("probe histogram ({} entries):", self.len());

        let make_bar = |count: usize| -> alloc::string::String {
            if count == 0 {
                return alloc::string::String::new();
            }
            let units = ((count as u128 * total_units as u128).div_ceil(max as u128)) as usize;
            let mut bar = "█".repeat(units / 8);
            let partial = ['▏', '▎', '▍', '▌', '▋', '▊', '▉'];
            if units % 8 > 0 {
                bar.push(partial[units % 8 - 1]);
            }
            bar
        };

        let last = Self::HISTOGRAM_BINS - 1;
        for (i, &count) in hist.iter().enumerate() {
            let label = if i == last {
                alloc::format!("{:>2}+", i + 1)
            } else {
                alloc::format!("{:>3}", i + 1)
            };
            println!("{} | {} ({})", label, make_bar(count), count);
        }
    }
}

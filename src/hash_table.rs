//! A hash table keyed by caller-supplied hashes and equality predicates.
//!
//! [`HashTable`] is the typed core the map and set are built on. Values live
//! in one dense array in insertion order (until removals swap the last value
//! into the hole), next to the Robin Hood index that maps hashes to positions
//! in that array.

use core::fmt::Debug;
use core::iter::FusedIterator;
use core::marker::PhantomData;
use core::mem::MaybeUninit;

use crate::allocator::Allocator;
use crate::allocator::Global;
use crate::error::TryReserveError;
use crate::error::infallible;
use crate::index::DEFAULT_LOAD_FACTOR;
use crate::index::Probe;
use crate::raw::RawTable;
use crate::type_info::TypeInfo;

/// A hash table using Robin Hood hashing over a dense value array.
///
/// `HashTable<V>` stores values of type `V`. Unlike standard hash maps, this
/// table requires you to provide both the 32-bit hash and an equality
/// predicate for each operation.
///
/// ## Performance Characteristics
///
/// - **Memory**: 4 bytes of entry per bucket plus 4 bytes of hash and the
///   size of `V` per element of capacity, all in a single allocation.
/// - **Iteration** walks the dense value array and never touches the index.
///
/// ## Example
///
/// ```rust
/// # use core::hash::Hash;
/// # use core::hash::Hasher;
/// #
/// # use rh_hash::hash_table::HashTable;
/// # use siphasher::sip::SipHasher;
/// #
/// # #[derive(Debug, PartialEq)]
/// # struct Person {
/// #     id: u64,
/// #     name: String,
/// # }
/// #
/// # fn hash_id(id: u64) -> u32 {
/// #     let mut hasher = SipHasher::new();
/// #     id.hash(&mut hasher);
/// #     rh_hash::hash::fold(hasher.finish())
/// # }
///
/// let mut table = HashTable::with_capacity(100);
/// let hash = hash_id(123);
///
/// // Insert a person
/// match table.entry(hash, |p: &Person| p.id == 123) {
///     rh_hash::hash_table::Entry::Vacant(entry) => {
///         entry.insert(Person {
///             id: 123,
///             name: "Alice".to_string(),
///         });
///     }
///     rh_hash::hash_table::Entry::Occupied(_) => {
///         println!("Person already exists");
///     }
/// }
/// ```
pub struct HashTable<V, A: Allocator = Global> {
    raw: RawTable<A>,
    _phantom: PhantomData<V>,
}

// SAFETY: the table owns its values and buffer exclusively.
unsafe impl<V: Send, A: Allocator + Send> Send for HashTable<V, A> {}
// SAFETY: shared access only hands out shared references to values.
unsafe impl<V: Sync, A: Allocator + Sync> Sync for HashTable<V, A> {}

impl<V: Debug, A: Allocator> Debug for HashTable<V, A> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("HashTable")
            .field("values", &self.as_slice())
            .field("index", self.raw.index())
            .finish()
    }
}

impl<V, A> Clone for HashTable<V, A>
where
    V: Clone,
    A: Allocator + Clone,
{
    fn clone(&self) -> Self {
        Self {
            raw: RawTable::clone_raw(&Self::CLONE_INFO, &self.raw),
            _phantom: PhantomData,
        }
    }

    /// Reuses the existing buffer when both tables share an allocator and it
    /// is large enough.
    fn clone_from(&mut self, source: &Self) {
        self.raw.clone_from_raw(&Self::CLONE_INFO, &source.raw);
    }
}

impl<V, A: Allocator> Drop for HashTable<V, A> {
    fn drop(&mut self) {
        self.raw.clear(&Self::INFO);
    }
}

impl<V> Default for HashTable<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> HashTable<V> {
    /// Creates an empty table. Nothing is allocated until the first insert.
    pub const fn new() -> Self {
        Self::new_in(Global)
    }

    /// Creates a new hash table with room for at least `capacity` values.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use rh_hash::hash_table::HashTable;
    /// #
    /// // Create a table that can hold at least 100 items without resizing
    /// let table: HashTable<String> = HashTable::with_capacity(100);
    /// assert!(table.capacity() >= 100);
    /// ```
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_in(capacity, Global)
    }
}

impl<V, A: Allocator + Clone> HashTable<V, A>
where
    V: Clone,
{
    const CLONE_INFO: TypeInfo = TypeInfo::cloneable::<V>();
}

impl<V, A: Allocator> HashTable<V, A> {
    const INFO: TypeInfo = TypeInfo::of::<V>();

    /// The first buffer holds roughly 64 bytes of values, and at least one.
    const MIN_INITIAL_ENTRIES: usize = match size_of::<V>() {
        0 => 1,
        size if size >= 64 => 1,
        size => 64 / size,
    };

    /// Creates an empty table that allocates from `alloc`.
    pub const fn new_in(alloc: A) -> Self {
        Self {
            raw: RawTable::new_in(alloc),
            _phantom: PhantomData,
        }
    }

    /// Creates a table with room for at least `capacity` values, allocating
    /// from `alloc`.
    pub fn with_capacity_in(capacity: usize, alloc: A) -> Self {
        let mut table = Self::new_in(alloc);
        table.reserve(capacity);
        table
    }

    /// Returns a reference to the table's allocator.
    pub fn allocator(&self) -> &A {
        self.raw.allocator()
    }

    /// Returns the number of elements in the table.
    pub fn len(&self) -> usize {
        self.raw.len()
    }

    /// Returns `true` if the table contains no elements.
    pub fn is_empty(&self) -> bool {
        self.raw.len() == 0
    }

    /// Returns the number of elements the table can hold before it needs to
    /// rehash.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use rh_hash::hash_table::HashTable;
    /// #
    /// let table: HashTable<i32> = HashTable::with_capacity(100);
    /// println!("Table can hold {} elements", table.capacity());
    /// assert!(table.capacity() >= 100);
    /// ```
    ///
    /// # Load Factor
    ///
    /// The table keeps at most 80% of its buckets occupied unless configured
    /// otherwise with [`set_load_factor`](Self::set_load_factor).
    pub fn capacity(&self) -> usize {
        self.raw.capacity()
    }

    /// The load factor applied at the next rehash.
    pub fn load_factor(&self) -> f32 {
        let load_factor = self.raw.index().load_factor();
        if load_factor == 0.0 {
            DEFAULT_LOAD_FACTOR
        } else {
            load_factor
        }
    }

    /// Sets the target ratio of elements to buckets, `0.0` restoring the
    /// default of 0.8.
    ///
    /// Takes effect at the next rehash, which [`reserve`](Self::reserve) or
    /// [`shrink_to_fit`](Self::shrink_to_fit) can force.
    ///
    /// # Panics
    ///
    /// Panics unless `load_factor` is `0.0` or strictly between 0 and 1.
    pub fn set_load_factor(&mut self, load_factor: f32) {
        self.raw.set_load_factor(load_factor);
    }

    /// Total bytes of the combined metadata and value buffer.
    pub fn allocation_size(&self) -> usize {
        self.raw.allocation_size()
    }

    /// The values in dense order.
    pub fn as_slice(&self) -> &[V] {
        if self.is_empty() {
            return &[];
        }
        // SAFETY: `0..len` are initialized values of `V` at an aligned,
        // non-null address.
        unsafe { core::slice::from_raw_parts(self.raw.values().as_ptr().cast(), self.len()) }
    }

    fn as_mut_slice(&mut self) -> &mut [V] {
        if self.is_empty() {
            return &mut [];
        }
        // SAFETY: as in `as_slice`, with exclusive access through `&mut self`.
        unsafe { core::slice::from_raw_parts_mut(self.raw.values().as_ptr().cast(), self.len()) }
    }

    /// Returns the value at dense position `index`.
    pub fn get_index(&self, index: usize) -> Option<&V> {
        self.as_slice().get(index)
    }

    /// Returns the value at dense position `index` mutably.
    pub fn get_index_mut(&mut self, index: usize) -> Option<&mut V> {
        self.as_mut_slice().get_mut(index)
    }

    /// # Safety
    ///
    /// `index < len()`.
    #[inline(always)]
    unsafe fn value_unchecked(&self, index: usize) -> &V {
        // SAFETY: the caller guarantees `index` is initialized.
        unsafe { &*self.raw.value_ptr(&Self::INFO, index).cast::<V>() }
    }

    /// # Safety
    ///
    /// `index < len()`.
    #[inline(always)]
    unsafe fn value_unchecked_mut(&mut self, index: usize) -> &mut V {
        // SAFETY: the caller guarantees `index` is initialized.
        unsafe { &mut *self.raw.value_ptr(&Self::INFO, index).cast::<V>() }
    }

    /// Advances `probe` to the value matching `eq`. On a miss the probe is
    /// left past the last rejected candidate.
    #[inline]
    fn find_probe(&self, probe: &mut Probe, eq: impl Fn(&V) -> bool) -> Option<usize> {
        while let Some(index) = self.raw.find(probe) {
            // SAFETY: the index only yields dense indices below `len()`.
            if eq(unsafe { self.value_unchecked(index) }) {
                return Some(index);
            }
        }
        None
    }

    /// Returns an iterator over all values in dense order.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use rh_hash::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::with_capacity(10);
    /// table.entry(1, |&v: &u64| v == 10).or_insert(10);
    /// table.entry(2, |&v: &u64| v == 20).or_insert(20);
    ///
    /// let values: Vec<u64> = table.iter().copied().collect();
    /// assert_eq!(values, [10, 20]);
    /// ```
    pub fn iter(&self) -> Iter<'_, V> {
        Iter {
            inner: self.as_slice().iter(),
        }
    }

    /// Returns an iterator over mutable references to all values.
    pub fn iter_mut(&mut self) -> IterMut<'_, V> {
        IterMut {
            inner: self.as_mut_slice().iter_mut(),
        }
    }

    /// Removes all values and returns them as an iterator, keeping the
    /// allocation.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::Hash;
    /// # use core::hash::Hasher;
    /// #
    /// # use rh_hash::hash_table::HashTable;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # fn hash_str(s: &str) -> u32 {
    /// #     let mut hasher = SipHasher::new();
    /// #     s.hash(&mut hasher);
    /// #     rh_hash::hash::fold(hasher.finish())
    /// # }
    /// #
    /// let mut table = HashTable::with_capacity(10);
    /// table
    ///     .entry(hash_str("a"), |s: &String| s == "a")
    ///     .or_insert("a".to_string());
    /// table
    ///     .entry(hash_str("b"), |s: &String| s == "b")
    ///     .or_insert("b".to_string());
    ///
    /// let drained: Vec<String> = table.drain().collect();
    /// assert_eq!(drained.len(), 2);
    /// assert!(table.is_empty());
    /// ```
    pub fn drain(&mut self) -> Drain<'_, V, A> {
        let end = self.raw.take_all();
        Drain {
            table: self,
            next: 0,
            end,
        }
    }

    /// Keeps only the values for which `f` returns `true`.
    ///
    /// Removal swaps the last value into the hole, so the dense order of the
    /// survivors changes.
    pub fn retain(&mut self, mut f: impl FnMut(&mut V) -> bool) {
        let mut index = 0;
        while index < self.len() {
            // SAFETY: `index < len()`.
            if f(unsafe { self.value_unchecked_mut(index) }) {
                index += 1;
            } else {
                drop(self.swap_remove_index(index));
            }
        }
    }

    /// Removes all values, keeping the allocated memory.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use rh_hash::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::with_capacity(10);
    /// table.entry(7, |&v: &u64| v == 7).or_insert(7);
    /// let capacity = table.capacity();
    ///
    /// table.clear();
    /// assert!(table.is_empty());
    /// assert_eq!(table.capacity(), capacity);
    /// ```
    pub fn clear(&mut self) {
        self.raw.clear(&Self::INFO);
    }

    /// Removes all values and frees the allocation, leaving an empty table
    /// with zero capacity. The load factor is kept.
    pub fn reset(&mut self) {
        self.raw.reset(&Self::INFO);
    }

    /// Shrinks the capacity as much as possible while keeping every value.
    ///
    /// An empty table releases its allocation entirely.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use rh_hash::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::with_capacity(1000);
    /// table.entry(1, |&v: &u64| v == 1).or_insert(1);
    ///
    /// table.shrink_to_fit();
    /// assert!(table.capacity() < 1000);
    /// assert_eq!(table.find(1, |&v| v == 1), Some(&1));
    /// ```
    pub fn shrink_to_fit(&mut self) {
        self.raw.shrink_to_fit(&Self::INFO);
    }

    /// Reserves capacity for at least `additional` more values.
    ///
    /// # Panics
    ///
    /// Panics if the new capacity overflows what the index can address, and
    /// calls the allocation error handler if the allocator fails.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use rh_hash::hash_table::HashTable;
    /// #
    /// let mut table: HashTable<u64> = HashTable::new();
    /// table.reserve(500);
    /// assert!(table.capacity() >= 500);
    /// ```
    pub fn reserve(&mut self, additional: usize) {
        infallible(self.raw.try_reserve(&Self::INFO, additional));
    }

    /// Reserves capacity for at least `additional` more values, reporting
    /// failure instead of panicking.
    pub fn try_reserve(&mut self, additional: usize) -> Result<(), TryReserveError> {
        self.raw.try_reserve(&Self::INFO, additional)
    }

    /// Returns a reference to the value matching `hash` and `eq`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use rh_hash::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::with_capacity(10);
    /// table.entry(42, |&(k, _): &(u32, &str)| k == 42).or_insert((42, "answer"));
    ///
    /// assert_eq!(table.find(42, |&(k, _)| k == 42), Some(&(42, "answer")));
    /// assert_eq!(table.find(43, |&(k, _)| k == 43), None);
    /// ```
    #[inline]
    pub fn find(&self, hash: u32, eq: impl Fn(&V) -> bool) -> Option<&V> {
        let index = self.find_probe(&mut Probe::new(hash), eq)?;
        // SAFETY: found indices are initialized.
        Some(unsafe { self.value_unchecked(index) })
    }

    /// Returns a mutable reference to the value matching `hash` and `eq`.
    #[inline]
    pub fn find_mut(&mut self, hash: u32, eq: impl Fn(&V) -> bool) -> Option<&mut V> {
        let index = self.find_probe(&mut Probe::new(hash), eq)?;
        // SAFETY: found indices are initialized.
        Some(unsafe { self.value_unchecked_mut(index) })
    }

    /// Returns the dense position of the value matching `hash` and `eq`.
    #[inline]
    pub fn find_index(&self, hash: u32, eq: impl Fn(&V) -> bool) -> Option<usize> {
        self.find_probe(&mut Probe::new(hash), eq)
    }

    /// Removes and returns the value matching `hash` and `eq`.
    ///
    /// The last value in dense order takes the removed value's position.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use rh_hash::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::with_capacity(10);
    /// table.entry(5, |&v: &u64| v == 5).or_insert(5);
    ///
    /// assert_eq!(table.remove(5, |&v| v == 5), Some(5));
    /// assert_eq!(table.remove(5, |&v| v == 5), None);
    /// ```
    pub fn remove(&mut self, hash: u32, eq: impl Fn(&V) -> bool) -> Option<V> {
        let mut probe = Probe::new(hash);
        let index = self.find_probe(&mut probe, eq)?;
        let mut out = MaybeUninit::<V>::uninit();
        // SAFETY: `probe` just produced `index` and nothing changed since.
        unsafe {
            self.raw
                .remove_found(&Self::INFO, &probe, index, out.as_mut_ptr().cast());
            Some(out.assume_init())
        }
    }

    /// Removes and returns the value at dense position `index`, moving the
    /// last value into its place.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len()`.
    pub fn swap_remove_index(&mut self, index: usize) -> V {
        let mut out = MaybeUninit::<V>::uninit();
        // SAFETY: `out` has room for one value; bounds are checked inside.
        unsafe {
            self.raw
                .remove_index(&Self::INFO, index, out.as_mut_ptr().cast());
            out.assume_init()
        }
    }

    /// Gets the entry for `hash` and `eq`, for in-place insertion or
    /// modification.
    ///
    /// If the table is full it grows first, so a vacant entry can always be
    /// filled without another allocation.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::Hash;
    /// # use core::hash::Hasher;
    /// #
    /// # use rh_hash::hash_table::Entry;
    /// # use rh_hash::hash_table::HashTable;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # fn hash_str(s: &str) -> u32 {
    /// #     let mut hasher = SipHasher::new();
    /// #     s.hash(&mut hasher);
    /// #     rh_hash::hash::fold(hasher.finish())
    /// # }
    /// #
    /// let mut table = HashTable::new();
    /// let hash = hash_str("key");
    ///
    /// match table.entry(hash, |s: &String| s == "key") {
    ///     Entry::Vacant(entry) => {
    ///         entry.insert("key".to_string());
    ///     }
    ///     Entry::Occupied(_) => unreachable!(),
    /// }
    ///
    /// assert!(matches!(
    ///     table.entry(hash, |s: &String| s == "key"),
    ///     Entry::Occupied(_)
    /// ));
    /// ```
    pub fn entry(&mut self, hash: u32, eq: impl Fn(&V) -> bool) -> Entry<'_, V, A> {
        if self.raw.len() == self.raw.capacity() {
            self.raw.grow(&Self::INFO, Self::MIN_INITIAL_ENTRIES);
        }

        let mut probe = Probe::new(hash);
        match self.find_probe(&mut probe, eq) {
            Some(index) => Entry::Occupied(OccupiedEntry {
                table: self,
                probe,
                index,
            }),
            None => Entry::Vacant(VacantEntry { table: self, probe }),
        }
    }

    /// Checks every index invariant, panicking on the first violation.
    #[cfg(any(test, feature = "validate"))]
    pub fn validate(&self) {
        self.raw.index().validate();
    }

    /// Computes a histogram of Robin Hood scan distances.
    ///
    /// Bin `i` counts values stored `i` buckets past their home bucket; the
    /// last bin also collects everything further out.
    #[cfg(any(test, feature = "stats"))]
    pub fn probe_histogram(&self) -> alloc::vec::Vec<usize> {
        self.raw.index().probe_histogram()
    }

    /// Returns distance and fill statistics of the index.
    #[cfg(any(test, feature = "stats"))]
    pub fn debug_stats(&self) -> crate::index::DebugStats {
        self.raw.index().debug_stats()
    }

    /// Pretty-prints the probe histogram to stdout.
    #[cfg(all(any(test, feature = "stats"), feature = "std"))]
    pub fn print_probe_histogram(&self) {
        self.raw.index().print_probe_histogram();
    }
}

/// A view into a single entry in the hash table, which may be vacant or
/// occupied.
///
/// This enum is constructed from the [`entry`] method on [`HashTable`].
///
/// [`entry`]: HashTable::entry
pub enum Entry<'a, V, A: Allocator = Global> {
    /// A vacant entry - the key is not present in the table
    Vacant(VacantEntry<'a, V, A>),
    /// An occupied entry - the key is present in the table
    Occupied(OccupiedEntry<'a, V, A>),
}

impl<'a, V, A: Allocator> Entry<'a, V, A> {
    /// Inserts `default` if the entry is vacant and returns a mutable
    /// reference to the value in the entry.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use rh_hash::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::new();
    /// let value = table.entry(3, |s: &String| s == "key").or_insert("key".to_string());
    /// assert_eq!(value, "key");
    ///
    /// let existing = table.entry(3, |s: &String| s == "key").or_insert("other".to_string());
    /// assert_eq!(existing, "key");
    /// ```
    pub fn or_insert(self, default: V) -> &'a mut V {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default),
        }
    }

    /// Inserts the result of `default` if the entry is vacant. `default` is
    /// not called for occupied entries.
    pub fn or_insert_with(self, default: impl FnOnce() -> V) -> &'a mut V {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default()),
        }
    }

    /// Modifies an occupied entry in place. Returns the entry for chaining.
    pub fn and_modify(mut self, f: impl FnOnce(&mut V)) -> Self {
        if let Entry::Occupied(entry) = &mut self {
            f(entry.get_mut());
        }
        self
    }

    /// Inserts `V::default()` if the entry is vacant.
    pub fn or_default(self) -> &'a mut V
    where
        V: Default,
    {
        self.or_insert_with(V::default)
    }
}

/// A view into a vacant entry in the hash table.
///
/// [`HashTable::entry`] has already made room, so inserting never allocates.
pub struct VacantEntry<'a, V, A: Allocator = Global> {
    table: &'a mut HashTable<V, A>,
    probe: Probe,
}

impl<'a, V, A: Allocator> VacantEntry<'a, V, A> {
    /// Inserts a value into the vacant entry and returns a mutable reference to
    /// it.
    pub fn insert(self, value: V) -> &'a mut V {
        let table = self.table;
        let index = table.raw.len();
        // SAFETY: `entry` grew the table before the lookup, so slot `len()`
        // is free and the probe belongs to the current buffer. The value is
        // written before the index refers to it.
        unsafe {
            table
                .raw
                .value_ptr(&HashTable::<V, A>::INFO, index)
                .cast::<V>()
                .write(value);
            let committed = table.raw.commit_insert(self.probe);
            debug_assert_eq!(committed, index);
            table.value_unchecked_mut(index)
        }
    }
}

/// A view into an occupied entry in the hash table.
pub struct OccupiedEntry<'a, V, A: Allocator = Global> {
    table: &'a mut HashTable<V, A>,
    probe: Probe,
    index: usize,
}

impl<'a, V, A: Allocator> OccupiedEntry<'a, V, A> {
    /// Gets a reference to the value in the entry.
    pub fn get(&self) -> &V {
        // SAFETY: the entry's index was found and is initialized.
        unsafe { self.table.value_unchecked(self.index) }
    }

    /// Gets a mutable reference to the value in the entry.
    pub fn get_mut(&mut self) -> &mut V {
        // SAFETY: as in `get`.
        unsafe { self.table.value_unchecked_mut(self.index) }
    }

    /// Converts the entry into a mutable reference bound to the table's
    /// lifetime.
    pub fn into_mut(self) -> &'a mut V {
        let table = self.table;
        // SAFETY: as in `get`.
        unsafe { table.value_unchecked_mut(self.index) }
    }

    /// The dense position of the value.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Removes the value from the table and returns it.
    pub fn remove(self) -> V {
        let mut out = MaybeUninit::<V>::uninit();
        // SAFETY: the probe came from the lookup that created this entry and
        // the table has been exclusively borrowed since.
        unsafe {
            self.table.raw.remove_found(
                &HashTable::<V, A>::INFO,
                &self.probe,
                self.index,
                out.as_mut_ptr().cast(),
            );
            out.assume_init()
        }
    }
}

/// An iterator over the values of a [`HashTable`] in dense order.
///
/// This struct is created by the [`iter`] method on [`HashTable`].
///
/// [`iter`]: HashTable::iter
#[derive(Clone)]
pub struct Iter<'a, V> {
    inner: core::slice::Iter<'a, V>,
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = &'a V;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<V> ExactSizeIterator for Iter<'_, V> {}
impl<V> FusedIterator for Iter<'_, V> {}

/// A mutable iterator over the values of a [`HashTable`].
pub struct IterMut<'a, V> {
    inner: core::slice::IterMut<'a, V>,
}

impl<'a, V> Iterator for IterMut<'a, V> {
    type Item = &'a mut V;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<V> ExactSizeIterator for IterMut<'_, V> {}
impl<V> FusedIterator for IterMut<'_, V> {}

/// A draining iterator over the values in a [`HashTable`].
///
/// This struct is created by the [`drain`] method on [`HashTable`]. The table
/// is empty from the moment the iterator is created; values not yet yielded
/// are dropped along with the iterator.
///
/// [`drain`]: HashTable::drain
pub struct Drain<'a, V, A: Allocator = Global> {
    table: &'a mut HashTable<V, A>,
    next: usize,
    end: usize,
}

impl<V, A: Allocator> Iterator for Drain<'_, V, A> {
    type Item = V;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next == self.end {
            return None;
        }
        // SAFETY: slots `next..end` still hold values the index no longer
        // refers to; each is read exactly once.
        let value = unsafe {
            self.table
                .raw
                .value_ptr(&HashTable::<V, A>::INFO, self.next)
                .cast::<V>()
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

impl<V, A: Allocator> Drop for Drain<'_, V, A> {
    fn drop(&mut self) {
        let start = self.next;
        self.next = self.end;
        // SAFETY: the unread slots are initialized and owned by the iterator.
        unsafe {
            HashTable::<V, A>::INFO.destruct_range(
                self.table.raw.value_ptr(&HashTable::<V, A>::INFO, start),
                self.end - start,
            );
        }
    }
}

impl<V, A: Allocator> ExactSizeIterator for Drain<'_, V, A> {}
impl<V, A: Allocator> FusedIterator for Drain<'_, V, A> {}

/// An owning iterator over the values of a [`HashTable`].
pub struct IntoIter<V, A: Allocator = Global> {
    table: HashTable<V, A>,
    next: usize,
    end: usize,
}

impl<V, A: Allocator> Iterator for IntoIter<V, A> {
    type Item = V;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next == self.end {
            return None;
        }
        // SAFETY: as in `Drain::next`.
        let value = unsafe {
            self.table
                .raw
                .value_ptr(&HashTable::<V, A>::INFO, self.next)
                .cast::<V>()
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

impl<V, A: Allocator> Drop for IntoIter<V, A> {
    fn drop(&mut self) {
        let start = self.next;
        self.next = self.end;
        // SAFETY: as in `Drain::drop`; the table frees the buffer afterwards.
        unsafe {
            HashTable::<V, A>::INFO.destruct_range(
                self.table.raw.value_ptr(&HashTable::<V, A>::INFO, start),
                self.end - start,
            );
        }
    }
}

impl<V, A: Allocator> ExactSizeIterator for IntoIter<V, A> {}
impl<V, A: Allocator> FusedIterator for IntoIter<V, A> {}

impl<V, A: Allocator> IntoIterator for HashTable<V, A> {
    type Item = V;
    type IntoIter = IntoIter<V, A>;

    fn into_iter(mut self) -> Self::IntoIter {
        let end = self.raw.take_all();
        IntoIter {
            table: self,
            next: 0,
            end,
        }
    }
}

impl<'a, V, A: Allocator> IntoIterator for &'a HashTable<V, A> {
    type Item = &'a V;
    type IntoIter = Iter<'a, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, V, A: Allocator> IntoIterator for &'a mut HashTable<V, A> {
    type Item = &'a mut V;
    type IntoIter = IterMut<'a, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

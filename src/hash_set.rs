use core::borrow::Borrow;
use core::fmt::Debug;
use core::hash::BuildHasher;
use core::hash::Hash;
use core::iter::FusedIterator;

use crate::allocator::Allocator;
use crate::allocator::Global;
use crate::error::TryReserveError;
use crate::hash::DefaultHashBuilder;
use crate::hash::make_hash;
use crate::hash_table;
use crate::hash_table::Entry as TableEntry;
use crate::hash_table::HashTable;

/// A hash set implemented using the Robin Hood [`HashTable`] as the
/// underlying storage.
///
/// `HashSet<T, S>` stores values of type `T` where `T` implements `Hash + Eq`
/// and uses a configurable hasher builder `S` to hash values. Values sit in a
/// dense array that [`as_slice`](Self::as_slice) exposes directly.
///
/// # Performance Characteristics
///
/// - **Memory**: 8 bytes of index per element of capacity, plus the size of
///   `T`.
pub struct HashSet<T, S = DefaultHashBuilder, A: Allocator = Global> {
    table: HashTable<T, A>,
    hash_builder: S,
}

impl<T, S, A> PartialEq for HashSet<T, S, A>
where
    T: Hash + Eq,
    S: BuildHasher,
    A: Allocator,
{
    fn eq(&self, other: &Self) -> bool {
        if self.len() != other.len() {
            return false;
        }
        self.iter().all(|v| other.contains(v))
    }
}

impl<T, S, A> Eq for HashSet<T, S, A>
where
    T: Hash + Eq,
    S: BuildHasher,
    A: Allocator,
{
}

impl<T: Debug, S, A: Allocator> Debug for HashSet<T, S, A> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<T, S, A> Clone for HashSet<T, S, A>
where
    T: Clone,
    S: Clone,
    A: Allocator + Clone,
{
    fn clone(&self) -> Self {
        Self {
            table: self.table.clone(),
            hash_builder: self.hash_builder.clone(),
        }
    }

    fn clone_from(&mut self, source: &Self) {
        self.table.clone_from(&source.table);
        self.hash_builder.clone_from(&source.hash_builder);
    }
}

impl<T> HashSet<T> {
    /// Creates an empty set with the default hasher.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use rh_hash::HashSet;
    ///
    /// let set: HashSet<i32> = HashSet::new();
    /// assert!(set.is_empty());
    /// ```
    pub const fn new() -> Self {
        Self {
            table: HashTable::new(),
            hash_builder: crate::hash::MixState,
        }
    }

    /// Creates an empty set with room for at least `capacity` values.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use rh_hash::HashSet;
    ///
    /// let set: HashSet<i32> = HashSet::with_capacity(100);
    /// assert!(set.capacity() >= 100);
    /// ```
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, DefaultHashBuilder::default())
    }
}

impl<T, S> HashSet<T, S> {
    /// Creates a new hash set with the given hasher builder.
    pub const fn with_hasher(hash_builder: S) -> Self {
        Self {
            table: HashTable::new(),
            hash_builder,
        }
    }

    /// Creates a new hash set with the specified capacity and hasher builder.
    pub fn with_capacity_and_hasher(capacity: usize, hash_builder: S) -> Self {
        Self {
            table: HashTable::with_capacity(capacity),
            hash_builder,
        }
    }
}

impl<T, S, A: Allocator> HashSet<T, S, A> {
    /// Creates an empty set using `hash_builder` and allocating from `alloc`.
    pub const fn with_hasher_in(hash_builder: S, alloc: A) -> Self {
        Self {
            table: HashTable::new_in(alloc),
            hash_builder,
        }
    }

    /// Creates a set with room for at least `capacity` values, using
    /// `hash_builder` and allocating from `alloc`.
    pub fn with_capacity_and_hasher_in(capacity: usize, hash_builder: S, alloc: A) -> Self {
        Self {
            table: HashTable::with_capacity_in(capacity, alloc),
            hash_builder,
        }
    }

    /// Returns a reference to the set's hasher builder.
    pub fn hasher(&self) -> &S {
        &self.hash_builder
    }

    /// Returns a reference to the set's allocator.
    pub fn allocator(&self) -> &A {
        self.table.allocator()
    }

    /// Returns the number of elements in the set.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns `true` if the set contains no elements.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Returns the number of elements the set can hold without reallocating.
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    /// The load factor applied at the next rehash.
    pub fn load_factor(&self) -> f32 {
        self.table.load_factor()
    }

    /// Sets the target ratio of elements to buckets. See
    /// [`HashTable::set_load_factor`].
    pub fn set_load_factor(&mut self, load_factor: f32) {
        self.table.set_load_factor(load_factor);
    }

    /// Clears the set, removing all values. Keeps the allocated memory.
    pub fn clear(&mut self) {
        self.table.clear();
    }

    /// Clears the set and releases its allocation.
    pub fn reset(&mut self) {
        self.table.reset();
    }

    /// Shrinks the capacity of the set as much as possible.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use rh_hash::HashSet;
    ///
    /// let mut set: HashSet<i32> = HashSet::with_capacity(100);
    /// set.insert(1);
    /// set.insert(2);
    ///
    /// set.shrink_to_fit();
    /// assert!(set.capacity() >= 2);
    /// assert!(set.capacity() < 100);
    /// ```
    pub fn shrink_to_fit(&mut self) {
        self.table.shrink_to_fit();
    }

    /// Reserves capacity for at least `additional` more elements.
    pub fn reserve(&mut self, additional: usize) {
        self.table.reserve(additional);
    }

    /// Tries to reserve capacity for at least `additional` more elements.
    pub fn try_reserve(&mut self, additional: usize) -> Result<(), TryReserveError> {
        self.table.try_reserve(additional)
    }

    /// The values in dense order.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use rh_hash::HashSet;
    ///
    /// let set: HashSet<u32> = [3, 1, 3, 2].into_iter().collect();
    /// assert_eq!(set.as_slice(), &[3, 1, 2]);
    /// ```
    pub fn as_slice(&self) -> &[T] {
        self.table.as_slice()
    }

    /// Returns the value at dense position `index`.
    pub fn get_index(&self, index: usize) -> Option<&T> {
        self.table.get_index(index)
    }

    /// Removes the value at dense position `index`, moving the last value into
    /// its place.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len()`.
    pub fn swap_remove_index(&mut self, index: usize) -> T {
        self.table.swap_remove_index(index)
    }

    /// An iterator visiting all elements in dense order.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            inner: self.table.iter(),
        }
    }

    /// Clears the set, returning all elements in an iterator.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use rh_hash::HashSet;
    ///
    /// let mut set: HashSet<i32> = HashSet::new();
    /// set.insert(1);
    /// set.insert(2);
    ///
    /// let drained: Vec<_> = set.drain().collect();
    /// assert_eq!(drained.len(), 2);
    /// assert!(set.is_empty());
    /// ```
    pub fn drain(&mut self) -> Drain<'_, T, A> {
        Drain {
            inner: self.table.drain(),
        }
    }

    /// Retains only the elements specified by the predicate.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use rh_hash::HashSet;
    ///
    /// let mut set: HashSet<i32> = (1..=4).collect();
    /// set.retain(|&x| x % 2 == 0);
    /// assert_eq!(set.len(), 2);
    /// assert!(set.contains(&2));
    /// assert!(set.contains(&4));
    /// ```
    pub fn retain(&mut self, mut f: impl FnMut(&T) -> bool) {
        self.table.retain(|v| f(v));
    }

    /// Returns distance and fill statistics of the index.
    #[cfg(any(test, feature = "stats"))]
    pub fn debug_stats(&self) -> crate::index::DebugStats {
        self.table.debug_stats()
    }

    /// Computes a histogram of Robin Hood scan distances.
    #[cfg(any(test, feature = "stats"))]
    pub fn probe_histogram(&self) -> alloc::vec::Vec<usize> {
        self.table.probe_histogram()
    }

    /// Pretty-prints the probe histogram to stdout.
    #[cfg(all(any(test, feature = "stats"), feature = "std"))]
    pub fn print_probe_histogram(&self) {
        self.table.print_probe_histogram();
    }
}

impl<T, S, A> HashSet<T, S, A>
where
    T: Hash + Eq,
    S: BuildHasher,
    A: Allocator,
{
    /// Adds a value to the set.
    ///
    /// Returns whether the value was newly inserted. An equal value already in
    /// the set is kept and `value` is dropped.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use rh_hash::HashSet;
    ///
    /// let mut set: HashSet<i32> = HashSet::new();
    /// assert!(set.insert(2));
    /// assert!(!set.insert(2));
    /// assert_eq!(set.len(), 1);
    /// ```
    pub fn insert(&mut self, value: T) -> bool {
        let hash = make_hash(&self.hash_builder, &value);
        match self.table.entry(hash, |v| v == &value) {
            TableEntry::Occupied(_) => false,
            TableEntry::Vacant(entry) => {
                entry.insert(value);
                true
            }
        }
    }

    /// Adds a value, replacing and returning an equal value already present.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use rh_hash::HashSet;
    ///
    /// let mut set: HashSet<Vec<i32>> = HashSet::new();
    /// set.insert(Vec::new());
    ///
    /// assert_eq!(set.get(&[][..]).unwrap().capacity(), 0);
    /// set.replace(Vec::with_capacity(10));
    /// assert_eq!(set.get(&[][..]).unwrap().capacity(), 10);
    /// ```
    pub fn replace(&mut self, value: T) -> Option<T> {
        let hash = make_hash(&self.hash_builder, &value);
        match self.table.entry(hash, |v| v == &value) {
            TableEntry::Occupied(mut entry) => Some(core::mem::replace(entry.get_mut(), value)),
            TableEntry::Vacant(entry) => {
                entry.insert(value);
                None
            }
        }
    }

    /// Returns `true` if the set contains a value.
    pub fn contains<Q>(&self, value: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.get_index_of(value).is_some()
    }

    /// Returns a reference to the stored value equal to `value`.
    pub fn get<Q>(&self, value: &Q) -> Option<&T>
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let hash = make_hash(&self.hash_builder, value);
        self.table.find(hash, |v| v.borrow() == value)
    }

    /// Returns the dense position of `value`.
    pub fn get_index_of<Q>(&self, value: &Q) -> Option<usize>
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let hash = make_hash(&self.hash_builder, value);
        self.table.find_index(hash, |v| v.borrow() == value)
    }

    /// Removes a value from the set. Returns whether the value was present.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use rh_hash::HashSet;
    ///
    /// let mut set: HashSet<i32> = HashSet::new();
    /// set.insert(2);
    /// assert!(set.remove(&2));
    /// assert!(!set.remove(&2));
    /// ```
    pub fn remove<Q>(&mut self, value: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.take(value).is_some()
    }

    /// Removes and returns the value in the set equal to `value`.
    pub fn take<Q>(&mut self, value: &Q) -> Option<T>
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let hash = make_hash(&self.hash_builder, value);
        self.table.remove(hash, |v| v.borrow() == value)
    }

    /// Returns `true` if `self` has no elements in common with `other`.
    pub fn is_disjoint(&self, other: &Self) -> bool {
        if self.len() <= other.len() {
            self.iter().all(|v| !other.contains(v))
        } else {
            other.iter().all(|v| !self.contains(v))
        }
    }

    /// Returns `true` if every element of `self` is in `other`.
    pub fn is_subset(&self, other: &Self) -> bool {
        self.len() <= other.len() && self.iter().all(|v| other.contains(v))
    }

    /// Returns `true` if every element of `other` is in `self`.
    pub fn is_superset(&self, other: &Self) -> bool {
        other.is_subset(self)
    }

    /// Visits the values in `self` or `other`, without duplicates.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use rh_hash::HashSet;
    ///
    /// let a: HashSet<i32> = [1, 2].into_iter().collect();
    /// let b: HashSet<i32> = [2, 3].into_iter().collect();
    ///
    /// let union: Vec<_> = a.union(&b).copied().collect();
    /// assert_eq!(union, [1, 2, 3]);
    /// ```
    pub fn union<'a>(&'a self, other: &'a Self) -> Union<'a, T, S, A> {
        Union {
            iter: self.iter(),
            rest: other.difference(self),
        }
    }

    /// Visits the values in both `self` and `other`.
    ///
    /// Iterates the smaller set and probes the larger one.
    pub fn intersection<'a>(&'a self, other: &'a Self) -> Intersection<'a, T, S, A> {
        if self.len() <= other.len() {
            Intersection {
                iter: self.iter(),
                other,
            }
        } else {
            Intersection {
                iter: other.iter(),
                other: self,
            }
        }
    }

    /// Visits the values in `self` but not in `other`.
    pub fn difference<'a>(&'a self, other: &'a Self) -> Difference<'a, T, S, A> {
        Difference {
            iter: self.iter(),
            other,
        }
    }

    /// Visits the values in exactly one of `self` and `other`.
    pub fn symmetric_difference<'a>(&'a self, other: &'a Self) -> SymmetricDifference<'a, T, S, A> {
        SymmetricDifference {
            iter: self.difference(other).chain(other.difference(self)),
        }
    }

    /// Checks the index invariants and that every value is found at its dense
    /// position.
    #[cfg(any(test, feature = "validate"))]
    pub fn validate(&self) {
        self.table.validate();
        for (index, value) in self.iter().enumerate() {
            assert_eq!(
                self.get_index_of(value),
                Some(index),
                "value at dense index {index} is not reachable"
            );
        }
    }
}

impl<T, S: Default> Default for HashSet<T, S> {
    fn default() -> Self {
        Self::with_hasher(S::default())
    }
}

impl<T, S> FromIterator<T> for HashSet<T, S>
where
    T: Hash + Eq,
    S: BuildHasher + Default,
{
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = Self::with_hasher(S::default());
        set.extend(iter);
        set
    }
}

impl<T, S, A> Extend<T> for HashSet<T, S, A>
where
    T: Hash + Eq,
    S: BuildHasher,
    A: Allocator,
{
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        let iter = iter.into_iter();
        self.reserve(iter.size_hint().0);
        for value in iter {
            self.insert(value);
        }
    }
}

impl<'a, T, S, A> Extend<&'a T> for HashSet<T, S, A>
where
    T: Hash + Eq + Copy + 'a,
    S: BuildHasher,
    A: Allocator,
{
    fn extend<I: IntoIterator<Item = &'a T>>(&mut self, iter: I) {
        self.extend(iter.into_iter().copied());
    }
}

impl<T, S, A: Allocator> IntoIterator for HashSet<T, S, A> {
    type Item = T;
    type IntoIter = IntoIter<T, A>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            inner: self.table.into_iter(),
        }
    }
}

impl<'a, T, S, A: Allocator> IntoIterator for &'a HashSet<T, S, A> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// An iterator over the values of a `HashSet`.
#[derive(Clone)]
pub struct Iter<'a, T> {
    inner: hash_table::Iter<'a, T>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}
impl<T> FusedIterator for Iter<'_, T> {}

/// A draining iterator over the values of a `HashSet`.
pub struct Drain<'a, T, A: Allocator = Global> {
    inner: hash_table::Drain<'a, T, A>,
}

impl<T, A: Allocator> Iterator for Drain<'_, T, A> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T, A: Allocator> ExactSizeIterator for Drain<'_, T, A> {}

/// An owning iterator over the values of a `HashSet`.
pub struct IntoIter<T, A: Allocator = Global> {
    inner: hash_table::IntoIter<T, A>,
}

impl<T, A: Allocator> Iterator for IntoIter<T, A> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T, A: Allocator> ExactSizeIterator for IntoIter<T, A> {}

/// An iterator over the union of two sets.
pub struct Union<'a, T, S, A: Allocator = Global> {
    iter: Iter<'a, T>,
    rest: Difference<'a, T, S, A>,
}

impl<'a, T, S, A> Iterator for Union<'a, T, S, A>
where
    T: Hash + Eq,
    S: BuildHasher,
    A: Allocator,
{
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        self.iter.next().or_else(|| self.rest.next())
    }
}

/// An iterator over the intersection of two sets.
pub struct Intersection<'a, T, S, A: Allocator = Global> {
    iter: Iter<'a, T>,
    other: &'a HashSet<T, S, A>,
}

impl<'a, T, S, A> Iterator for Intersection<'a, T, S, A>
where
    T: Hash + Eq,
    S: BuildHasher,
    A: Allocator,
{
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let v = self.iter.next()?;
            if self.other.contains(v) {
                return Some(v);
            }
        }
    }
}

/// An iterator over the difference of two sets.
pub struct Difference<'a, T, S, A: Allocator = Global> {
    iter: Iter<'a, T>,
    other: &'a HashSet<T, S, A>,
}

impl<'a, T, S, A> Iterator for Difference<'a, T, S, A>
where
    T: Hash + Eq,
    S: BuildHasher,
    A: Allocator,
{
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let v = self.iter.next()?;
            if !self.other.contains(v) {
                return Some(v);
            }
        }
    }
}

/// An iterator over the symmetric difference of two sets.
pub struct SymmetricDifference<'a, T, S, A: Allocator = Global> {
    iter: core::iter::Chain<Difference<'a, T, S, A>, Difference<'a, T, S, A>>,
}

impl<'a, T, S, A> Iterator for SymmetricDifference<'a, T, S, A>
where
    T: Hash + Eq,
    S: BuildHasher,
    A: Allocator,
{
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        self.iter.next()
    }
}

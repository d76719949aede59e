use core::borrow::Borrow;
use core::fmt::Debug;
use core::hash::BuildHasher;
use core::hash::Hash;
use core::iter::FusedIterator;
use core::ops::Index;

use crate::allocator::Allocator;
use crate::allocator::Global;
use crate::error::TryReserveError;
use crate::hash::DefaultHashBuilder;
use crate::hash::make_hash;
use crate::hash_table;
use crate::hash_table::Entry as TableEntry;
use crate::hash_table::HashTable;

/// A hash map implemented using the Robin Hood [`HashTable`] as the
/// underlying storage.
///
/// `HashMap<K, V, S>` stores key-value pairs where keys implement `Hash + Eq`
/// and uses a configurable hasher builder `S` to hash keys. Pairs are kept in
/// a dense array, so iteration is a linear walk.
///
/// Inserting a key that is already present keeps the existing value; use
/// [`insert_or_assign`](Self::insert_or_assign) to replace it.
///
/// # Performance Characteristics
///
/// - **Memory**: 8 bytes of index per element of capacity (plus the empty
///   buckets the load factor leaves), plus the size of `(K, V)`.
pub struct HashMap<K, V, S = DefaultHashBuilder, A: Allocator = Global> {
    table: HashTable<(K, V), A>,
    hash_builder: S,
}

impl<K, V, S, A> Debug for HashMap<K, V, S, A>
where
    K: Debug,
    V: Debug,
    A: Allocator,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V, S, A> Clone for HashMap<K, V, S, A>
where
    K: Clone,
    V: Clone,
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

impl<K, V> HashMap<K, V> {
    /// Creates an empty map with the default hasher.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use rh_hash::HashMap;
    /// #
    /// let mut map = HashMap::new();
    /// map.insert(1u32, "one");
    /// assert_eq!(map.get(&1), Some(&"one"));
    /// ```
    pub const fn new() -> Self {
        Self {
            table: HashTable::new(),
            hash_builder: crate::hash::MixState,
        }
    }

    /// Creates an empty map with room for at least `capacity` pairs.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, DefaultHashBuilder::default())
    }
}

impl<K, V, S> HashMap<K, V, S> {
    /// Creates a new hash map with the given hasher builder.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::BuildHasher;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # use rh_hash::HashMap;
    /// #
    /// # struct SimpleHasher;
    /// # impl BuildHasher for SimpleHasher {
    /// #     type Hasher = SipHasher;
    /// #
    /// #     fn build_hasher(&self) -> Self::Hasher {
    /// #         SipHasher::new()
    /// #     }
    /// # }
    /// #
    /// let map: HashMap<i32, String, _> = HashMap::with_hasher(SimpleHasher);
    /// assert!(map.is_empty());
    /// ```
    pub const fn with_hasher(hash_builder: S) -> Self {
        Self {
            table: HashTable::new(),
            hash_builder,
        }
    }

    /// Creates a new hash map with the specified capacity and hasher builder.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use rh_hash::HashMap;
    /// # use rh_hash::hash::MixState;
    /// #
    /// let map: HashMap<i32, String, _> = HashMap::with_capacity_and_hasher(100, MixState);
    /// assert!(map.capacity() >= 100);
    /// ```
    pub fn with_capacity_and_hasher(capacity: usize, hash_builder: S) -> Self {
        Self {
            table: HashTable::with_capacity(capacity),
            hash_builder,
        }
    }
}

impl<K, V, S, A: Allocator> HashMap<K, V, S, A> {
    /// Creates an empty map using `hash_builder` and allocating from `alloc`.
    pub const fn with_hasher_in(hash_builder: S, alloc: A) -> Self {
        Self {
            table: HashTable::new_in(alloc),
            hash_builder,
        }
    }

    /// Creates a map with room for at least `capacity` pairs, using
    /// `hash_builder` and allocating from `alloc`.
    pub fn with_capacity_and_hasher_in(capacity: usize, hash_builder: S, alloc: A) -> Self {
        Self {
            table: HashTable::with_capacity_in(capacity, alloc),
            hash_builder,
        }
    }

    /// Returns a reference to the map's hasher builder.
    pub fn hasher(&self) -> &S {
        &self.hash_builder
    }

    /// Returns a reference to the map's allocator.
    pub fn allocator(&self) -> &A {
        self.table.allocator()
    }

    /// Returns the number of elements in the map.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns `true` if the map contains no elements.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Returns the number of elements the map can hold without reallocating.
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

    /// Clears the map, removing all key-value pairs. Keeps the allocated
    /// memory for reuse.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use rh_hash::HashMap;
    /// #
    /// let mut map = HashMap::new();
    /// map.insert(1u32, "a");
    /// map.clear();
    /// assert!(map.is_empty());
    /// ```
    pub fn clear(&mut self) {
        self.table.clear();
    }

    /// Clears the map and releases its allocation.
    pub fn reset(&mut self) {
        self.table.reset();
    }

    /// Shrinks the capacity of the map as much as possible.
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

    /// Returns the pair at dense position `index`.
    pub fn get_index(&self, index: usize) -> Option<(&K, &V)> {
        self.table.get_index(index).map(|(k, v)| (k, v))
    }

    /// Returns the pair at dense position `index` with a mutable value.
    pub fn get_index_mut(&mut self, index: usize) -> Option<(&K, &mut V)> {
        self.table.get_index_mut(index).map(|(k, v)| (&*k, v))
    }

    /// Removes the pair at dense position `index`, moving the last pair into
    /// its place.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len()`.
    pub fn swap_remove_index(&mut self, index: usize) -> (K, V) {
        self.table.swap_remove_index(index)
    }

    /// Retains only the pairs for which `f` returns `true`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use rh_hash::HashMap;
    /// #
    /// let mut map: HashMap<u32, u32> = (0..8).map(|k| (k, k * 10)).collect();
    /// map.retain(|&k, _| k % 2 == 0);
    /// assert_eq!(map.len(), 4);
    /// ```
    pub fn retain(&mut self, mut f: impl FnMut(&K, &mut V) -> bool) {
        self.table.retain(|(k, v)| f(k, v));
    }

    /// An iterator visiting all key-value pairs in dense order.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use rh_hash::HashMap;
    /// #
    /// let mut map = HashMap::new();
    /// map.insert(1u32, "a");
    /// map.insert(2u32, "b");
    ///
    /// let pairs: Vec<_> = map.iter().collect();
    /// assert_eq!(pairs, [(&1, &"a"), (&2, &"b")]);
    /// ```
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            inner: self.table.iter(),
        }
    }

    /// An iterator visiting all pairs with mutable references to the values.
    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        IterMut {
            inner: self.table.iter_mut(),
        }
    }

    /// An iterator visiting all keys.
    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys { inner: self.iter() }
    }

    /// An iterator visiting all values.
    pub fn values(&self) -> Values<'_, K, V> {
        Values { inner: self.iter() }
    }

    /// An iterator visiting all values mutably.
    pub fn values_mut(&mut self) -> ValuesMut<'_, K, V> {
        ValuesMut {
            inner: self.iter_mut(),
        }
    }

    /// Clears the map, returning all key-value pairs as an iterator.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use rh_hash::HashMap;
    /// #
    /// let mut map = HashMap::new();
    /// map.insert(1u32, "a");
    /// map.insert(2u32, "b");
    ///
    /// let mut drained: Vec<_> = map.drain().collect();
    /// drained.sort();
    /// assert_eq!(drained, [(1, "a"), (2, "b")]);
    /// assert!(map.is_empty());
    /// ```
    pub fn drain(&mut self) -> Drain<'_, K, V, A> {
        Drain {
            inner: self.table.drain(),
        }
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

impl<K, V, S, A> HashMap<K, V, S, A>
where
    K: Hash + Eq,
    S: BuildHasher,
    A: Allocator,
{
    /// Inserts a key-value pair unless the key is already present.
    ///
    /// Returns a reference to the value stored under `key` and whether the
    /// pair was inserted. An existing value is left untouched and `value` is
    /// dropped.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use rh_hash::HashMap;
    /// #
    /// let mut map = HashMap::new();
    /// assert_eq!(map.insert(37u32, "a"), (&mut "a", true));
    /// assert_eq!(map.insert(37u32, "b"), (&mut "a", false));
    /// assert_eq!(map.get(&37), Some(&"a"));
    /// ```
    pub fn insert(&mut self, key: K, value: V) -> (&mut V, bool) {
        let hash = make_hash(&self.hash_builder, &key);
        match self.table.entry(hash, |(k, _)| k == &key) {
            TableEntry::Occupied(entry) => (&mut entry.into_mut().1, false),
            TableEntry::Vacant(entry) => (&mut entry.insert((key, value)).1, true),
        }
    }

    /// Inserts a key-value pair, replacing and returning any previous value.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use rh_hash::HashMap;
    /// #
    /// let mut map = HashMap::new();
    /// assert_eq!(map.insert_or_assign(37u32, "a"), None);
    /// assert_eq!(map.insert_or_assign(37u32, "b"), Some("a"));
    /// assert_eq!(map[&37], "b");
    /// ```
    pub fn insert_or_assign(&mut self, key: K, value: V) -> Option<V> {
        let hash = make_hash(&self.hash_builder, &key);
        match self.table.entry(hash, |(k, _)| k == &key) {
            TableEntry::Occupied(mut entry) => {
                Some(core::mem::replace(&mut entry.get_mut().1, value))
            }
            TableEntry::Vacant(entry) => {
                entry.insert((key, value));
                None
            }
        }
    }

    /// Returns a reference to the value corresponding to the key.
    ///
    /// The key may be any borrowed form of the map's key type.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use rh_hash::HashMap;
    /// #
    /// let mut map = HashMap::new();
    /// map.insert("one".to_string(), 1);
    /// assert_eq!(map.get("one"), Some(&1));
    /// assert_eq!(map.get("two"), None);
    /// ```
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.get_key_value(key).map(|(_, v)| v)
    }

    /// Returns the stored key and value corresponding to `key`.
    pub fn get_key_value<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let hash = make_hash(&self.hash_builder, key);
        self.table
            .find(hash, |(k, _)| k.borrow() == key)
            .map(|(k, v)| (k, v))
    }

    /// Returns a mutable reference to the value corresponding to the key.
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let hash = make_hash(&self.hash_builder, key);
        self.table
            .find_mut(hash, |(k, _)| k.borrow() == key)
            .map(|(_, v)| v)
    }

    /// Returns the dense position of `key`.
    pub fn get_index_of<Q>(&self, key: &Q) -> Option<usize>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let hash = make_hash(&self.hash_builder, key);
        self.table.find_index(hash, |(k, _)| k.borrow() == key)
    }

    /// Returns `true` if the map contains a value for the specified key.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.get_index_of(key).is_some()
    }

    /// Removes a key from the map, returning the value if it was present.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use rh_hash::HashMap;
    /// #
    /// let mut map = HashMap::new();
    /// map.insert(1u32, "a");
    /// assert_eq!(map.remove(&1), Some("a"));
    /// assert_eq!(map.remove(&1), None);
    /// ```
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.remove_entry(key).map(|(_, v)| v)
    }

    /// Removes a key from the map, returning the stored key and value.
    pub fn remove_entry<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let hash = make_hash(&self.hash_builder, key);
        self.table.remove(hash, |(k, _)| k.borrow() == key)
    }

    /// Gets the given key's corresponding entry for in-place manipulation.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use rh_hash::HashMap;
    /// #
    /// let mut letters = HashMap::new();
    /// for ch in "a short treatise on fungi".chars() {
    ///     *letters.entry(ch).or_insert(0) += 1;
    /// }
    ///
    /// assert_eq!(letters[&'s'], 2);
    /// assert_eq!(letters[&'t'], 3);
    /// assert_eq!(letters.get(&'y'), None);
    /// ```
    pub fn entry(&mut self, key: K) -> Entry<'_, K, V, A> {
        let hash = make_hash(&self.hash_builder, &key);
        match self.table.entry(hash, |(k, _)| k == &key) {
            TableEntry::Occupied(entry) => Entry::Occupied(OccupiedEntry { entry }),
            TableEntry::Vacant(entry) => Entry::Vacant(VacantEntry { entry, key }),
        }
    }

    /// Checks the index invariants and that every key is found at its dense
    /// position.
    #[cfg(any(test, feature = "validate"))]
    pub fn validate(&self) {
        self.table.validate();
        for (index, (key, _)) in self.iter().enumerate() {
            assert_eq!(
                self.get_index_of(key),
                Some(index),
                "key at dense index {index} is not reachable"
            );
        }
    }
}

impl<K, V, S: Default> Default for HashMap<K, V, S> {
    fn default() -> Self {
        Self::with_hasher(S::default())
    }
}

impl<K, V, S, A> PartialEq for HashMap<K, V, S, A>
where
    K: Hash + Eq,
    V: PartialEq,
    S: BuildHasher,
    A: Allocator,
{
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(k, v)| other.get(k).is_some_and(|theirs| v == theirs))
    }
}

impl<K, V, S, A> Eq for HashMap<K, V, S, A>
where
    K: Hash + Eq,
    V: Eq,
    S: BuildHasher,
    A: Allocator,
{
}

impl<K, Q, V, S, A> Index<&Q> for HashMap<K, V, S, A>
where
    K: Borrow<Q> + Hash + Eq,
    Q: Hash + Eq + ?Sized,
    S: BuildHasher,
    A: Allocator,
{
    type Output = V;

    /// # Panics
    ///
    /// Panics if the key is not present.
    fn index(&self, key: &Q) -> &V {
        match self.get(key) {
            Some(value) => value,
            None => panic!("key not found"),
        }
    }
}

impl<K, V, S> FromIterator<(K, V)> for HashMap<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::with_hasher(S::default());
        map.extend(iter);
        map
    }
}

/// Later pairs replace the values of earlier ones with the same key.
impl<K, V, S, A> Extend<(K, V)> for HashMap<K, V, S, A>
where
    K: Hash + Eq,
    S: BuildHasher,
    A: Allocator,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        let iter = iter.into_iter();
        self.reserve(iter.size_hint().0);
        for (key, value) in iter {
            self.insert_or_assign(key, value);
        }
    }
}

impl<K, V, S, A: Allocator> IntoIterator for HashMap<K, V, S, A> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V, A>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            inner: self.table.into_iter(),
        }
    }
}

impl<'a, K, V, S, A: Allocator> IntoIterator for &'a HashMap<K, V, S, A> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, K, V, S, A: Allocator> IntoIterator for &'a mut HashMap<K, V, S, A> {
    type Item = (&'a K, &'a mut V);
    type IntoIter = IterMut<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

/// A view into a single entry in a map, which may either be vacant or
/// occupied.
///
/// This enum is constructed from the [`entry`] method on [`HashMap`].
///
/// [`entry`]: HashMap::entry
pub enum Entry<'a, K, V, A: Allocator = Global> {
    /// A vacant entry.
    Vacant(VacantEntry<'a, K, V, A>),
    /// An occupied entry.
    Occupied(OccupiedEntry<'a, K, V, A>),
}

impl<'a, K, V, A: Allocator> Entry<'a, K, V, A> {
    /// Inserts a default value if the entry is vacant and returns a mutable
    /// reference.
    pub fn or_insert(self, default: V) -> &'a mut V {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default),
        }
    }

    /// Inserts a value computed from a closure if the entry is vacant and
    /// returns a mutable reference.
    pub fn or_insert_with<F>(self, default: F) -> &'a mut V
    where
        F: FnOnce() -> V,
    {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default()),
        }
    }

    /// Like [`or_insert_with`](Self::or_insert_with), passing the key to the
    /// closure.
    pub fn or_insert_with_key<F>(self, default: F) -> &'a mut V
    where
        F: FnOnce(&K) -> V,
    {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let value = default(&entry.key);
                entry.insert(value)
            }
        }
    }

    /// Provides in-place mutable access to an occupied entry before any
    /// potential inserts.
    pub fn and_modify<F>(self, f: F) -> Self
    where
        F: FnOnce(&mut V),
    {
        match self {
            Entry::Occupied(mut entry) => {
                f(entry.get_mut());
                Entry::Occupied(entry)
            }
            Entry::Vacant(entry) => Entry::Vacant(entry),
        }
    }

    /// Returns a reference to this entry's key.
    pub fn key(&self) -> &K {
        match self {
            Entry::Occupied(entry) => entry.key(),
            Entry::Vacant(entry) => entry.key(),
        }
    }
}

impl<'a, K, V, A> Entry<'a, K, V, A>
where
    V: Default,
    A: Allocator,
{
    /// Inserts the default value if the entry is vacant and returns a mutable
    /// reference.
    pub fn or_default(self) -> &'a mut V {
        self.or_insert_with(Default::default)
    }
}

/// A view into a vacant entry in the map.
pub struct VacantEntry<'a, K, V, A: Allocator = Global> {
    entry: hash_table::VacantEntry<'a, (K, V), A>,
    key: K,
}

impl<'a, K, V, A: Allocator> VacantEntry<'a, K, V, A> {
    /// Gets a reference to the key that would be used when inserting a value.
    pub fn key(&self) -> &K {
        &self.key
    }

    /// Take ownership of the key.
    pub fn into_key(self) -> K {
        self.key
    }

    /// Inserts the value into the map and returns a mutable reference to it.
    pub fn insert(self, value: V) -> &'a mut V {
        &mut self.entry.insert((self.key, value)).1
    }
}

/// A view into an occupied entry in the map.
pub struct OccupiedEntry<'a, K, V, A: Allocator = Global> {
    entry: hash_table::OccupiedEntry<'a, (K, V), A>,
}

impl<'a, K, V, A: Allocator> OccupiedEntry<'a, K, V, A> {
    /// Gets a reference to the key in the entry.
    pub fn key(&self) -> &K {
        &self.entry.get().0
    }

    /// Gets a reference to the value in the entry.
    pub fn get(&self) -> &V {
        &self.entry.get().1
    }

    /// Gets a mutable reference to the value in the entry.
    pub fn get_mut(&mut self) -> &mut V {
        &mut self.entry.get_mut().1
    }

    /// Converts the entry into a mutable reference to the value.
    pub fn into_mut(self) -> &'a mut V {
        &mut self.entry.into_mut().1
    }

    /// The dense position of the pair.
    pub fn index(&self) -> usize {
        self.entry.index()
    }

    /// Inserts a value into the entry and returns the old value.
    pub fn insert(&mut self, value: V) -> V {
        core::mem::replace(&mut self.entry.get_mut().1, value)
    }

    /// Removes the entry from the map and returns the value.
    pub fn remove(self) -> V {
        self.entry.remove().1
    }

    /// Removes the entry from the map and returns the key and value.
    pub fn remove_entry(self) -> (K, V) {
        self.entry.remove()
    }
}

/// An iterator over the key-value pairs of a `HashMap`.
#[derive(Clone)]
pub struct Iter<'a, K, V> {
    inner: hash_table::Iter<'a, (K, V)>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, v)| (k, v))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}
impl<K, V> FusedIterator for Iter<'_, K, V> {}

/// A mutable iterator over the key-value pairs of a `HashMap`.
pub struct IterMut<'a, K, V> {
    inner: hash_table::IterMut<'a, (K, V)>,
}

impl<'a, K, V> Iterator for IterMut<'a, K, V> {
    type Item = (&'a K, &'a mut V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, v)| (&*k, v))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for IterMut<'_, K, V> {}
impl<K, V> FusedIterator for IterMut<'_, K, V> {}

/// An iterator over the keys of a `HashMap`.
#[derive(Clone)]
pub struct Keys<'a, K, V> {
    inner: Iter<'a, K, V>,
}

impl<'a, K, V> Iterator for Keys<'a, K, V> {
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, _)| k)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Keys<'_, K, V> {}

/// An iterator over the values of a `HashMap`.
#[derive(Clone)]
pub struct Values<'a, K, V> {
    inner: Iter<'a, K, V>,
}

impl<'a, K, V> Iterator for Values<'a, K, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Values<'_, K, V> {}

/// A mutable iterator over the values of a `HashMap`.
pub struct ValuesMut<'a, K, V> {
    inner: IterMut<'a, K, V>,
}

impl<'a, K, V> Iterator for ValuesMut<'a, K, V> {
    type Item = &'a mut V;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for ValuesMut<'_, K, V> {}

/// A draining iterator over the key-value pairs of a `HashMap`.
pub struct Drain<'a, K, V, A: Allocator = Global> {
    inner: hash_table::Drain<'a, (K, V), A>,
}

impl<K, V, A: Allocator> Iterator for Drain<'_, K, V, A> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V, A: Allocator> ExactSizeIterator for Drain<'_, K, V, A> {}

/// An owning iterator over the key-value pairs of a `HashMap`.
pub struct IntoIter<K, V, A: Allocator = Global> {
    inner: hash_table::IntoIter<(K, V), A>,
}

impl<K, V, A: Allocator> Iterator for IntoIter<K, V, A> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V, A: Allocator> ExactSizeIterator for IntoIter<K, V, A> {}

#[cfg(test)]
mod tests {
    use alloc::format;
    use alloc::string::String;
    use alloc::string::ToString;
    use alloc::vec;
    use alloc::vec::Vec;
    use core::hash::BuildHasher;
    use core::hash::Hasher;

    use rand::TryRngCore;
    use rand::rngs::OsRng;
    use siphasher::sip::SipHasher;

    use super::*;
    use crate::allocator::CountingAllocator;

    #[derive(Clone)]
    struct SipHashBuilder {
        k1: u64,
        k2: u64,
    }

    impl BuildHasher for SipHashBuilder {
        type Hasher = SipHasher;

        fn build_hasher(&self) -> Self::Hasher {
            SipHasher::new_with_keys(self.k1, self.k2)
        }
    }

    impl Default for SipHashBuilder {
        fn default() -> Self {
            let mut rng = OsRng;
            Self {
                k1: rng.try_next_u64().unwrap_or(0),
                k2: rng.try_next_u64().unwrap_or(0),
            }
        }
    }

    /// Hashes integer keys to themselves.
    #[derive(Clone, Copy, Default)]
    struct IdentityState;

    #[derive(Default)]
    struct IdentityHasher(u64);

    impl Hasher for IdentityHasher {
        fn finish(&self) -> u64 {
            self.0
        }

        fn write(&mut self, bytes: &[u8]) {
            for &b in bytes {
                self.0 = (self.0 << 8) | u64::from(b);
            }
        }

        fn write_u32(&mut self, i: u32) {
            self.0 = u64::from(i);
        }
    }

    impl BuildHasher for IdentityState {
        type Hasher = IdentityHasher;

        fn build_hasher(&self) -> Self::Hasher {
            IdentityHasher::default()
        }
    }

    #[test]
    fn test_new_and_with_hasher() {
        let map: HashMap<i32, String, SipHashBuilder> = HashMap::default();
        assert!(map.is_empty());
        assert_eq!(map.len(), 0);

        let map2 = HashMap::<i32, String, _>::with_hasher(SipHashBuilder::default());
        assert!(map2.is_empty());
        assert_eq!(map2.capacity(), 0);

        let map3: HashMap<u32, u32> = HashMap::new();
        assert!(map3.is_empty());
    }

    #[test]
    fn test_with_capacity() {
        let map: HashMap<i32, String> = HashMap::with_capacity(100);
        assert!(map.capacity() >= 100);
        assert!(map.is_empty());

        let map2 =
            HashMap::<i32, String, _>::with_capacity_and_hasher(200, SipHashBuilder::default());
        assert!(map2.capacity() >= 200);
        assert!(map2.is_empty());
    }

    #[test]
    fn test_insert_and_get() {
        let mut map = HashMap::with_hasher(SipHashBuilder::default());

        let (value, inserted) = map.insert(1, "hello".to_string());
        assert!(inserted);
        assert_eq!(value, "hello");
        assert_eq!(map.len(), 1);
        assert!(!map.is_empty());

        assert_eq!(map.get(&1), Some(&"hello".to_string()));
        assert_eq!(map.get(&2), None);

        let (value, inserted) = map.insert(1, "world".to_string());
        assert!(!inserted);
        assert_eq!(value, "hello");
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(&1), Some(&"hello".to_string()));
    }

    #[test]
    fn test_insert_or_assign() {
        let mut map = HashMap::with_hasher(SipHashBuilder::default());
        assert_eq!(map.insert_or_assign(1, "hello".to_string()), None);
        assert_eq!(
            map.insert_or_assign(1, "world".to_string()),
            Some("hello".to_string())
        );
        assert_eq!(map.len(), 1);
        assert_eq!(map[&1], "world");
    }

    #[test]
    fn test_get_mut() {
        let mut map = HashMap::with_hasher(SipHashBuilder::default());
        map.insert(1, "hello".to_string());

        if let Some(value) = map.get_mut(&1) {
            value.push_str(" world");
        }

        assert_eq!(map.get(&1), Some(&"hello world".to_string()));
        assert_eq!(map.get_mut(&2), None);
    }

    #[test]
    fn test_contains_key() {
        let mut map = HashMap::with_hasher(SipHashBuilder::default());
        assert!(!map.contains_key(&1));

        map.insert(1, "value".to_string());
        assert!(map.contains_key(&1));
        assert!(!map.contains_key(&2));
    }

    #[test]
    fn test_remove() {
        let mut map = HashMap::with_hasher(SipHashBuilder::default());
        map.insert(1, "hello".to_string());
        map.insert(2, "world".to_string());

        assert_eq!(map.remove(&1), Some("hello".to_string()));
        assert_eq!(map.len(), 1);
        assert!(!map.contains_key(&1));
        assert!(map.contains_key(&2));

        assert_eq!(map.remove(&1), None);
        assert_eq!(map.remove(&3), None);
    }

    #[test]
    fn test_remove_entry() {
        let mut map = HashMap::with_hasher(SipHashBuilder::default());
        map.insert(1, "hello".to_string());

        assert_eq!(map.remove_entry(&1), Some((1, "hello".to_string())));
        assert_eq!(map.len(), 0);
        assert_eq!(map.remove_entry(&1), None);
    }

    #[test]
    fn test_clear_and_reset() {
        let mut map = HashMap::with_hasher(SipHashBuilder::default());
        map.insert(1, "hello".to_string());
        map.insert(2, "world".to_string());

        assert_eq!(map.len(), 2);
        map.clear();
        assert_eq!(map.len(), 0);
        assert!(map.is_empty());
        assert!(map.capacity() > 0);
        assert!(!map.contains_key(&1));
        assert!(!map.contains_key(&2));

        map.insert(3, "three".to_string());
        map.reset();
        assert_eq!(map.capacity(), 0);
        assert!(!map.contains_key(&3));
    }

    #[test]
    fn test_reserve() {
        let mut map = HashMap::<i32, String, _>::with_hasher(SipHashBuilder::default());
        let initial_capacity = map.capacity();

        map.reserve(1000);
        assert!(map.capacity() >= initial_capacity + 1000);
        assert_eq!(
            map.try_reserve(usize::MAX),
            Err(TryReserveError::CapacityOverflow)
        );
    }

    #[test]
    fn test_entry_api() {
        let mut map = HashMap::with_hasher(SipHashBuilder::default());

        let value = map.entry(1).or_insert("hello".to_string());
        assert_eq!(value, &"hello".to_string());
        assert_eq!(map.len(), 1);

        let value = map.entry(1).or_insert("world".to_string());
        assert_eq!(value, &"hello".to_string());
        assert_eq!(map.len(), 1);

        map.entry(2).or_insert_with(|| "computed".to_string());
        assert_eq!(map.get(&2), Some(&"computed".to_string()));

        map.entry(1)
            .and_modify(|v| v.push_str(" world"))
            .or_insert("default".to_string());
        assert_eq!(map.get(&1), Some(&"hello world".to_string()));

        map.entry(7).or_insert_with_key(|k| format!("key {k}"));
        assert_eq!(map[&7], "key 7");

        assert_eq!(map.entry(3).key(), &3);
        map.validate();
    }

    #[test]
    fn test_entry_or_default() {
        let mut map: HashMap<i32, Vec<i32>, SipHashBuilder> =
            HashMap::with_hasher(SipHashBuilder::default());

        map.entry(1).or_default().push(42);
        assert_eq!(map.get(&1), Some(&vec![42]));

        map.entry(1).or_default().push(24);
        assert_eq!(map.get(&1), Some(&vec![42, 24]));
    }

    #[test]
    fn test_occupied_entry() {
        let mut map = HashMap::with_hasher(SipHashBuilder::default());
        map.insert(1, "hello".to_string());

        match map.entry(1) {
            Entry::Occupied(mut entry) => {
                assert_eq!(entry.key(), &1);
                assert_eq!(entry.get(), &"hello".to_string());
                assert_eq!(entry.index(), 0);

                *entry.get_mut() = "world".to_string();
                assert_eq!(entry.get(), &"world".to_string());

                let old_value = entry.insert("new".to_string());
                assert_eq!(old_value, "world".to_string());
                assert_eq!(entry.get(), &"new".to_string());

                let (key, value) = entry.remove_entry();
                assert_eq!(key, 1);
                assert_eq!(value, "new".to_string());
            }
            Entry::Vacant(_) => panic!("Expected occupied entry"),
        }

        assert!(map.is_empty());
    }

    #[test]
    fn test_vacant_entry() {
        let mut map = HashMap::with_hasher(SipHashBuilder::default());

        match map.entry(1) {
            Entry::Vacant(entry) => {
                assert_eq!(entry.key(), &1);

                let value = entry.insert("hello".to_string());
                assert_eq!(value, &"hello".to_string());
            }
            Entry::Occupied(_) => panic!("Expected vacant entry"),
        }

        assert_eq!(map.len(), 1);
        assert_eq!(map.get(&1), Some(&"hello".to_string()));

        match map.entry(2) {
            Entry::Vacant(entry) => assert_eq!(entry.into_key(), 2),
            Entry::Occupied(_) => panic!("Expected vacant entry"),
        }
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_iterators() {
        let mut map = HashMap::with_hasher(SipHashBuilder::default());
        map.insert(1, "one".to_string());
        map.insert(2, "two".to_string());
        map.insert(3, "three".to_string());

        let pairs: std::collections::HashMap<i32, String> =
            map.iter().map(|(k, v)| (*k, v.clone())).collect();
        assert_eq!(pairs.len(), 3);
        assert_eq!(pairs.get(&1), Some(&"one".to_string()));
        assert_eq!(pairs.get(&2), Some(&"two".to_string()));
        assert_eq!(pairs.get(&3), Some(&"three".to_string()));

        let keys: Vec<i32> = map.keys().copied().collect();
        assert_eq!(keys, [1, 2, 3]);

        let values: std::collections::HashSet<String> = map.values().cloned().collect();
        assert_eq!(values.len(), 3);
        assert!(values.contains("one"));
        assert!(values.contains("two"));
        assert!(values.contains("three"));

        for value in map.values_mut() {
            value.push('!');
        }
        for (_, value) in &mut map {
            value.push('?');
        }
        assert_eq!(map[&2], "two!?");
        assert_eq!(map.iter().len(), 3);
        assert_eq!(map.get_index(0), Some((&1, &"one!?".to_string())));
    }

    #[test]
    fn test_drain() {
        let mut map = HashMap::with_hasher(SipHashBuilder::default());
        map.insert(1, "one".to_string());
        map.insert(2, "two".to_string());
        map.insert(3, "three".to_string());

        let drained: std::collections::HashMap<i32, String> = map.drain().collect();
        assert_eq!(drained.len(), 3);
        assert!(map.is_empty());

        assert_eq!(drained.get(&1), Some(&"one".to_string()));
        assert_eq!(drained.get(&2), Some(&"two".to_string()));
        assert_eq!(drained.get(&3), Some(&"three".to_string()));
    }

    #[test]
    fn test_into_iter() {
        let map: HashMap<u32, String> = (0..10).map(|k| (k, k.to_string())).collect();
        let mut pairs: Vec<(u32, String)> = map.into_iter().collect();
        pairs.sort();
        assert_eq!(pairs.len(), 10);
        assert_eq!(pairs[4], (4, "4".to_string()));
    }

    #[test]
    fn test_insertion_order_is_dense_order() {
        let mut map = HashMap::with_hasher(SipHashBuilder::default());
        for i in 0..100usize {
            map.insert(i, format!("v{i}"));
        }
        assert_eq!(map.len(), 100);

        for i in 0..100usize {
            assert_eq!(map.get_index_of(&i), Some(i));
            let (k, v) = map.get_index(i).unwrap();
            assert_eq!((*k, v.as_str()), (i, format!("v{i}").as_str()));
        }
        assert_eq!(map.get_index(100), None);
        map.validate();
    }

    #[test]
    fn test_collision_handling() {
        let mut map = HashMap::with_hasher(SipHashBuilder::default());

        for i in 0..1000 {
            map.insert(i, i * 2);
        }

        assert_eq!(map.len(), 1000);

        for i in 0..1000 {
            assert_eq!(map.get(&i), Some(&(i * 2)));
        }

        for i in (0..1000).step_by(2) {
            assert_eq!(map.remove(&i), Some(i * 2));
        }

        assert_eq!(map.len(), 500);

        for i in (1..1000).step_by(2) {
            assert_eq!(map.get(&i), Some(&(i * 2)));
        }
        map.validate();
    }

    #[test]
    fn identity_hash_scenario() {
        let mut map: HashMap<u32, u32, IdentityState> = HashMap::default();
        for k in 0..1000 {
            map.insert(k, k);
        }
        assert_eq!(map.len(), 1000);
        for k in 0..1000 {
            assert_eq!(map.get(&k), Some(&k));
        }

        for k in (0..1000).filter(|k| k % 7 == 0) {
            assert_eq!(map.remove(&k), Some(k));
        }
        assert_eq!(map.len(), 1000 - 143);
        assert!(map.keys().all(|k| k % 7 != 0));
        for k in 0..1000 {
            assert_eq!(map.contains_key(&k), k % 7 != 0);
        }
        map.validate();
    }

    #[test]
    fn test_string_keys() {
        let mut map = HashMap::with_hasher(SipHashBuilder::default());

        map.insert("hello".to_string(), 1);
        map.insert("world".to_string(), 2);
        map.insert("rust".to_string(), 3);

        assert_eq!(map.get("hello"), Some(&1));
        assert_eq!(map.get(&"world".to_string()), Some(&2));
        assert_eq!(map.get("rust"), Some(&3));
        assert_eq!(map.get("missing"), None);
        assert_eq!(map.remove("hello"), Some(1));
        assert!(!map.contains_key("hello"));
    }

    #[test]
    fn test_remove_relocates_last_pair() {
        let mut map = HashMap::with_hasher(SipHashBuilder::default());
        for (i, name) in ["zero", "one", "two", "three"].into_iter().enumerate() {
            map.insert(name.to_string(), vec![i; i]);
        }

        assert_eq!(map.remove("one"), Some(vec![1]));
        assert_eq!(map.get_index_of("three"), Some(1));
        assert_eq!(map.get_index(1).map(|(k, _)| k.as_str()), Some("three"));

        map.get_mut("three").unwrap().push(7);
        assert_eq!(map["three"], [3, 3, 3, 7]);

        assert_eq!(map.remove("three"), Some(vec![3, 3, 3, 7]));
        assert_eq!(map.get_index_of("two"), Some(1));
        assert_eq!(map.keys().map(String::as_str).collect::<Vec<_>>(), ["zero", "two"]);
        map.validate();
    }

    #[test]
    fn test_equality_ignores_order() {
        let a: HashMap<u32, u32> = (0..50).map(|k| (k, k + 1)).collect();
        let b: HashMap<u32, u32> = (0..50).rev().map(|k| (k, k + 1)).collect();
        assert_eq!(a, b);

        let mut c = b.clone();
        c.insert_or_assign(3, 0);
        assert_ne!(a, c);
        c.remove(&3);
        assert_ne!(a, c);
    }

    #[test]
    fn test_extend_replaces() {
        let mut map: HashMap<u32, &str> = HashMap::new();
        map.extend([(1, "a"), (2, "b")]);
        map.extend([(1, "c")]);
        assert_eq!(map.len(), 2);
        assert_eq!(map[&1], "c");
    }

    #[test]
    #[should_panic(expected = "key not found")]
    fn test_index_missing_key() {
        let map: HashMap<u32, u32> = HashMap::new();
        let _ = map[&1];
    }

    #[test]
    fn test_retain_and_swap_remove_index() {
        let mut map: HashMap<u32, u32> = (0..20).map(|k| (k, k)).collect();
        map.retain(|k, v| {
            *v *= 2;
            k % 4 == 0
        });
        assert_eq!(map.len(), 5);
        assert!(map.iter().all(|(k, v)| k % 4 == 0 && *v == k * 2));

        let index = map.get_index_of(&8).unwrap();
        assert_eq!(map.swap_remove_index(index), (8, 16));
        assert!(!map.contains_key(&8));
        map.validate();
    }

    #[test]
    fn test_clone_and_clone_from() {
        let counter = CountingAllocator::default();
        let mut src = HashMap::with_hasher_in(SipHashBuilder::default(), &counter);
        for i in 0..64 {
            src.insert(i, i.to_string());
        }

        let mut dst = src.clone();
        assert_eq!(dst, src);
        dst.validate();

        src.insert(64, "64".to_string());
        let allocations = counter.allocations.get();
        dst.clone_from(&src);
        assert_eq!(dst.len(), 65);
        assert_eq!(dst.get(&64).map(String::as_str), Some("64"));
        assert!(counter.allocations.get() <= allocations + 1);

        drop(src);
        drop(dst);
        assert_eq!(counter.live(), 0);
    }

    #[test]
    fn test_debug_format() {
        let mut map: HashMap<u32, &str> = HashMap::new();
        map.insert(1, "a");
        assert_eq!(format!("{map:?}"), r#"{1: "a"}"#);
    }

    #[test]
    fn test_load_factor() {
        let mut map: HashMap<u32, u32> = HashMap::new();
        assert_eq!(map.load_factor(), 0.8);
        map.set_load_factor(0.5);
        map.reserve(100);
        let stats = map.debug_stats();
        assert!(stats.fill <= 0.5);
        assert!(map.capacity() * 2 <= stats.num_entries);
    }

    #[cfg(feature = "foldhash")]
    #[test]
    fn test_random_state() {
        let mut map = HashMap::with_hasher(crate::hash::RandomState::default());
        for i in 0..500u64 {
            map.insert(i, i);
        }
        assert_eq!(map.len(), 500);
        assert!((0..500u64).all(|i| map.get(&i) == Some(&i)));
        map.validate();
    }
}

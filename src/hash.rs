use core::hash::BuildHasher;
use core::hash::Hash;
use core::hash::Hasher;

/// Seeded, DoS-resistant hasher builder from `foldhash`.
#[cfg(feature = "foldhash")]
pub type RandomState = foldhash::fast::RandomState;

/// The hasher builder used when none is specified.
pub type DefaultHashBuilder = MixState;

const BUFFER_SEED: u32 = 0x9e37_79b9;

/// Avalanching finalizer for 32-bit integers.
#[inline]
pub const fn mix32(mut v: u32) -> u32 {
    v ^= v >> 16;
    v = v.wrapping_mul(0x7feb_352d);
    v ^= v >> 15;
    v = v.wrapping_mul(0x846c_a68b);
    v ^= v >> 16;
    v
}

/// Avalanching finalizer for 64-bit integers.
#[inline]
pub const fn mix64(mut v: u64) -> u64 {
    v ^= v >> 32;
    v = v.wrapping_mul(0xd6e8_feb8_6659_fd93);
    v ^= v >> 32;
    v = v.wrapping_mul(0xd6e8_feb8_6659_fd93);
    v ^= v >> 32;
    v
}

/// Word-at-a-time hash of a byte buffer.
///
/// Full little-endian words are folded in order; trailing bytes are packed
/// big-end-first into one final word.
pub fn hash_buffer(data: &[u8]) -> u32 {
    let mut hash = 0u32;

    let mut words = data.chunks_exact(4);
    for word in &mut words {
        let word = u32::from_le_bytes([word[0], word[1], word[2], word[3]]);
        hash = (hash.rotate_left(5) ^ word).wrapping_mul(BUFFER_SEED);
    }

    let tail = words.remainder();
    if !tail.is_empty() {
        let word = tail.iter().fold(0u32, |w, &b| (w << 8) | u32::from(b));
        hash = (hash.rotate_left(5) ^ word).wrapping_mul(BUFFER_SEED);
    }

    hash
}

/// Folds a 64-bit hasher output into the 32-bit hash the index consumes.
#[inline(always)]
pub const fn fold(hash: u64) -> u32 {
    (hash ^ (hash >> 32)) as u32
}

/// Hashes `value` with `builder` and folds the result to 32 bits.
#[inline]
pub fn make_hash<Q, S>(builder: &S, value: &Q) -> u32
where
    Q: Hash + ?Sized,
    S: BuildHasher,
{
    fold(builder.hash_one(value))
}

/// Builder for [`MixHasher`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MixState;

impl BuildHasher for MixState {
    type Hasher = MixHasher;

    #[inline]
    fn build_hasher(&self) -> MixHasher {
        MixHasher::default()
    }
}

/// Integer mixing hasher.
///
/// A single integer key hashes to [`mix32`] (for keys of 32 bits or less) or
/// the low 32 bits of [`mix64`] of itself. Byte slices go through
/// [`hash_buffer`]. The state never exceeds 32 bits, so [`fold`] leaves it
/// unchanged.
#[derive(Clone, Copy, Debug, Default)]
pub struct MixHasher {
    state: u64,
}

impl Hasher for MixHasher {
    #[inline]
    fn finish(&self) -> u64 {
        self.state
    }

    #[inline]
    fn write(&mut self, bytes: &[u8]) {
        self.state = u64::from(mix32(fold(self.state) ^ hash_buffer(bytes)));
    }

    #[inline]
    fn write_u8(&mut self, i: u8) {
        self.write_u32(u32::from(i));
    }

    #[inline]
    fn write_u16(&mut self, i: u16) {
        self.write_u32(u32::from(i));
    }

    #[inline]
    fn write_u32(&mut self, i: u32) {
        self.state = u64::from(mix32(fold(self.state) ^ i));
    }

    #[inline]
    fn write_u64(&mut self, i: u64) {
        self.state = u64::from(mix64(self.state ^ i) as u32);
    }

    #[inline]
    fn write_usize(&mut self, i: usize) {
        cfg_if::cfg_if! {
            if #[cfg(target_pointer_width = "64")] {
                self.write_u64(i as u64);
            } else {
                self.write_u32(i as u32);
            }
        }
    }
}

/// Builder for [`BufferHasher`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BufferState;

impl BuildHasher for BufferState {
    type Hasher = BufferHasher;

    #[inline]
    fn build_hasher(&self) -> BufferHasher {
        BufferHasher::default()
    }
}

/// Hasher that feeds every written byte through [`hash_buffer`].
///
/// Intended for plain-old-data keys hashed as raw bytes. Writes are buffered
/// into whole words, so a key hashes the same no matter how its `Hash` impl
/// splits the bytes up.
#[derive(Clone, Copy, Debug, Default)]
pub struct BufferHasher {
    hash: u32,
    pending: u32,
    pending_len: u8,
}

impl BufferHasher {
    #[inline(always)]
    fn push_word(&mut self, word: u32) {
        self.hash = (self.hash.rotate_left(5) ^ word).wrapping_mul(BUFFER_SEED);
    }
}

impl Hasher for BufferHasher {
    fn finish(&self) -> u64 {
        if self.pending_len == 0 {
            return u64::from(self.hash);
        }

        // Pending bytes sit in the high end, oldest lowest.
        let mut this = *self;
        this.push_word(self.pending.swap_bytes());
        u64::from(this.hash)
    }

    fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.pending = (self.pending >> 8) | (u32::from(b) << 24);
            self.pending_len += 1;
            if self.pending_len == 4 {
                let word = self.pending;
                self.pending = 0;
                self.pending_len = 0;
                self.push_word(word);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mixers_match_reference_values() {
        assert_eq!(mix32(0), 0);
        assert_eq!(mix64(0), 0);

        let mut v = 1u32;
        v ^= v >> 16;
        v = v.wrapping_mul(0x7feb352d);
        v ^= v >> 15;
        v = v.wrapping_mul(0x846ca68b);
        v ^= v >> 16;
        assert_eq!(mix32(1), v);

        assert_ne!(mix64(1), 1);
        assert_ne!(mix64(1), mix64(2));
    }

    #[test]
    fn mix_state_hashes_integers_directly() {
        assert_eq!(MixState.hash_one(7u32), u64::from(mix32(7)));
        assert_eq!(MixState.hash_one(7u8), u64::from(mix32(7)));
        assert_eq!(MixState.hash_one(7u64), u64::from(mix64(7) as u32));
        assert_eq!(make_hash(&MixState, &7u32), mix32(7));
        assert_eq!(make_hash(&MixState, &7u64), mix64(7) as u32);
        assert_eq!(
            make_hash(&MixState, &0xdead_beef_0000_0001u64),
            mix64(0xdead_beef_0000_0001) as u32
        );
    }

    #[test]
    fn buffer_hash_words_and_tail() {
        assert_eq!(hash_buffer(&[]), 0);

        let word = u32::from_le_bytes([1, 2, 3, 4]);
        assert_eq!(hash_buffer(&[1, 2, 3, 4]), word.wrapping_mul(BUFFER_SEED));

        let tail = 0x0001_0203;
        let first = word.wrapping_mul(BUFFER_SEED);
        assert_eq!(
            hash_buffer(&[1, 2, 3, 4, 1, 2, 3]),
            (first.rotate_left(5) ^ tail).wrapping_mul(BUFFER_SEED)
        );
    }

    #[test]
    fn buffer_hasher_matches_hash_buffer() {
        let data = b"the quick brown fox";
        let mut hasher = BufferState.build_hasher();
        hasher.write(&data[..5]);
        hasher.write(&data[5..]);
        assert_eq!(hasher.finish(), u64::from(hash_buffer(data)));

        for len in 0..data.len() {
            let mut hasher = BufferHasher::default();
            for b in &data[..len] {
                hasher.write(core::slice::from_ref(b));
            }
            assert_eq!(
                hasher.finish(),
                u64::from(hash_buffer(&data[..len])),
                "length {len}"
            );
        }
    }

    #[test]
    fn fold_mixes_high_bits() {
        assert_eq!(fold(0x0000_0001_0000_0000), 1);
        assert_eq!(fold(42), 42);
    }
}

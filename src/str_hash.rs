//! DJB2 string hashing, usable as a table's hash function.
//!
//! `Hashtable<&str, V, StrBuildHasher>` stores only the string reference
//! as its key; hashing and equality follow the reference to the bytes.
//!
//! `hash_str` is plain DJB2 over the string's bytes. A table keyed by `str`
//! (or `&str`, `String`) hashes through `str`'s `Hash` impl, which feeds one
//! extra `0xff` terminator byte after the bytes, so a key's bucket hash is
//! `hash_str(s) * 33 + 0xff`. The terminator keeps `("ab", "c")` and
//! `("a", "bc")` apart in composite keys.

use core::hash::{BuildHasher, Hasher};

const DJB2_SEED: u64 = 5381;

// Written by `impl Hash for str` after the bytes.
const STR_TERMINATOR: u8 = 0xff;

/// DJB2 over the bytes of `s`: `h = h * 33 + byte`, starting at 5381.
pub fn hash_str(s: &str) -> u64 {
    let mut h = Djb2Hasher::default();
    h.write(s.as_bytes());
    h.finish()
}

/// The hash a `StrBuildHasher` table computes for string key `s`: DJB2 over
/// the bytes followed by `str`'s `0xff` terminator.
pub fn table_hash_str(s: &str) -> u64 {
    let mut h = Djb2Hasher::default();
    h.write(s.as_bytes());
    h.write_u8(STR_TERMINATOR);
    h.finish()
}

#[derive(Copy, Clone, Debug)]
pub struct Djb2Hasher {
    hash: u64,
}

impl Default for Djb2Hasher {
    fn default() -> Self {
        Self { hash: DJB2_SEED }
    }
}

impl Hasher for Djb2Hasher {
    #[inline]
    fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.hash = (self.hash << 5).wrapping_add(self.hash).wrapping_add(b as u64);
        }
    }

    #[inline]
    fn finish(&self) -> u64 {
        self.hash
    }
}

/// `BuildHasher` producing `Djb2Hasher`s. For string keys,
/// `StrBuildHasher.hash_one(s) == table_hash_str(s)`.
#[derive(Copy, Clone, Debug, Default)]
pub struct StrBuildHasher;

impl BuildHasher for StrBuildHasher {
    type Hasher = Djb2Hasher;

    fn build_hasher(&self) -> Self::Hasher {
        Djb2Hasher::default()
    }
}

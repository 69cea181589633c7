//! One-at-a-time hash: the unkeyed 32-bit digest used to place keys in buckets.

use core::hash::{BuildHasher, Hasher};

/// Hashes `bytes` in one call. Identical to feeding them through `OneAtATime`.
#[inline]
pub fn one_at_a_time(bytes: &[u8]) -> u32 {
    let mut h = OneAtATime::new();
    h.write(bytes);
    h.digest()
}

/// Streaming state of the one-at-a-time hash.
///
/// The mixing step runs per byte, so splitting the input across several
/// `write` calls gives the same digest as one call over the concatenation.
/// The finalizer only runs in `digest`/`finish`.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct OneAtATime {
    state: u32,
}

impl OneAtATime {
    pub const fn new() -> Self {
        Self { state: 0 }
    }

    /// Finalized 32-bit digest of everything written so far.
    #[inline]
    pub fn digest(&self) -> u32 {
        let mut hash = self.state;
        hash = hash.wrapping_add(hash << 3);
        hash ^= hash >> 11;
        hash = hash.wrapping_add(hash << 15);
        hash
    }
}

impl Hasher for OneAtATime {
    #[inline]
    fn write(&mut self, bytes: &[u8]) {
        let mut hash = self.state;
        for &b in bytes {
            hash = hash.wrapping_add(u32::from(b));
            hash = hash.wrapping_add(hash << 10);
            hash ^= hash >> 6;
        }
        self.state = hash;
    }

    #[inline]
    fn finish(&self) -> u64 {
        u64::from(self.digest())
    }
}

/// Stateless builder; every hasher starts from the same zero state.
#[derive(Clone, Copy, Debug, Default)]
pub struct BuildOneAtATime;

impl BuildHasher for BuildOneAtATime {
    type Hasher = OneAtATime;

    fn build_hasher(&self) -> Self::Hasher {
        OneAtATime::new()
    }
}

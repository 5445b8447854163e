//! Stateless integer hashing for deterministic per-cell and per-particle noise.

/// Multiplier used to decorrelate sequential indices (Knuth's golden ratio constant).
pub const SEED_MULTIPLIER: u32 = 2_654_435_761;

/// Avalanche a 32-bit value (lowbias32 finalizer).
#[inline]
pub fn hash_u32(mut x: u32) -> u32 {
    x ^= x >> 16;
    x = x.wrapping_mul(0x7feb_352d);
    x ^= x >> 15;
    x = x.wrapping_mul(0x846c_a68b);
    x ^= x >> 16;
    x
}

/// Hash two values into one.
#[inline]
pub fn hash_pair(a: u32, b: u32) -> u32 {
    hash_u32(a ^ hash_u32(b).wrapping_add(0x9e37_79b9))
}

/// Map a hash to `[0, 1)`.
#[inline]
pub fn hash_unit(x: u32) -> f32 {
    (hash_u32(x) >> 8) as f32 / (1u32 << 24) as f32
}

//! Deterministic 64-bit hashing for human-readable identifiers.
//!
//! Engine identifiers (asset names, resource keys) are hashed with FNV-1a so the
//! same name always maps to the same id across runs, platforms and builds.
//! Unlike the AHash collections in [`crate::alloc`], this hash is not seeded.

const FNV_OFFSET_BASIS: u64 = 0xcbf29ce484222325;
const FNV_PRIME: u64 = 0x100000001b3;

/// FNV-1a hash of a byte slice.
#[inline]
pub const fn fnv1a_64(bytes: &[u8]) -> u64 {
    let mut hash = FNV_OFFSET_BASIS;
    let mut i = 0;
    while i < bytes.len() {
        hash ^= bytes[i] as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
        i += 1;
    }
    hash
}

/// FNV-1a hash of a string's UTF-8 bytes.
#[inline]
pub const fn fnv1a_64_str(s: &str) -> u64 {
    fnv1a_64(s.as_bytes())
}

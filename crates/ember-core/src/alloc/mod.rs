//! Collection types used across Ember.
//!
//! Re-exports the hash map backed by AHash, which is noticeably faster than
//! SipHash for the small integer and enum keys the engine uses.

pub use ahash::AHashMap as HashMap;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hashmap_enum_keys() {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        enum Kind {
            A,
            B,
        }

        let mut map = HashMap::new();
        map.insert(Kind::A, 1);
        map.insert(Kind::B, 2);
        assert_eq!(map.get(&Kind::A), Some(&1));
        assert_eq!(map.len(), 2);
    }
}

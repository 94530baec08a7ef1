//! Asset identifiers.

use std::fmt;

use ember_core::hash::fnv1a_64_str;

/// A 64-bit asset identifier derived from a human-readable name.
///
/// Two assets of the same [`AssetType`](crate::AssetType) never share an id
/// while both are alive. Ids of different types live in separate namespaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssetId(u64);

impl AssetId {
    /// Hash a name into an id (FNV-1a, 64-bit).
    pub const fn new(name: &str) -> Self {
        Self(fnv1a_64_str(name))
    }

    /// Wrap an already-hashed value.
    pub const fn from_raw(id: u64) -> Self {
        Self(id)
    }

    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AssetId(0x{:016x})", self.0)
    }
}

impl From<&str> for AssetId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<&String> for AssetId {
    fn from(name: &String) -> Self {
        Self::new(name)
    }
}

impl From<String> for AssetId {
    fn from(name: String) -> Self {
        Self::new(&name)
    }
}

impl From<u64> for AssetId {
    fn from(id: u64) -> Self {
        Self::from_raw(id)
    }
}

/// Either a name or a precomputed id, as accepted by
/// [`AssetServer::set_id`](crate::AssetServer::set_id).
///
/// Naming an asset also records the name for diagnostics when name tracking is
/// enabled; a raw id carries no name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKey<'a> {
    Name(&'a str),
    Id(AssetId),
}

impl AssetKey<'_> {
    pub fn id(&self) -> AssetId {
        match self {
            AssetKey::Name(name) => AssetId::new(name),
            AssetKey::Id(id) => *id,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            AssetKey::Name(name) => Some(name),
            AssetKey::Id(_) => None,
        }
    }
}

impl<'a> From<&'a str> for AssetKey<'a> {
    fn from(name: &'a str) -> Self {
        AssetKey::Name(name)
    }
}

impl<'a> From<&'a String> for AssetKey<'a> {
    fn from(name: &'a String) -> Self {
        AssetKey::Name(name)
    }
}

impl From<AssetId> for AssetKey<'_> {
    fn from(id: AssetId) -> Self {
        AssetKey::Id(id)
    }
}

impl From<u64> for AssetKey<'_> {
    fn from(id: u64) -> Self {
        AssetKey::Id(AssetId::from_raw(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_and_raw_agree() {
        let by_name = AssetId::new("textures/grass");
        let by_raw = AssetId::from_raw(fnv1a_64_str("textures/grass"));
        assert_eq!(by_name, by_raw);
        assert_eq!(AssetId::from("textures/grass"), by_name);
        assert_eq!(AssetId::from(String::from("textures/grass")), by_name);
    }

    #[test]
    fn test_display() {
        assert_eq!(AssetId::from_raw(0xff).to_string(), "AssetId(0x00000000000000ff)");
    }

    #[test]
    fn test_key_resolution() {
        let key = AssetKey::from("fonts/default");
        assert_eq!(key.id(), AssetId::new("fonts/default"));
        assert_eq!(key.name(), Some("fonts/default"));

        let key = AssetKey::from(42u64);
        assert_eq!(key.id().as_u64(), 42);
        assert_eq!(key.name(), None);
    }
}

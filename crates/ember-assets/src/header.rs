//! Reference-counted asset headers.
//!
//! Every asset is an [`AssetHeader`] shared through [`AssetRef`]. Cloning an
//! `AssetRef` only keeps the memory alive; the *logical* lifetime is governed by
//! the explicit reference count driven through
//! [`AssetServer::addref`](crate::AssetServer::addref) and the release calls.

use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::asset_type::AssetType;
use crate::id::AssetId;

/// Shared handle to an asset header.
pub type AssetRef = Arc<AssetHeader>;

/// Type-specific state attached to a header by its lifecycle.
pub type AssetPayload = Box<dyn Any + Send>;

/// Metadata common to every asset, followed by its type-specific payload.
pub struct AssetHeader {
    asset_type: AssetType,
    id: AtomicU64,
    index: usize,
    refs: AtomicI32,
    destroyed: AtomicBool,
    name: Mutex<Option<String>>,
    payload: Mutex<Option<AssetPayload>>,
}

impl AssetHeader {
    /// A fresh header owns exactly one reference.
    pub(crate) fn new(
        asset_type: AssetType,
        id: AssetId,
        index: usize,
        name: Option<String>,
        payload: AssetPayload,
    ) -> Self {
        Self {
            asset_type,
            id: AtomicU64::new(id.as_u64()),
            index,
            refs: AtomicI32::new(1),
            destroyed: AtomicBool::new(false),
            name: Mutex::new(name),
            payload: Mutex::new(Some(payload)),
        }
    }

    pub fn asset_type(&self) -> AssetType {
        self.asset_type
    }

    pub fn id(&self) -> AssetId {
        AssetId::from_raw(self.id.load(Ordering::Acquire))
    }

    /// Registry length when this asset was allocated.
    ///
    /// Not renumbered when earlier assets are removed, so it is only useful for
    /// diagnostics and never as a handle.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Current reference count.
    pub fn refs(&self) -> i32 {
        self.refs.load(Ordering::Acquire)
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::Acquire)
    }

    /// The human-readable name, if name tracking is enabled and one was set.
    pub fn name(&self) -> Option<String> {
        self.name.lock().clone()
    }

    /// Run `f` on the payload if it is a `T` and the asset is not destroyed.
    ///
    /// The payload lock is held while `f` runs: releasing this same asset from
    /// inside `f` deadlocks.
    pub fn with_payload<T: Any, R>(&self, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        let mut payload = self.payload.lock();
        payload.as_mut()?.downcast_mut::<T>().map(f)
    }

    /// Whether the payload is currently a `T`.
    pub fn payload_is<T: Any>(&self) -> bool {
        self.payload
            .lock()
            .as_ref()
            .is_some_and(|payload| payload.is::<T>())
    }

    /// Identity comparison.
    pub fn same(a: &AssetHeader, b: &AssetHeader) -> bool {
        std::ptr::eq(a, b)
    }

    pub(crate) fn store_id(&self, id: AssetId) -> AssetId {
        AssetId::from_raw(self.id.swap(id.as_u64(), Ordering::AcqRel))
    }

    pub(crate) fn set_name(&self, name: Option<String>) {
        *self.name.lock() = name;
    }

    pub(crate) fn take_name(&self) -> Option<String> {
        self.name.lock().take()
    }

    /// Returns the previous count.
    pub(crate) fn increment(&self) -> i32 {
        // A new reference can only be created from an existing one, so no
        // synchronization with other accesses is needed here.
        self.refs.fetch_add(1, Ordering::Relaxed)
    }

    /// Returns the new count.
    pub(crate) fn decrement(&self) -> i32 {
        // AcqRel so whichever thread reaches zero observes every write made
        // while the other references were alive.
        self.refs.fetch_sub(1, Ordering::AcqRel) - 1
    }

    /// Flip the destroyed flag. Returns `true` only for the first caller.
    pub(crate) fn mark_destroyed(&self) -> bool {
        !self.destroyed.swap(true, Ordering::AcqRel)
    }

    pub(crate) fn take_payload(&self) -> Option<AssetPayload> {
        self.payload.lock().take()
    }
}

impl fmt::Debug for AssetHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssetHeader")
            .field("type", &self.asset_type)
            .field("id", &self.id())
            .field("index", &self.index)
            .field("refs", &self.refs())
            .field("destroyed", &self.is_destroyed())
            .field("name", &*self.name.lock())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, PartialEq)]
    struct MeshData {
        vertex_count: u32,
    }

    fn make_header() -> AssetHeader {
        AssetHeader::new(
            AssetType::Mesh,
            AssetId::new("cube"),
            3,
            Some("cube".to_string()),
            Box::new(MeshData::default()),
        )
    }

    #[test]
    fn test_new_header_owns_one_reference() {
        let header = make_header();
        assert_eq!(header.refs(), 1);
        assert_eq!(header.index(), 3);
        assert_eq!(header.id(), AssetId::new("cube"));
        assert!(!header.is_destroyed());
    }

    #[test]
    fn test_increment_and_decrement() {
        let header = make_header();
        assert_eq!(header.increment(), 1);
        assert_eq!(header.refs(), 2);
        assert_eq!(header.decrement(), 1);
        assert_eq!(header.decrement(), 0);
    }

    #[test]
    fn test_typed_payload_access() {
        let header = make_header();
        assert!(header.payload_is::<MeshData>());
        header.with_payload(|mesh: &mut MeshData| mesh.vertex_count = 24);
        assert_eq!(
            header.with_payload(|mesh: &mut MeshData| mesh.vertex_count),
            Some(24)
        );
        // Wrong type yields nothing rather than panicking.
        assert_eq!(header.with_payload(|_: &mut String| ()), None);
    }

    #[test]
    fn test_payload_gone_after_take() {
        let header = make_header();
        assert!(header.take_payload().is_some());
        assert!(!header.payload_is::<MeshData>());
        assert_eq!(header.with_payload(|mesh: &mut MeshData| mesh.vertex_count), None);
    }

    #[test]
    fn test_mark_destroyed_only_once() {
        let header = make_header();
        assert!(header.mark_destroyed());
        assert!(!header.mark_destroyed());
        assert!(header.is_destroyed());
    }

    #[test]
    fn test_store_id_returns_previous() {
        let header = make_header();
        let old = header.store_id(AssetId::new("sphere"));
        assert_eq!(old, AssetId::new("cube"));
        assert_eq!(header.id(), AssetId::new("sphere"));
    }
}

//! Per-type create/destroy hooks supplied by the owning subsystems.
//!
//! The asset core never knows how a mesh or a sound is torn down. Each
//! [`AssetType`] gets exactly one [`AssetLifecycle`] registered on the server,
//! which produces the zeroed payload at allocation and frees it (GPU handles,
//! decoder state, child references) at destruction.

use std::any::type_name;
use std::marker::PhantomData;
use std::sync::Arc;

use ember_core::alloc::HashMap;
use parking_lot::RwLock;

use crate::asset_type::AssetType;
use crate::header::{AssetHeader, AssetPayload};
use crate::server::AssetServer;

/// Lifecycle hooks for one asset type.
///
/// # Example
///
/// ```ignore
/// struct MeshLifecycle { device: GpuDevice }
///
/// impl AssetLifecycle for MeshLifecycle {
///     type Payload = MeshData;
///
///     fn asset_type(&self) -> AssetType {
///         AssetType::Mesh
///     }
///
///     fn create(&self) -> MeshData {
///         MeshData::default()
///     }
///
///     fn destroy(&self, _assets: &AssetServer, _header: &AssetHeader, mesh: MeshData) {
///         self.device.free_buffer(mesh.vertex_buffer);
///     }
/// }
/// ```
pub trait AssetLifecycle: Send + Sync + 'static {
    /// State stored alongside the header.
    type Payload: Send + 'static;

    /// The type this lifecycle serves.
    fn asset_type(&self) -> AssetType;

    /// Produce the initial payload for a freshly allocated asset.
    fn create(&self) -> Self::Payload;

    /// Free the payload. Runs once, on the owner thread, after the reference
    /// count reached zero and before the header leaves the registry.
    ///
    /// Child assets held by the payload are released through `assets`; on
    /// the owner thread they are torn down before this call returns.
    fn destroy(&self, assets: &AssetServer, header: &AssetHeader, payload: Self::Payload);
}

/// Type-erased lifecycle used by the lifecycle table.
pub trait ErasedAssetLifecycle: Send + Sync {
    fn asset_type(&self) -> AssetType;

    fn payload_type_name(&self) -> &'static str;

    fn create_erased(&self) -> AssetPayload;

    fn destroy_erased(&self, assets: &AssetServer, header: &AssetHeader, payload: AssetPayload);
}

impl<L: AssetLifecycle> ErasedAssetLifecycle for L {
    fn asset_type(&self) -> AssetType {
        AssetLifecycle::asset_type(self)
    }

    fn payload_type_name(&self) -> &'static str {
        type_name::<L::Payload>()
    }

    fn create_erased(&self) -> AssetPayload {
        Box::new(self.create())
    }

    fn destroy_erased(&self, assets: &AssetServer, header: &AssetHeader, payload: AssetPayload) {
        match payload.downcast::<L::Payload>() {
            Ok(payload) => self.destroy(assets, header, *payload),
            Err(_) => tracing::error!(
                "Payload of {} {} is not a {}, skipping its destroy hook",
                header.asset_type(),
                header.id(),
                type_name::<L::Payload>()
            ),
        }
    }
}

/// A lifecycle built from two closures.
///
/// ```ignore
/// server.register_lifecycle(FnLifecycle::new(
///     AssetType::Sound,
///     SoundData::default,
///     |_assets, _header, sound: SoundData| mixer.stop(sound.voice),
/// ));
/// ```
pub struct FnLifecycle<P, C, D> {
    asset_type: AssetType,
    create: C,
    destroy: D,
    _payload: PhantomData<fn() -> P>,
}

impl<P, C, D> FnLifecycle<P, C, D>
where
    P: Send + 'static,
    C: Fn() -> P + Send + Sync + 'static,
    D: Fn(&AssetServer, &AssetHeader, P) + Send + Sync + 'static,
{
    pub fn new(asset_type: AssetType, create: C, destroy: D) -> Self {
        Self {
            asset_type,
            create,
            destroy,
            _payload: PhantomData,
        }
    }
}

impl<P, C, D> AssetLifecycle for FnLifecycle<P, C, D>
where
    P: Send + 'static,
    C: Fn() -> P + Send + Sync + 'static,
    D: Fn(&AssetServer, &AssetHeader, P) + Send + Sync + 'static,
{
    type Payload = P;

    fn asset_type(&self) -> AssetType {
        self.asset_type
    }

    fn create(&self) -> P {
        (self.create)()
    }

    fn destroy(&self, assets: &AssetServer, header: &AssetHeader, payload: P) {
        (self.destroy)(assets, header, payload)
    }
}

/// Lifecycle table: one entry per asset type.
#[derive(Default)]
pub(crate) struct LifecycleTable {
    entries: RwLock<HashMap<AssetType, Arc<dyn ErasedAssetLifecycle>>>,
}

impl LifecycleTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Register a lifecycle, replacing any previous one for the same type.
    pub(crate) fn register(&self, lifecycle: Arc<dyn ErasedAssetLifecycle>) {
        let asset_type = lifecycle.asset_type();
        let payload = lifecycle.payload_type_name();
        if self
            .entries
            .write()
            .insert(asset_type, lifecycle)
            .is_some()
        {
            tracing::warn!("Replacing {} lifecycle (payload {})", asset_type, payload);
        } else {
            tracing::debug!("Registered {} lifecycle (payload {})", asset_type, payload);
        }
    }

    /// Cloned out so no lock is held while the hook runs.
    pub(crate) fn get(&self, asset_type: AssetType) -> Option<Arc<dyn ErasedAssetLifecycle>> {
        self.entries.read().get(&asset_type).cloned()
    }

    pub(crate) fn contains(&self, asset_type: AssetType) -> bool {
        self.entries.read().contains_key(&asset_type)
    }
}

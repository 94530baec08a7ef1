//! The registry of live asset headers.
//!
//! Lookups are linear scans. Asset counts stay in the tens to low thousands, and
//! a flat list keeps enumeration order equal to allocation order, which the leak
//! report relies on.

use std::sync::Arc;

use ember_core::profiling::profile_function;
use parking_lot::RwLock;

use crate::asset_type::AssetType;
use crate::header::{AssetHeader, AssetRef};
use crate::id::AssetId;

/// An asset still registered when the leak check ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeakedAsset {
    pub asset_type: AssetType,
    pub id: AssetId,
    pub refs: i32,
    pub name: Option<String>,
}

/// All live assets, in allocation order.
#[derive(Default)]
pub struct AssetRegistry {
    assets: RwLock<Vec<AssetRef>>,
}

impl AssetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Find the live asset with this id and type.
    pub fn find(&self, id: AssetId, asset_type: AssetType) -> Option<AssetRef> {
        profile_function!();
        self.assets
            .read()
            .iter()
            .find(|asset| asset.asset_type() == asset_type && asset.id() == id)
            .cloned()
    }

    /// Append a header built from the current registry length.
    ///
    /// `build` runs under the write lock and must not call back into the
    /// registry.
    pub(crate) fn insert_with(&self, build: impl FnOnce(usize) -> AssetHeader) -> AssetRef {
        let mut assets = self.assets.write();
        let asset = Arc::new(build(assets.len()));
        assets.push(asset.clone());
        asset
    }

    /// Give `asset` a new id unless another live asset of its type holds it.
    ///
    /// The check and the store happen under one write lock, so two threads
    /// racing for the same id cannot both win. Returns the previous id.
    pub(crate) fn assign_id(&self, asset: &AssetHeader, id: AssetId) -> Result<AssetId, AssetRef> {
        let assets = self.assets.write();
        if let Some(other) = assets.iter().find(|other| {
            other.asset_type() == asset.asset_type()
                && other.id() == id
                && !AssetHeader::same(other, asset)
        }) {
            return Err(other.clone());
        }
        Ok(asset.store_id(id))
    }

    /// Remove `asset` by identity. Later entries shift down one slot; their
    /// cached [`AssetHeader::index`] is not updated.
    pub fn remove(&self, asset: &AssetHeader) -> bool {
        let mut assets = self.assets.write();
        match assets
            .iter()
            .position(|entry| AssetHeader::same(entry, asset))
        {
            Some(position) => {
                assets.remove(position);
                true
            }
            None => false,
        }
    }

    /// First of `root`, `root1`, `root2`, ... not used by a live asset of
    /// `asset_type`.
    ///
    /// The answer is only valid until the next registration: two threads asking
    /// for the same root concurrently can receive the same name. Callers that
    /// name assets from several threads must serialize the probe and the
    /// following `set_id` themselves.
    pub fn unique_name(&self, asset_type: AssetType, root: &str) -> String {
        let mut name = root.to_string();
        let mut count = 1u32;
        while self.find(AssetId::new(&name), asset_type).is_some() {
            name = format!("{root}{count}");
            count += 1;
        }
        name
    }

    pub fn len(&self) -> usize {
        self.assets.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.read().is_empty()
    }

    pub fn count_of(&self, asset_type: AssetType) -> usize {
        self.assets
            .read()
            .iter()
            .filter(|asset| asset.asset_type() == asset_type)
            .count()
    }

    /// Snapshot of every live asset.
    pub fn snapshot(&self) -> Vec<AssetRef> {
        self.assets.read().clone()
    }

    /// Report every asset still registered. Logged, never fatal.
    pub fn shutdown_check(&self) -> Vec<LeakedAsset> {
        let leaked: Vec<LeakedAsset> = self
            .assets
            .read()
            .iter()
            .map(|asset| LeakedAsset {
                asset_type: asset.asset_type(),
                id: asset.id(),
                refs: asset.refs(),
                name: asset.name(),
            })
            .collect();

        if !leaked.is_empty() {
            tracing::error!(
                "{} unreleased assets still found in the asset registry!",
                leaked.len()
            );
            for leak in &leaked {
                match &leak.name {
                    Some(name) => {
                        tracing::info!("\t{} ({}): {}", leak.asset_type, leak.refs, name)
                    }
                    None => tracing::info!("\t{} ({}): {}", leak.asset_type, leak.refs, leak.id),
                }
            }
        }

        leaked
    }
}

//! Frame loop example.
//!
//! This example demonstrates:
//! - Registering a lifecycle for textures
//! - Streaming a texture through the I/O, CPU and Gpu queues
//! - Releasing from a worker and letting the pump destroy it
//!
//! Run with `RUST_LOG=ember_assets=trace` to see every transition.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use ember_assets::prelude::*;
use ember_core::{logging, profiling};

#[derive(Debug, Default)]
struct TextureData {
    pixels: Vec<u8>,
    gpu_handle: Option<u32>,
}

fn read_file(size: usize) -> Vec<u8> {
    thread::sleep(Duration::from_millis(5));
    vec![0x7f; size]
}

fn decode(bytes: &[u8]) -> Vec<u8> {
    bytes.iter().map(|b| b.wrapping_mul(2)).collect()
}

fn main() -> Result<(), AssetError> {
    logging::init();
    profiling::init_profiling(profiling::DEFAULT_SERVER_ADDR);

    let assets = Arc::new(
        AssetServer::builder()
            .with_lifecycle(FnLifecycle::new(
                AssetType::Texture,
                TextureData::default,
                |_: &AssetServer, header: &AssetHeader, texture: TextureData| {
                    tracing::info!(
                        "Freeing {} (gpu handle {:?}, {} bytes)",
                        header.name().unwrap_or_default(),
                        texture.gpu_handle,
                        texture.pixels.len()
                    );
                },
            ))
            .build()?,
    );

    let texture = assets.allocate(AssetType::Texture);
    let name = assets.unique_name(AssetType::Texture, "textures/bricks");
    assets.set_id(&texture, name.as_str())?;

    // The streaming jobs keep their own reference until the upload finished.
    assets.addref(&texture);

    // I/O reads, CPU decodes, then the upload runs in the pump.
    {
        let server = assets.clone();
        let texture = texture.clone();
        assets.submit(AssetJob::io(move || {
            let bytes = read_file(64 * 64 * 4);
            let cpu_server = server.clone();
            server.submit(AssetJob::cpu(move || {
                let pixels = decode(&bytes);
                texture.with_payload(|data: &mut TextureData| data.pixels = pixels);
                let gpu_server = cpu_server.clone();
                cpu_server.submit(AssetJob::gpu(move || {
                    texture.with_payload(|data: &mut TextureData| data.gpu_handle = Some(1));
                    tracing::info!("Uploaded {}", texture.id());
                    gpu_server.releaseref(&texture);
                }));
            }));
        }));
    }

    for frame in 0..10 {
        profiling::new_frame();
        let stats = assets.update();
        if stats != PumpStats::default() {
            tracing::info!("frame {}: {:?}", frame, stats);
        }
        thread::sleep(Duration::from_millis(16));
    }

    assets.releaseref(&texture);
    for event in assets.drain_events() {
        tracing::debug!("{:?}", event);
    }

    let leaks = assets.shutdown()?;
    tracing::info!("Shut down with {} leaked asset(s)", leaks.len());
    Ok(())
}

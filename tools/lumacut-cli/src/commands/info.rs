//! Show media file information.

use std::path::PathBuf;

use lumacut_media::{probe_video, MediaSource, StillImageSource};
use lumacut_project_model::{Asset, AssetKind};

pub fn run(path: PathBuf, json: bool) -> anyhow::Result<()> {
    let asset =
        Asset::import_file(&path).map_err(|e| anyhow::anyhow!("Failed to import file: {e}"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&asset)?);
        return Ok(());
    }

    println!("Asset: {}", asset.label);
    println!("  ID: {}", asset.id);
    println!("  Kind: {:?}", asset.kind);
    println!("  Source: {}", asset.source);
    println!("  Created: {}", asset.created_at);
    println!();

    match asset.kind {
        AssetKind::Video => match probe_video(&path) {
            Ok(info) => {
                println!("Video:");
                println!("  Resolution: {}x{} @ {}fps", info.width, info.height, info.fps);
                println!("  Duration: {:.2}s", info.duration_secs);
            }
            Err(e) => println!("Video: unreadable ({})", e.user_message()),
        },
        AssetKind::Image => match StillImageSource::open(&path) {
            Ok(still) => {
                let (width, height) = still.dimensions();
                println!("Image:");
                println!("  Resolution: {width}x{height}");
            }
            Err(e) => println!("Image: unreadable ({})", e.user_message()),
        },
    }

    Ok(())
}

//! Export the composition to a video file.

use std::path::PathBuf;
use std::time::Duration;

use lumacut_capture_engine::{ExportStart, IgnoreReason};
use lumacut_common::config::AppConfig;
use lumacut_editor::Editor;
use lumacut_project_model::AssetStore;

use super::SceneArgs;

pub async fn run(
    mut config: AppConfig,
    primary: PathBuf,
    quality: String,
    out_dir: Option<PathBuf>,
    scene: SceneArgs,
) -> anyhow::Result<()> {
    if let Some(dir) = out_dir {
        config.exports_dir = dir;
    }
    println!("Exporting {} ({quality})", primary.display());
    println!("  Output directory: {}", config.exports_dir.display());

    let mut editor = Editor::mount(config, AssetStore::new())?;
    scene.apply(&editor, &primary)?;

    let handle = match editor.start_export(&quality) {
        Ok(ExportStart::Started(handle)) => handle,
        Ok(ExportStart::Ignored(IgnoreReason::NoPrimary)) => {
            anyhow::bail!("No primary clip selected")
        }
        Ok(ExportStart::Ignored(IgnoreReason::Busy)) => {
            anyhow::bail!("An export is already running")
        }
        Err(e) => anyhow::bail!("Export failed: {}", e.user_message()),
    };

    let mut ticker = tokio::time::interval(Duration::from_millis(500));
    while !handle.is_finished() {
        ticker.tick().await;
        let p = handle.progress();
        print!(
            "\r  Progress: {:.1}% ({} frames, {:.1}/{:.1}s)  ",
            p.fraction() * 100.0,
            p.frames_captured,
            p.elapsed_secs,
            p.duration_secs,
        );
    }

    let result = handle.wait().await;
    editor.unmount().await;

    match result {
        Ok(asset) => {
            println!("\nExport complete: {}", asset.source);
            Ok(())
        }
        Err(e) => {
            println!("\nExport failed: {}", e.user_message());
            Err(anyhow::anyhow!(e.user_message()))
        }
    }
}

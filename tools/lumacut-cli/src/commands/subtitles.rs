//! Write placeholder subtitles for a clip.

use std::path::PathBuf;

use lumacut_audio_ai::{generate_placeholder_cues, save_subtitles, PLACEHOLDER_PHRASES};
use lumacut_common::config::AppConfig;
use lumacut_media::probe_video;
use lumacut_project_model::{Asset, AssetKind};

pub fn run(config: &AppConfig, path: PathBuf, output: PathBuf, cue_secs: f64) -> anyhow::Result<()> {
    let asset =
        Asset::import_file(&path).map_err(|e| anyhow::anyhow!("Failed to import file: {e}"))?;

    let duration = match asset.kind {
        AssetKind::Video => probe_video(&path)
            .map_err(|e| anyhow::anyhow!("Cannot read duration: {}", e.user_message()))?
            .duration_secs,
        AssetKind::Image => config.editor.fallback_export_secs,
    };

    let track = generate_placeholder_cues(duration, PLACEHOLDER_PHRASES, cue_secs);
    if track.is_empty() {
        anyhow::bail!("No cues generated; check --cue-secs");
    }
    save_subtitles(track.cues(), &output)?;

    println!(
        "Wrote {} cues covering {:.2}s to {}",
        track.len(),
        duration,
        output.display()
    );
    Ok(())
}

//! Compose a single frame to PNG.

use std::path::PathBuf;

use anyhow::Context;

use lumacut_common::config::AppConfig;
use lumacut_editor::Editor;
use lumacut_project_model::AssetStore;

use super::SceneArgs;

pub async fn run(
    config: AppConfig,
    primary: PathBuf,
    output: PathBuf,
    time: f64,
    scene: SceneArgs,
) -> anyhow::Result<()> {
    let mut editor = Editor::mount(config, AssetStore::new())?;
    scene.apply(&editor, &primary)?;
    editor.seek(time);
    editor.render_frame();
    let frame = editor.snapshot();
    editor.unmount().await;

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    frame
        .save(&output)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    println!(
        "Frame at {:.2}s written to {} ({}x{})",
        time,
        output.display(),
        frame.width(),
        frame.height()
    );
    Ok(())
}

//! Check system capabilities.

use lumacut_common::config::AppConfig;
use lumacut_media::command_exists;
use lumacut_render_engine::TextRasterizer;

pub fn run(config: &AppConfig) -> anyhow::Result<()> {
    println!("LumaCut System Check");
    println!("{}", "=".repeat(50));

    let mut ready = true;
    for (binary, purpose) in [
        ("ffprobe", "video probing"),
        ("ffmpeg", "video decoding and export"),
    ] {
        if command_exists(binary) {
            println!("[OK] {binary} found ({purpose})");
        } else {
            println!("[MISSING] {binary}: required for {purpose}");
            ready = false;
        }
    }

    match TextRasterizer::load(config.editor.font_path.as_deref()) {
        Ok(font) => println!("[OK] Font: {}", font.source().display()),
        Err(e) => println!("[WARN] Font: {} (text and subtitles disabled)", e.user_message()),
    }

    let editor = &config.editor;
    println!();
    println!("Configuration:");
    println!(
        "  Surface: {}x{} @ {}Hz",
        editor.surface_width, editor.surface_height, editor.refresh_hz
    );
    println!("  Capture: {} fps", editor.capture_fps);
    println!("  Still export length: {:.1}s", editor.fallback_export_secs);
    println!("  Exports: {}", config.exports_dir.display());

    println!();
    if ready {
        println!("All required tools are available. LumaCut is ready.");
    } else {
        println!("Some required tools are missing. Install ffmpeg to work with video.");
    }

    Ok(())
}

//! Subcommand implementations.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;

use lumacut_editor::Editor;
use lumacut_project_model::{Asset, ParamChange};

pub mod check;
pub mod export;
pub mod frame;
pub mod info;
pub mod subtitles;

/// Scene settings shared by `frame` and `export`.
#[derive(Args, Debug, Clone)]
pub struct SceneArgs {
    /// Brightness percent (0-200)
    #[arg(long, default_value = "100")]
    pub brightness: f64,

    /// Contrast percent (0-200)
    #[arg(long, default_value = "100")]
    pub contrast: f64,

    /// Saturation percent (0-200)
    #[arg(long, default_value = "100")]
    pub saturation: f64,

    /// Blur radius in pixels (0-20)
    #[arg(long, default_value = "0")]
    pub blur: f64,

    /// Opacity percent (0-100)
    #[arg(long, default_value = "100")]
    pub opacity: f64,

    /// Zoom factor (1-3)
    #[arg(long, default_value = "1")]
    pub zoom: f64,

    /// Rotation in degrees (-180 to 180)
    #[arg(long, default_value = "0", allow_hyphen_values = true)]
    pub rotate: f64,

    /// Playback speed (0.25-4)
    #[arg(long, default_value = "1")]
    pub speed: f64,

    /// Picture-in-picture overlay image or video
    #[arg(long)]
    pub overlay: Option<PathBuf>,

    /// Overlay top-left as normalized `x,y`
    #[arg(long, value_parser = parse_point)]
    pub overlay_at: Option<(f64, f64)>,

    /// Overlay width as a fraction of the surface width (0-1]
    #[arg(long)]
    pub overlay_scale: Option<f64>,

    /// Caption text
    #[arg(long)]
    pub text: Option<String>,

    /// Caption centre as normalized `x,y`
    #[arg(long, value_parser = parse_point)]
    pub text_at: Option<(f64, f64)>,

    /// Caption scale (0-4]
    #[arg(long)]
    pub text_scale: Option<f64>,

    /// Caption rotation in degrees
    #[arg(long, allow_hyphen_values = true)]
    pub text_rotation: Option<f64>,

    /// Fill the clip with placeholder subtitles
    #[arg(long)]
    pub subtitles: bool,
}

impl SceneArgs {
    /// Select the primary and overlay, then apply every setting.
    pub fn apply(&self, editor: &Editor, primary: &Path) -> anyhow::Result<()> {
        let primary = import(editor, primary)?;
        editor
            .select_primary(&primary)
            .map_err(|e| anyhow::anyhow!("Cannot open primary: {}", e.user_message()))?;

        for change in [
            ParamChange::Brightness(self.brightness),
            ParamChange::Contrast(self.contrast),
            ParamChange::Saturation(self.saturation),
            ParamChange::Blur(self.blur),
            ParamChange::Opacity(self.opacity),
            ParamChange::Zoom(self.zoom),
            ParamChange::Rotate(self.rotate),
            ParamChange::Speed(self.speed),
        ] {
            editor.set_param(change);
        }

        if let Some(path) = &self.overlay {
            let overlay = import(editor, path)?;
            editor
                .set_overlay(Some(&overlay))
                .map_err(|e| anyhow::anyhow!("Cannot open overlay: {}", e.user_message()))?;
            if let Some(scale) = self.overlay_scale {
                editor.set_overlay_scale(scale)?;
            }
            if let Some((x, y)) = self.overlay_at {
                let (w, h) = editor.surface_size();
                editor.set_tool(lumacut_editor::ToolCategory::Overlay);
                editor.click(x * w as f64, y * h as f64);
                editor.set_tool(lumacut_editor::ToolCategory::Main);
            }
        }

        if let Some(text) = &self.text {
            editor.set_text(true, text.clone());
            if let Some((x, y)) = self.text_at {
                let (w, h) = editor.surface_size();
                editor.click(x * w as f64, y * h as f64);
            }
            if let Some(scale) = self.text_scale {
                editor.set_text_scale(scale)?;
            }
            if let Some(degrees) = self.text_rotation {
                editor.set_text_rotation(degrees);
            }
            if !editor.has_font() {
                eprintln!("Warning: no font available, text will not be drawn");
            }
        }

        if self.subtitles {
            let cues = editor.generate_subtitles();
            tracing::info!(cues = cues.len(), "Placeholder subtitles added");
        }

        Ok(())
    }
}

/// Import a file and register it in the editor's asset list.
pub fn import(editor: &Editor, path: &Path) -> anyhow::Result<Asset> {
    let asset = Asset::import_file(path)
        .with_context(|| format!("Failed to import {}", path.display()))?;
    editor.assets().append(asset.clone());
    Ok(asset)
}

fn parse_point(raw: &str) -> Result<(f64, f64), String> {
    let (x, y) = raw
        .split_once(',')
        .ok_or_else(|| format!("expected x,y but got '{raw}'"))?;
    let parse = |v: &str| {
        v.trim()
            .parse::<f64>()
            .map_err(|e| format!("invalid coordinate '{v}': {e}"))
    };
    Ok((parse(x)?, parse(y)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_point() {
        assert_eq!(parse_point("0.5,0.8"), Ok((0.5, 0.8)));
        assert_eq!(parse_point(" 1 , 0 "), Ok((1.0, 0.0)));
        assert!(parse_point("0.5").is_err());
        assert!(parse_point("a,b").is_err());
    }
}

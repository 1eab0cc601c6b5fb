//! Editor scene: everything the compositor draws from apart from media.

use serde::{Deserialize, Serialize};

use lumacut_project_model::{CueTrack, EditParameters, LayerTransform};

/// Sidebar tool categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolCategory {
    /// Adjustments and the text layer.
    #[default]
    Main,
    /// Picture-in-picture placement.
    Overlay,
    Audio,
    Effects,
    Export,
}

impl ToolCategory {
    pub const ALL: [ToolCategory; 5] = [
        ToolCategory::Main,
        ToolCategory::Overlay,
        ToolCategory::Audio,
        ToolCategory::Effects,
        ToolCategory::Export,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ToolCategory::Main => "Main",
            ToolCategory::Overlay => "Overlay",
            ToolCategory::Audio => "Audio",
            ToolCategory::Effects => "Effects",
            ToolCategory::Export => "Export",
        }
    }
}

/// The caption layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextLayer {
    pub enabled: bool,
    pub content: String,
}

/// Scene state for the selected primary clip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditorScene {
    pub params: EditParameters,
    pub overlay_transform: LayerTransform,
    pub text_transform: LayerTransform,
    pub text: TextLayer,
    pub cues: CueTrack,
    pub tool: ToolCategory,
    /// Id of the asset bound as primary.
    pub primary_asset: Option<String>,
    /// Id of the asset bound as overlay.
    pub overlay_asset: Option<String>,
    /// Name of the cosmetic effect currently shown as running.
    pub active_effect: Option<String>,
}

impl Default for EditorScene {
    fn default() -> Self {
        Self {
            params: EditParameters::default(),
            overlay_transform: LayerTransform::overlay(),
            text_transform: LayerTransform::text(),
            text: TextLayer::default(),
            cues: CueTrack::new(),
            tool: ToolCategory::default(),
            primary_asset: None,
            overlay_asset: None,
            active_effect: None,
        }
    }
}

impl EditorScene {
    pub fn has_overlay(&self) -> bool {
        self.overlay_asset.is_some()
    }

    /// Caption to draw, if the layer is enabled and not blank.
    pub fn visible_text(&self) -> Option<&str> {
        if !self.text.enabled {
            return None;
        }
        let content = self.text.content.as_str();
        (!content.trim().is_empty()).then_some(content)
    }

    /// Whether the overlay selection outline should be drawn.
    pub fn overlay_selected(&self) -> bool {
        self.tool == ToolCategory::Overlay && self.has_overlay()
    }
}

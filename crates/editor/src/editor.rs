//! The editor: shared state, the render loop, and export wiring.

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::task::JoinHandle;

use lumacut_audio_ai::{generate_placeholder_cues, AudioGraph, DEFAULT_CUE_SECS, PLACEHOLDER_PHRASES};
use lumacut_capture_engine::{
    ffmpeg_encoder_factory, EncoderFactory, ExportController, ExportSettings, ExportStart,
    ExportState, PlaybackDriver,
};
use lumacut_common::config::AppConfig;
use lumacut_common::error::{LumacutError, LumacutResult};
use lumacut_media::{FileSourceResolver, MediaDeck, SourceResolver};
use lumacut_project_model::{
    Asset, AssetStore, AudioMode, EditParameters, LayerKind, ParamChange, SubtitleCue,
    TransformError,
};
use lumacut_render_engine::{
    compose, CompositionInputs, RenderLoop, SharedSurface, Surface, TextRasterizer,
};

use crate::effects::CosmeticEffect;
use crate::interaction::apply_click;
use crate::scene::{EditorScene, ToolCategory};

/// Pluggable collaborators: how assets are opened and how exports are
/// encoded.
#[derive(Clone)]
pub struct EditorBackends {
    pub resolver: Arc<dyn SourceResolver>,
    pub encoders: EncoderFactory,
}

impl Default for EditorBackends {
    fn default() -> Self {
        Self {
            resolver: Arc::new(FileSourceResolver),
            encoders: ffmpeg_encoder_factory(),
        }
    }
}

impl std::fmt::Debug for EditorBackends {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditorBackends").finish_non_exhaustive()
    }
}

struct EditorState {
    scene: EditorScene,
    deck: MediaDeck,
    audio: AudioGraph,
}

type SharedState = Arc<Mutex<EditorState>>;

/// One mounted editor.
///
/// Lock order is editor state, then surface. The export controller takes
/// its own lock before either, so nothing here calls into it while holding
/// the state lock.
pub struct Editor {
    state: SharedState,
    surface: SharedSurface,
    assets: AssetStore,
    resolver: Arc<dyn SourceResolver>,
    rasterizer: Option<Arc<TextRasterizer>>,
    config: AppConfig,
    render_loop: Option<RenderLoop>,
    export: ExportController,
}

impl std::fmt::Debug for Editor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Editor")
            .field("surface", &self.surface_size())
            .field("font", &self.rasterizer.as_ref().map(|r| r.source().to_path_buf()))
            .field("export", &self.export.state())
            .finish_non_exhaustive()
    }
}

impl Editor {
    /// Mount an editor with the default file resolver and ffmpeg encoder.
    ///
    /// Must be called from inside a tokio runtime.
    pub fn mount(config: AppConfig, assets: AssetStore) -> LumacutResult<Self> {
        Self::mount_with(config, assets, EditorBackends::default())
    }

    /// Mount an editor with explicit backends.
    pub fn mount_with(
        config: AppConfig,
        assets: AssetStore,
        backends: EditorBackends,
    ) -> LumacutResult<Self> {
        if tokio::runtime::Handle::try_current().is_err() {
            return Err(LumacutError::render(
                "The editor must be mounted inside a tokio runtime",
            ));
        }
        let config = config.sanitized();
        let defaults = &config.editor;

        let state: SharedState = Arc::new(Mutex::new(EditorState {
            scene: EditorScene::default(),
            deck: MediaDeck::new(),
            audio: AudioGraph::new(defaults.audio_sample_rate),
        }));
        let surface = Surface::shared(defaults.surface_width, defaults.surface_height);
        let rasterizer = TextRasterizer::load_or_warn(defaults.font_path.as_deref()).map(Arc::new);

        let export = ExportController::new(
            Arc::new(DeckDriver {
                state: state.clone(),
            }),
            surface.clone(),
            assets.clone(),
            backends.encoders,
            ExportSettings::from_config(&config),
        );

        let (width, height) = (defaults.surface_width, defaults.surface_height);
        let tick_state = state.clone();
        let tick_surface = surface.clone();
        let tick_font = rasterizer.clone();
        let render_loop = RenderLoop::spawn(defaults.refresh_hz, move || {
            draw(&tick_state, &tick_surface, tick_font.as_deref(), width, height);
            Ok(())
        });

        tracing::info!(
            width,
            height,
            refresh_hz = defaults.refresh_hz,
            text = rasterizer.is_some(),
            "Editor mounted"
        );

        Ok(Self {
            state,
            surface,
            assets,
            resolver: backends.resolver,
            rasterizer,
            config,
            render_loop: Some(render_loop),
            export,
        })
    }

    pub fn assets(&self) -> &AssetStore {
        &self.assets
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn surface_size(&self) -> (u32, u32) {
        (self.config.editor.surface_width, self.config.editor.surface_height)
    }

    /// Whether text and subtitle layers can be drawn.
    pub fn has_font(&self) -> bool {
        self.rasterizer.is_some()
    }

    /// Make `asset` the primary clip.
    ///
    /// Edit parameters, playback rate, volume, the audio filter and the cue
    /// track all return to their defaults. If the asset cannot be opened the
    /// current primary is left untouched.
    pub fn select_primary(&self, asset: &Asset) -> LumacutResult<()> {
        let source = self.resolver.open(asset)?;

        let mut state = self.lock_state();
        let EditorState { scene, deck, audio } = &mut *state;

        deck.pause();
        deck.primary.bind(source, asset.id.clone());
        deck.seek(0.0);

        scene.params = EditParameters::default();
        scene.cues.clear();
        scene.primary_asset = Some(asset.id.clone());

        deck.set_rate(scene.params.speed);
        deck.set_volume(scene.params.gain());
        audio.set_mode(AudioMode::Flat);
        audio.set_gain(scene.params.gain());
        if let Err(e) = audio.attach(&mut deck.primary) {
            tracing::warn!(error = %e, "Audio graph not attached, audio plays unfiltered");
        }

        tracing::info!(asset = %asset.id, label = %asset.label, "Primary selected");
        Ok(())
    }

    /// Set or clear the picture-in-picture overlay.
    ///
    /// A new overlay joins the primary's rate and position, and starts
    /// playing if the primary is.
    pub fn set_overlay(&self, asset: Option<&Asset>) -> LumacutResult<()> {
        let Some(asset) = asset else {
            let mut state = self.lock_state();
            state.deck.overlay.unbind();
            state.scene.overlay_asset = None;
            tracing::info!("Overlay cleared");
            return Ok(());
        };

        let source = self.resolver.open(asset)?;
        let mut state = self.lock_state();
        let EditorState { scene, deck, .. } = &mut *state;

        deck.overlay.bind(source, asset.id.clone());
        deck.overlay.set_rate(deck.primary.rate());
        deck.overlay.seek(deck.primary.position());
        if deck.primary.is_playing() {
            if let Err(e) = deck.overlay.play() {
                tracing::warn!(error = %e, "Overlay did not start");
            }
        }
        scene.overlay_asset = Some(asset.id.clone());

        tracing::info!(asset = %asset.id, label = %asset.label, "Overlay selected");
        Ok(())
    }

    pub fn set_text(&self, enabled: bool, content: impl Into<String>) {
        let mut state = self.lock_state();
        state.scene.text.enabled = enabled;
        state.scene.text.content = content.into();
    }

    pub fn set_tool(&self, tool: ToolCategory) {
        self.lock_state().scene.tool = tool;
    }

    /// Apply one parameter change and route its playback or audio effect.
    pub fn set_param(&self, change: ParamChange) {
        let mut state = self.lock_state();
        let EditorState { scene, deck, audio } = &mut *state;
        scene.params.apply(change);

        match change {
            ParamChange::Volume(_) => {
                deck.set_volume(scene.params.gain());
                audio.set_gain(scene.params.gain());
            }
            ParamChange::Speed(_) => deck.set_rate(scene.params.speed),
            c if c.affects_audio_mode() => audio.set_mode(scene.params.audio_mode()),
            _ => {}
        }
        tracing::debug!(change = ?change, "Parameter changed");
    }

    pub fn set_overlay_scale(&self, scale: f64) -> Result<(), TransformError> {
        self.lock_state().scene.overlay_transform.set_scale(scale)
    }

    pub fn set_text_scale(&self, scale: f64) -> Result<(), TransformError> {
        self.lock_state().scene.text_transform.set_scale(scale)
    }

    pub fn set_text_rotation(&self, degrees: f64) {
        self.lock_state().scene.text_transform.set_rotation(degrees);
    }

    /// Pointer click at surface pixel `(px, py)`.
    pub fn click(&self, px: f64, py: f64) -> Option<LayerKind> {
        let (width, height) = self.surface_size();
        apply_click(&mut self.lock_state().scene, px, py, width, height)
    }

    pub fn play(&self) -> LumacutResult<()> {
        self.lock_state().deck.play()
    }

    pub fn pause(&self) {
        self.lock_state().deck.pause();
    }

    pub fn seek(&self, time_secs: f64) {
        self.lock_state().deck.seek(time_secs);
    }

    pub fn position(&self) -> f64 {
        self.lock_state().deck.position()
    }

    pub fn is_playing(&self) -> bool {
        self.lock_state().deck.is_playing()
    }

    pub fn playback_rate(&self) -> f64 {
        self.lock_state().deck.primary.rate()
    }

    pub fn primary_volume(&self) -> f64 {
        self.lock_state().deck.primary.volume()
    }

    /// Fill the cue track with placeholder captions across the primary.
    ///
    /// Stills use the configured fallback length. Without a primary nothing
    /// changes and no cues are returned.
    pub fn generate_subtitles(&self) -> Vec<SubtitleCue> {
        let mut state = self.lock_state();
        if !state.deck.primary.has_source() {
            tracing::warn!("Subtitles requested without a primary clip");
            return Vec::new();
        }
        let duration = state
            .deck
            .primary
            .duration()
            .unwrap_or(self.config.editor.fallback_export_secs);
        state.scene.cues = generate_placeholder_cues(duration, PLACEHOLDER_PHRASES, DEFAULT_CUE_SECS);
        let cues = state.scene.cues.cues().to_vec();
        tracing::info!(cues = cues.len(), duration, "Subtitles generated");
        cues
    }

    /// Show `effect` as running for its duration.
    ///
    /// Purely a status indicator: the scene's parameters and the rendered
    /// pixels are unaffected.
    pub fn run_effect(&self, effect: &CosmeticEffect) -> JoinHandle<()> {
        self.lock_state().scene.active_effect = Some(effect.name.clone());
        tracing::info!(effect = %effect.name, "Effect started");

        let state = self.state.clone();
        let effect = effect.clone();
        tokio::spawn(async move {
            tokio::time::sleep(effect.duration).await;
            let mut state = lock(&state);
            if state.scene.active_effect.as_deref() == Some(effect.name.as_str()) {
                state.scene.active_effect = None;
                tracing::info!(effect = %effect.name, "Effect finished");
            }
        })
    }

    /// Record a full play-through of the composition as a new asset.
    pub fn start_export(&self, quality: &str) -> LumacutResult<ExportStart> {
        self.export.start_export(quality)
    }

    pub fn export_state(&self) -> ExportState {
        self.export.state()
    }

    pub fn last_export_error(&self) -> Option<String> {
        self.export.last_error()
    }

    /// Redraw the surface now, outside the render loop's cadence.
    pub fn render_frame(&self) {
        let (width, height) = self.surface_size();
        draw(
            &self.state,
            &self.surface,
            self.rasterizer.as_deref(),
            width,
            height,
        );
    }

    /// Copy of the current surface pixels.
    pub fn snapshot(&self) -> image::RgbaImage {
        lock(&self.surface).snapshot()
    }

    /// Copy of the current scene.
    pub fn scene(&self) -> EditorScene {
        self.lock_state().scene.clone()
    }

    pub fn audio_mode(&self) -> AudioMode {
        self.lock_state().audio.mode()
    }

    pub fn is_audio_attached(&self) -> bool {
        self.lock_state().deck.primary.is_audio_attached()
    }

    /// Run a block of primary audio through the filter and gain.
    pub fn process_audio(&self, block: &mut [f32]) {
        self.lock_state().audio.process(block);
    }

    /// Render ticks run so far. Zero once unmounted.
    pub fn render_ticks(&self) -> u64 {
        self.render_loop.as_ref().map_or(0, RenderLoop::ticks)
    }

    pub fn is_rendering(&self) -> bool {
        self.render_loop.as_ref().is_some_and(RenderLoop::is_running)
    }

    /// Stop rendering, close the audio graph and pause playback.
    ///
    /// An export already recording keeps sampling the last drawn frame.
    pub async fn unmount(&mut self) {
        if let Some(render_loop) = self.render_loop.take() {
            let ticks = render_loop.cancel().await;
            tracing::info!(ticks, "Editor unmounted");
        }
        self.release();
    }

    fn release(&self) {
        let mut state = self.lock_state();
        state.audio.close();
        state.deck.pause();
    }

    fn lock_state(&self) -> MutexGuard<'_, EditorState> {
        lock(&self.state)
    }
}

impl Drop for Editor {
    fn drop(&mut self) {
        self.release();
    }
}

/// One compositor pass over the current scene.
fn draw(
    state: &SharedState,
    surface: &SharedSurface,
    rasterizer: Option<&TextRasterizer>,
    width: u32,
    height: u32,
) {
    let mut state = lock(state);
    let EditorState { scene, deck, .. } = &mut *state;

    deck.resync_overlay();
    let primary = deck.primary.current_frame();
    let overlay = if scene.has_overlay() {
        deck.overlay.current_frame()
    } else {
        None
    };
    let cue = scene
        .cues
        .active_at(deck.position())
        .map(|c| c.text.as_str());

    let inputs = CompositionInputs {
        width,
        height,
        primary: primary.as_deref(),
        overlay: overlay.as_deref(),
        params: &scene.params,
        overlay_transform: &scene.overlay_transform,
        text_transform: &scene.text_transform,
        text: scene.visible_text(),
        cue,
        show_overlay_outline: scene.overlay_selected(),
        rasterizer,
    };
    compose(&mut lock(surface), &inputs);
}

/// Gives the export controller transport control over the deck.
struct DeckDriver {
    state: SharedState,
}

impl PlaybackDriver for DeckDriver {
    fn has_primary(&self) -> bool {
        lock(&self.state).deck.primary.has_source()
    }

    fn primary_duration_secs(&self) -> Option<f64> {
        lock(&self.state).deck.primary.duration()
    }

    fn rewind(&self) {
        let mut state = lock(&self.state);
        state.deck.pause();
        state.deck.seek(0.0);
    }

    fn play_all(&self) -> LumacutResult<()> {
        lock(&self.state).deck.play()
    }

    fn pause_all(&self) {
        lock(&self.state).deck.pause();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

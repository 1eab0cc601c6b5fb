//! Export session management.
//!
//! An export records the live drawing surface in real time while playback
//! runs from the start of the primary clip:
//!
//! ```text
//! Idle ──start_export──► Recording ──duration elapsed──► Finalizing ──► Idle
//!   ▲                        │
//!   └──── play failed ───────┘
//! ```

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use lumacut_common::clock::{secs_to_duration, FramePacing};
use lumacut_common::config::AppConfig;
use lumacut_common::error::{LumacutError, LumacutResult};
use lumacut_project_model::{Asset, AssetKind, AssetStore};
use lumacut_render_engine::SharedSurface;

use crate::encoder::{ContainerFormat, EncoderFactory, FrameEncoder};

/// State of the export pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportState {
    /// No export running.
    Idle,
    /// Sampling the surface into the encoder.
    Recording,
    /// Encoder stopped, output being written.
    Finalizing,
}

/// Playback control the export pipeline needs from the editor.
pub trait PlaybackDriver: Send + Sync {
    /// Whether a primary clip is selected.
    fn has_primary(&self) -> bool;

    /// Duration of the primary clip. `None` for stills.
    fn primary_duration_secs(&self) -> Option<f64>;

    /// Pause both elements and seek them to zero.
    fn rewind(&self);

    /// Start the primary and overlay.
    fn play_all(&self) -> LumacutResult<()>;

    /// Pause both elements.
    fn pause_all(&self);
}

/// Export parameters.
#[derive(Debug, Clone)]
pub struct ExportSettings {
    /// Frame rate at which the surface is sampled.
    pub capture_fps: u32,

    /// Export length when the primary has no duration.
    pub fallback_secs: f64,

    /// Directory the exported file is written to.
    pub exports_dir: PathBuf,
}

impl ExportSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            capture_fps: config.editor.capture_fps,
            fallback_secs: config.editor.fallback_export_secs,
            exports_dir: config.exports_dir.clone(),
        }
    }
}

/// Export progress report.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExportProgress {
    /// Frames handed to the encoder so far.
    pub frames_captured: u64,

    /// Seconds since recording started.
    pub elapsed_secs: f64,

    /// Planned length of the export.
    pub duration_secs: f64,
}

impl ExportProgress {
    /// Progress in `[0, 1]`.
    pub fn fraction(&self) -> f64 {
        if self.duration_secs <= 0.0 {
            return 0.0;
        }
        (self.elapsed_secs / self.duration_secs).clamp(0.0, 1.0)
    }
}

/// Why a start request did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// An export is already recording or finalizing.
    Busy,
    /// No primary clip is selected.
    NoPrimary,
}

/// Outcome of [`ExportController::start_export`].
#[derive(Debug)]
pub enum ExportStart {
    Started(ExportHandle),
    Ignored(IgnoreReason),
}

impl ExportStart {
    pub fn is_started(&self) -> bool {
        matches!(self, ExportStart::Started(_))
    }

    pub fn into_handle(self) -> Option<ExportHandle> {
        match self {
            ExportStart::Started(handle) => Some(handle),
            ExportStart::Ignored(_) => None,
        }
    }
}

/// Handle to a running export.
#[derive(Debug)]
pub struct ExportHandle {
    task: JoinHandle<LumacutResult<Asset>>,
    progress: watch::Receiver<ExportProgress>,
}

impl ExportHandle {
    /// Latest progress report.
    pub fn progress(&self) -> ExportProgress {
        self.progress.borrow().clone()
    }

    /// Whether recording and finalizing are both over.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the export to finish and return the new asset.
    pub async fn wait(self) -> LumacutResult<Asset> {
        self.task
            .await
            .map_err(|e| LumacutError::export(format!("Export task failed: {e}")))?
    }
}

/// Drives the Idle → Recording → Finalizing → Idle state machine.
#[derive(Clone)]
pub struct ExportController {
    state: Arc<Mutex<ExportState>>,
    last_error: Arc<Mutex<Option<String>>>,
    driver: Arc<dyn PlaybackDriver>,
    surface: SharedSurface,
    assets: AssetStore,
    encoders: EncoderFactory,
    settings: ExportSettings,
}

impl ExportController {
    pub fn new(
        driver: Arc<dyn PlaybackDriver>,
        surface: SharedSurface,
        assets: AssetStore,
        encoders: EncoderFactory,
        settings: ExportSettings,
    ) -> Self {
        Self {
            state: Arc::new(Mutex::new(ExportState::Idle)),
            last_error: Arc::new(Mutex::new(None)),
            driver,
            surface,
            assets,
            encoders,
            settings,
        }
    }

    /// Current pipeline state.
    pub fn state(&self) -> ExportState {
        *lock(&self.state)
    }

    /// Message of the most recent failed export, if any.
    pub fn last_error(&self) -> Option<String> {
        lock(&self.last_error).clone()
    }

    /// Start an export tagged with `quality`.
    ///
    /// Does nothing while another export is running or when no primary
    /// clip is selected. Playback is rewound and the encoder started before
    /// play begins; if play fails the encoder is discarded and the state
    /// returns to Idle with an error.
    pub fn start_export(&self, quality: &str) -> LumacutResult<ExportStart> {
        let mut encoder = {
            let mut state = lock(&self.state);
            if *state != ExportState::Idle {
                tracing::info!(state = ?*state, quality, "Export already in progress, ignoring");
                return Ok(ExportStart::Ignored(IgnoreReason::Busy));
            }
            if !self.driver.has_primary() {
                tracing::warn!(quality, "Export requested without a primary clip");
                return Ok(ExportStart::Ignored(IgnoreReason::NoPrimary));
            }

            self.driver.rewind();

            let (width, height) = lock(&self.surface).dimensions();
            let mut encoder = (self.encoders)();
            encoder
                .start(width, height, self.settings.capture_fps)
                .map_err(|e| self.record_failure(e))?;

            *state = ExportState::Recording;
            encoder
        };

        if let Err(e) = self.driver.play_all() {
            encoder.abort();
            self.set_state(ExportState::Idle);
            return Err(self.record_failure(LumacutError::export(format!(
                "Playback failed to start: {}",
                e.user_message()
            ))));
        }

        let duration_secs = self
            .driver
            .primary_duration_secs()
            .filter(|d| d.is_finite() && *d > 0.0)
            .unwrap_or(self.settings.fallback_secs);

        tracing::info!(
            quality,
            duration_secs,
            fps = self.settings.capture_fps,
            "Export recording started"
        );

        let (progress_tx, progress_rx) = watch::channel(ExportProgress {
            frames_captured: 0,
            elapsed_secs: 0.0,
            duration_secs,
        });
        let controller = self.clone();
        let quality = quality.to_string();
        let task = tokio::spawn(async move {
            controller
                .run_capture(encoder, duration_secs, quality, progress_tx)
                .await
        });

        Ok(ExportStart::Started(ExportHandle {
            task,
            progress: progress_rx,
        }))
    }

    async fn run_capture(
        self,
        mut encoder: Box<dyn FrameEncoder>,
        duration_secs: f64,
        quality: String,
        progress: watch::Sender<ExportProgress>,
    ) -> LumacutResult<Asset> {
        let pacing = FramePacing::new(self.settings.capture_fps);
        let mut interval = tokio::time::interval(pacing.interval());
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let stop = tokio::time::sleep(secs_to_duration(duration_secs));
        tokio::pin!(stop);

        let started = Instant::now();
        let mut chunks: Vec<Vec<u8>> = Vec::new();
        let mut frames: u64 = 0;
        let mut capture_error = None;

        loop {
            tokio::select! {
                biased;
                _ = &mut stop => break,
                _ = interval.tick() => {
                    let frame = lock(&self.surface).snapshot();
                    if let Err(e) = encoder.encode(&frame) {
                        capture_error = Some(e);
                        break;
                    }
                    chunks.extend(encoder.take_chunks());
                    frames += 1;
                    progress.send_replace(ExportProgress {
                        frames_captured: frames,
                        elapsed_secs: started.elapsed().as_secs_f64(),
                        duration_secs,
                    });
                }
            }
        }

        self.set_state(ExportState::Finalizing);
        tracing::info!(frames, "Export recording stopped, finalizing");

        let result = match capture_error {
            Some(e) => {
                encoder.abort();
                Err(e)
            }
            None => self.finalize(encoder.as_mut(), chunks, &quality),
        };

        self.driver.pause_all();
        self.set_state(ExportState::Idle);

        match result {
            Ok(asset) => {
                tracing::info!(asset = %asset.id, path = %asset.source, "Export complete");
                Ok(asset)
            }
            Err(e) => {
                tracing::error!(error = %e, "Export failed");
                Err(self.record_failure(e))
            }
        }
    }

    fn finalize(
        &self,
        encoder: &mut dyn FrameEncoder,
        mut chunks: Vec<Vec<u8>>,
        quality: &str,
    ) -> LumacutResult<Asset> {
        chunks.extend(encoder.finish()?);
        if chunks.iter().all(|c| c.is_empty()) {
            return Err(LumacutError::export("Encoder produced no data"));
        }

        std::fs::create_dir_all(&self.settings.exports_dir)?;
        let path = self
            .settings
            .exports_dir
            .join(export_file_name(quality, encoder.container()));
        std::fs::write(&path, chunks.concat())?;

        let asset = Asset::new(
            AssetKind::Video,
            path.to_string_lossy(),
            format!("Export {quality}"),
        );
        self.assets.append(asset.clone());
        Ok(asset)
    }

    fn set_state(&self, next: ExportState) {
        *lock(&self.state) = next;
    }

    fn record_failure(&self, err: LumacutError) -> LumacutError {
        *lock(&self.last_error) = Some(err.user_message());
        err
    }
}

/// `lumacut-export-<timestamp>-<quality>.<ext>`, with the quality tag
/// reduced to filename-safe characters.
pub fn export_file_name(quality: &str, container: ContainerFormat) -> String {
    let timestamp = chrono::Local::now().format("%Y%m%d-%H%M%S%3f");
    let tag: String = quality
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("lumacut-export-{timestamp}-{tag}.{}", container.extension())
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_file_name() {
        let name = export_file_name("1080p", ContainerFormat::WebM);
        assert!(name.starts_with("lumacut-export-"));
        assert!(name.ends_with("-1080p.webm"));

        let odd = export_file_name("4k/hdr", ContainerFormat::Mp4);
        assert!(odd.ends_with("-4k_hdr.mp4"));
    }

    #[test]
    fn test_progress_fraction() {
        let progress = ExportProgress {
            frames_captured: 30,
            elapsed_secs: 3.0,
            duration_secs: 12.0,
        };
        assert!((progress.fraction() - 0.25).abs() < 1e-9);
        assert_eq!(ExportProgress::default().fraction(), 0.0);
    }
}

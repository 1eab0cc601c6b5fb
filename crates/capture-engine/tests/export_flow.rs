use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use image::RgbaImage;

use lumacut_capture_engine::{
    ContainerFormat, EncoderFactory, EncoderStats, ExportController, ExportSettings, ExportStart,
    ExportState, FrameEncoder, IgnoreReason, PlaybackDriver,
};
use lumacut_common::error::{LumacutError, LumacutResult};
use lumacut_project_model::{AssetKind, AssetStore};
use lumacut_render_engine::Surface;

type Log = Arc<Mutex<Vec<String>>>;

fn push(log: &Log, entry: impl Into<String>) {
    log.lock().unwrap().push(entry.into());
}

struct FakeDriver {
    log: Log,
    has_primary: bool,
    duration: Option<f64>,
    fail_play: bool,
}

impl PlaybackDriver for FakeDriver {
    fn has_primary(&self) -> bool {
        self.has_primary
    }

    fn primary_duration_secs(&self) -> Option<f64> {
        self.duration
    }

    fn rewind(&self) {
        push(&self.log, "pause");
        push(&self.log, "seek:0");
    }

    fn play_all(&self) -> LumacutResult<()> {
        if self.fail_play {
            return Err(LumacutError::media("autoplay blocked"));
        }
        push(&self.log, "play");
        Ok(())
    }

    fn pause_all(&self) {
        push(&self.log, "pause");
    }
}

struct FakeEncoder {
    log: Log,
    fail_finish: bool,
    pending: Vec<Vec<u8>>,
    stats: EncoderStats,
}

impl FrameEncoder for FakeEncoder {
    fn start(&mut self, width: u32, height: u32, fps: u32) -> LumacutResult<()> {
        push(&self.log, format!("encoder_start:{width}x{height}@{fps}"));
        Ok(())
    }

    fn encode(&mut self, frame: &RgbaImage) -> LumacutResult<()> {
        self.pending.push(frame.as_raw()[..4].to_vec());
        self.stats.frames_encoded += 1;
        Ok(())
    }

    fn take_chunks(&mut self) -> Vec<Vec<u8>> {
        std::mem::take(&mut self.pending)
    }

    fn finish(&mut self) -> LumacutResult<Vec<Vec<u8>>> {
        if self.fail_finish {
            return Err(LumacutError::export("muxer crashed"));
        }
        push(&self.log, "encoder_finish");
        Ok(vec![b"tail".to_vec()])
    }

    fn abort(&mut self) {
        push(&self.log, "encoder_abort");
    }

    fn container(&self) -> ContainerFormat {
        ContainerFormat::WebM
    }

    fn stats(&self) -> EncoderStats {
        self.stats.clone()
    }
}

struct Harness {
    controller: ExportController,
    log: Log,
    assets: AssetStore,
    encoders_created: Arc<AtomicUsize>,
}

struct Setup {
    has_primary: bool,
    duration: Option<f64>,
    fail_play: bool,
    fail_finish: bool,
}

impl Default for Setup {
    fn default() -> Self {
        Self {
            has_primary: true,
            duration: Some(12.0),
            fail_play: false,
            fail_finish: false,
        }
    }
}

fn harness(setup: Setup, exports_dir: &Path) -> Harness {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let assets = AssetStore::new();
    let encoders_created = Arc::new(AtomicUsize::new(0));

    let driver = Arc::new(FakeDriver {
        log: log.clone(),
        has_primary: setup.has_primary,
        duration: setup.duration,
        fail_play: setup.fail_play,
    });

    let factory_log = log.clone();
    let counter = encoders_created.clone();
    let fail_finish = setup.fail_finish;
    let encoders: EncoderFactory = Arc::new(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        Box::new(FakeEncoder {
            log: factory_log.clone(),
            fail_finish,
            pending: Vec::new(),
            stats: EncoderStats::default(),
        }) as Box<dyn FrameEncoder>
    });

    let controller = ExportController::new(
        driver,
        Surface::shared(32, 18),
        assets.clone(),
        encoders,
        ExportSettings {
            capture_fps: 30,
            fallback_secs: 2.0,
            exports_dir: exports_dir.to_path_buf(),
        },
    );

    Harness {
        controller,
        log,
        assets,
        encoders_created,
    }
}

fn entries(log: &Log) -> Vec<String> {
    log.lock().unwrap().clone()
}

#[tokio::test(start_paused = true)]
async fn test_export_of_twelve_second_clip() {
    let dir = tempfile::tempdir().unwrap();
    let h = harness(Setup::default(), dir.path());

    let started = tokio::time::Instant::now();
    let handle = h
        .controller
        .start_export("1080p")
        .unwrap()
        .into_handle()
        .expect("export should start");

    assert_eq!(h.controller.state(), ExportState::Recording);
    assert_eq!(
        entries(&h.log),
        vec!["pause", "seek:0", "encoder_start:32x18@30", "play"]
    );

    let asset = handle.wait().await.unwrap();
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(12), "finished after {elapsed:?}");
    assert!(elapsed < Duration::from_millis(12_100), "finished after {elapsed:?}");

    assert_eq!(asset.kind, AssetKind::Video);
    assert!(asset.label.contains("1080p"));
    assert_eq!(h.assets.list().first(), Some(&asset));
    assert_eq!(h.controller.state(), ExportState::Idle);
    assert!(h.controller.last_error().is_none());

    let path = asset.local_path().unwrap();
    assert!(path.starts_with(dir.path()));
    assert!(path.file_name().unwrap().to_string_lossy().ends_with("-1080p.webm"));
    let bytes = std::fs::read(&path).unwrap();
    assert!(bytes.ends_with(b"tail"));
    // 4 bytes per sampled frame plus the tail.
    assert!(bytes.len() >= 360 * 4);

    let log = entries(&h.log);
    assert_eq!(log[log.len() - 2..], ["encoder_finish", "pause"]);
}

#[tokio::test(start_paused = true)]
async fn test_export_without_primary_is_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let h = harness(
        Setup {
            has_primary: false,
            ..Setup::default()
        },
        dir.path(),
    );

    let outcome = h.controller.start_export("4k").unwrap();
    assert!(matches!(
        outcome,
        ExportStart::Ignored(IgnoreReason::NoPrimary)
    ));
    assert_eq!(h.controller.state(), ExportState::Idle);
    assert!(h.assets.is_empty());
    assert_eq!(h.encoders_created.load(Ordering::SeqCst), 0);
    assert!(entries(&h.log).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_second_start_while_recording_is_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let h = harness(Setup::default(), dir.path());

    let handle = h.controller.start_export("720p").unwrap().into_handle().unwrap();
    let second = h.controller.start_export("720p").unwrap();
    assert!(matches!(second, ExportStart::Ignored(IgnoreReason::Busy)));
    assert_eq!(h.encoders_created.load(Ordering::SeqCst), 1);

    handle.wait().await.unwrap();
    assert_eq!(h.assets.len(), 1);

    // Back to Idle, so a new export is accepted.
    assert!(h.controller.start_export("720p").unwrap().is_started());
    assert_eq!(h.encoders_created.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_play_failure_aborts_to_idle() {
    let dir = tempfile::tempdir().unwrap();
    let h = harness(
        Setup {
            fail_play: true,
            ..Setup::default()
        },
        dir.path(),
    );

    let err = h.controller.start_export("1080p").unwrap_err();
    assert!(matches!(err, LumacutError::Export { .. }));
    assert!(err.user_message().contains("autoplay blocked"));
    assert_eq!(h.controller.state(), ExportState::Idle);
    assert!(entries(&h.log).contains(&"encoder_abort".to_string()));
    assert!(h.controller.last_error().is_some());
    assert!(h.assets.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_still_primary_uses_fallback_duration() {
    let dir = tempfile::tempdir().unwrap();
    let h = harness(
        Setup {
            duration: None,
            ..Setup::default()
        },
        dir.path(),
    );

    let started = tokio::time::Instant::now();
    let handle = h.controller.start_export("720p").unwrap().into_handle().unwrap();
    handle.wait().await.unwrap();
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(2));
    assert!(elapsed < Duration::from_millis(2_100));
}

#[tokio::test(start_paused = true)]
async fn test_finalize_failure_still_returns_to_idle() {
    let dir = tempfile::tempdir().unwrap();
    let h = harness(
        Setup {
            duration: Some(1.0),
            fail_finish: true,
            ..Setup::default()
        },
        dir.path(),
    );

    let handle = h.controller.start_export("1080p").unwrap().into_handle().unwrap();
    let err = handle.wait().await.unwrap_err();
    assert!(err.user_message().contains("muxer crashed"));
    assert_eq!(h.controller.state(), ExportState::Idle);
    assert_eq!(h.controller.last_error().as_deref(), Some("muxer crashed"));
    assert!(h.assets.is_empty());
    assert_eq!(entries(&h.log).last().map(String::as_str), Some("pause"));
}

#[tokio::test(start_paused = true)]
async fn test_progress_reports_frames() {
    let dir = tempfile::tempdir().unwrap();
    let h = harness(
        Setup {
            duration: Some(1.0),
            ..Setup::default()
        },
        dir.path(),
    );

    let handle = h.controller.start_export("1080p").unwrap().into_handle().unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;
    let progress = handle.progress();
    assert!(progress.frames_captured >= 15);
    assert_eq!(progress.duration_secs, 1.0);
    assert!(progress.fraction() > 0.4 && progress.fraction() < 0.6);
    handle.wait().await.unwrap();
}

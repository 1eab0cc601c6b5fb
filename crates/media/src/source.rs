//! Decodable media sources.
//!
//! Stills are decoded once with the `image` crate. Videos are probed with
//! `ffprobe` and individual frames are extracted with `ffmpeg` on demand,
//! cached by frame index.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;

use base64::Engine as _;
use image::RgbaImage;
use serde::Deserialize;

use lumacut_common::clock::FramePacing;
use lumacut_common::error::{LumacutError, LumacutResult};
use lumacut_project_model::AssetKind;

/// A decoded RGBA frame shared between the binding cache and the compositor.
pub type Frame = Arc<RgbaImage>;

/// Trait for something that can produce frames at a playback position.
pub trait MediaSource: Send {
    /// Image or video.
    fn kind(&self) -> AssetKind;

    /// Total duration in seconds. `None` for stills.
    fn duration_secs(&self) -> Option<f64>;

    /// Native frame size in pixels.
    fn dimensions(&self) -> (u32, u32);

    /// Frame displayed at `time_secs`.
    ///
    /// `Ok(None)` means no frame is ready yet; `Err` means the source cannot
    /// be decoded.
    fn frame_at(&mut self, time_secs: f64) -> LumacutResult<Option<Frame>>;

    /// Short description for logs.
    fn name(&self) -> &str;
}

/// A still image decoded up front.
pub struct StillImageSource {
    name: String,
    frame: Frame,
}

impl StillImageSource {
    /// Decode an image file.
    pub fn open(path: impl AsRef<Path>) -> LumacutResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(LumacutError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let image = image::open(path).map_err(|e| {
            LumacutError::media(format!("Failed to decode image {}: {e}", path.display()))
        })?;
        Ok(Self::from_image(path.display().to_string(), image.to_rgba8()))
    }

    /// Decode a `data:<mime>;base64,<payload>` URL.
    pub fn from_data_url(url: &str) -> LumacutResult<Self> {
        let bytes = decode_data_url(url)?;
        let image = image::load_from_memory(&bytes)
            .map_err(|e| LumacutError::media(format!("Failed to decode inline image: {e}")))?;
        Ok(Self::from_image("inline image", image.to_rgba8()))
    }

    /// Wrap an already decoded frame.
    pub fn from_image(name: impl Into<String>, image: RgbaImage) -> Self {
        Self {
            name: name.into(),
            frame: Arc::new(image),
        }
    }
}

impl MediaSource for StillImageSource {
    fn kind(&self) -> AssetKind {
        AssetKind::Image
    }

    fn duration_secs(&self) -> Option<f64> {
        None
    }

    fn dimensions(&self) -> (u32, u32) {
        self.frame.dimensions()
    }

    fn frame_at(&mut self, _time_secs: f64) -> LumacutResult<Option<Frame>> {
        Ok(Some(self.frame.clone()))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Stream metadata reported by `ffprobe`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub duration_secs: f64,
}

/// A video file decoded frame-by-frame through `ffmpeg`.
pub struct FfmpegVideoSource {
    path: PathBuf,
    name: String,
    info: VideoInfo,
    cache: Option<(u64, Frame)>,
}

impl FfmpegVideoSource {
    /// Probe a video file. Fails if the file is missing or has no video stream.
    pub fn open(path: impl AsRef<Path>) -> LumacutResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(LumacutError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let info = probe_video(path)?;
        tracing::debug!(
            path = %path.display(),
            width = info.width,
            height = info.height,
            fps = info.fps,
            duration_secs = info.duration_secs,
            "Probed video source"
        );
        Ok(Self {
            path: path.to_path_buf(),
            name: path.display().to_string(),
            info,
            cache: None,
        })
    }

    pub fn info(&self) -> VideoInfo {
        self.info
    }
}

impl MediaSource for FfmpegVideoSource {
    fn kind(&self) -> AssetKind {
        AssetKind::Video
    }

    fn duration_secs(&self) -> Option<f64> {
        Some(self.info.duration_secs)
    }

    fn dimensions(&self) -> (u32, u32) {
        (self.info.width, self.info.height)
    }

    fn frame_at(&mut self, time_secs: f64) -> LumacutResult<Option<Frame>> {
        let pacing = FramePacing::new(self.info.fps);
        let last_index = pacing.frames_in(self.info.duration_secs).saturating_sub(1);
        let index = pacing.frame_index_at(time_secs).min(last_index);

        if let Some((cached_index, frame)) = &self.cache {
            if *cached_index == index {
                return Ok(Some(frame.clone()));
            }
        }

        let frame = Arc::new(extract_frame(
            &self.path,
            pacing.frame_start_secs(index),
            self.info.width,
            self.info.height,
        )?);
        self.cache = Some((index, frame.clone()));
        Ok(Some(frame))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

/// Read size, frame rate, and duration of the first video stream.
pub fn probe_video(path: &Path) -> LumacutResult<VideoInfo> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=width,height,r_frame_rate:format=duration",
            "-of",
            "json",
        ])
        .arg(path)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .map_err(|e| LumacutError::media(format!("Failed to start ffprobe: {e}")))?;

    if !output.status.success() {
        return Err(LumacutError::media(format!(
            "ffprobe failed for {}: {}",
            path.display(),
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    parse_probe_output(&output.stdout)
        .map_err(|e| LumacutError::media(format!("{}: {e}", path.display())))
}

fn parse_probe_output(raw: &[u8]) -> Result<VideoInfo, String> {
    let probe: ProbeOutput =
        serde_json::from_slice(raw).map_err(|e| format!("unreadable ffprobe output: {e}"))?;
    let stream = probe
        .streams
        .first()
        .ok_or_else(|| "no video stream".to_string())?;

    let width = stream.width.filter(|w| *w > 0).ok_or("missing width")?;
    let height = stream.height.filter(|h| *h > 0).ok_or("missing height")?;
    let fps = stream
        .r_frame_rate
        .as_deref()
        .and_then(parse_frame_rate)
        .unwrap_or(30);
    let duration_secs = probe
        .format
        .and_then(|f| f.duration)
        .and_then(|d| d.trim().parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d > 0.0)
        .ok_or("missing duration")?;

    Ok(VideoInfo {
        width,
        height,
        fps,
        duration_secs,
    })
}

/// Parse an ffprobe rational such as `30000/1001` into whole frames per second.
fn parse_frame_rate(raw: &str) -> Option<u32> {
    let (num, den) = raw.split_once('/').unwrap_or((raw, "1"));
    let num = num.trim().parse::<f64>().ok()?;
    let den = den.trim().parse::<f64>().ok()?;
    if den <= 0.0 || num <= 0.0 {
        return None;
    }
    Some((num / den).round().max(1.0) as u32)
}

fn extract_frame(path: &Path, time_secs: f64, width: u32, height: u32) -> LumacutResult<RgbaImage> {
    let output = Command::new("ffmpeg")
        .args(["-v", "error", "-ss", &format!("{time_secs:.3}"), "-i"])
        .arg(path)
        .args(["-frames:v", "1", "-f", "rawvideo", "-pix_fmt", "rgba"])
        .args(["-s", &format!("{width}x{height}"), "-"])
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .map_err(|e| LumacutError::media(format!("Failed to start ffmpeg: {e}")))?;

    if !output.status.success() {
        return Err(LumacutError::media(format!(
            "ffmpeg frame extraction failed at {time_secs:.3}s: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    let expected = width as usize * height as usize * 4;
    if output.stdout.len() < expected {
        return Err(LumacutError::media(format!(
            "ffmpeg returned {} bytes, expected {expected}",
            output.stdout.len()
        )));
    }

    let mut bytes = output.stdout;
    bytes.truncate(expected);
    RgbaImage::from_raw(width, height, bytes)
        .ok_or_else(|| LumacutError::media("Frame buffer size mismatch"))
}

/// Decode the payload of a base64 `data:` URL.
pub fn decode_data_url(url: &str) -> LumacutResult<Vec<u8>> {
    let rest = url
        .strip_prefix("data:")
        .ok_or_else(|| LumacutError::media("Not a data URL"))?;
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| LumacutError::media("Malformed data URL"))?;
    if !meta.ends_with(";base64") {
        return Err(LumacutError::unsupported(
            "Only base64-encoded data URLs are supported",
        ));
    }
    base64::engine::general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|e| LumacutError::media(format!("Invalid base64 payload: {e}")))
}

/// Check whether a binary is on `PATH`.
pub fn command_exists(binary: &str) -> bool {
    Command::new("sh")
        .arg("-c")
        .arg(format!("command -v {binary} >/dev/null 2>&1"))
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

//! Frame encoders used by the export pipeline.

use std::io::{Read, Write};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use image::RgbaImage;

use lumacut_common::error::{LumacutError, LumacutResult};

/// Size of one read from the encoder's output pipe.
const CHUNK_SIZE: usize = 64 * 1024;

/// Output container of an encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerFormat {
    WebM,
    Mp4,
}

impl ContainerFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ContainerFormat::WebM => "webm",
            ContainerFormat::Mp4 => "mp4",
        }
    }

    pub fn mime(&self) -> &'static str {
        match self {
            ContainerFormat::WebM => "video/webm",
            ContainerFormat::Mp4 => "video/mp4",
        }
    }
}

/// Trait for something that turns surface frames into an encoded stream.
///
/// Encoded bytes become available as chunks while frames are fed in; the
/// export controller collects them with [`FrameEncoder::take_chunks`] and
/// gets the tail from [`FrameEncoder::finish`].
pub trait FrameEncoder: Send {
    /// Start an encode at the given frame size and rate.
    fn start(&mut self, width: u32, height: u32, fps: u32) -> LumacutResult<()>;

    /// Feed one frame. Its size must match the size given to `start`.
    fn encode(&mut self, frame: &RgbaImage) -> LumacutResult<()>;

    /// Chunks emitted since the previous call.
    fn take_chunks(&mut self) -> Vec<Vec<u8>>;

    /// Flush the encoder and return any remaining chunks.
    fn finish(&mut self) -> LumacutResult<Vec<Vec<u8>>>;

    /// Stop immediately and discard output.
    fn abort(&mut self);

    /// Container the chunks assemble into.
    fn container(&self) -> ContainerFormat;

    /// Encoder statistics.
    fn stats(&self) -> EncoderStats;
}

/// Runtime statistics from an encoder.
#[derive(Debug, Clone, Default)]
pub struct EncoderStats {
    /// Frames accepted.
    pub frames_encoded: u64,

    /// Encoded bytes handed out so far.
    pub bytes_emitted: u64,
}

/// Creates a fresh encoder for each export.
pub type EncoderFactory = Arc<dyn Fn() -> Box<dyn FrameEncoder> + Send + Sync>;

/// The default factory: VP8 in WebM through `ffmpeg`.
pub fn ffmpeg_encoder_factory() -> EncoderFactory {
    Arc::new(|| Box::new(FfmpegEncoder::new()) as Box<dyn FrameEncoder>)
}

/// Encoder that pipes raw RGBA frames into an `ffmpeg` child process and
/// reads the WebM stream from its stdout.
pub struct FfmpegEncoder {
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    chunks: Arc<Mutex<Vec<Vec<u8>>>>,
    reader: Option<JoinHandle<std::io::Result<()>>>,
    stderr: Option<JoinHandle<String>>,
    size: (u32, u32),
    stats: EncoderStats,
}

impl Default for FfmpegEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FfmpegEncoder {
    pub fn new() -> Self {
        Self {
            child: None,
            stdin: None,
            chunks: Arc::new(Mutex::new(Vec::new())),
            reader: None,
            stderr: None,
            size: (0, 0),
            stats: EncoderStats::default(),
        }
    }

    fn drain_chunks(&mut self) -> Vec<Vec<u8>> {
        let drained = match self.chunks.lock() {
            Ok(mut chunks) => std::mem::take(&mut *chunks),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        };
        self.stats.bytes_emitted += drained.iter().map(|c| c.len() as u64).sum::<u64>();
        drained
    }

    fn join_stderr(&mut self) -> String {
        self.stderr
            .take()
            .map(|h| {
                h.join()
                    .unwrap_or_else(|_| "<failed to join stderr reader>".to_string())
            })
            .unwrap_or_default()
    }
}

impl FrameEncoder for FfmpegEncoder {
    fn start(&mut self, width: u32, height: u32, fps: u32) -> LumacutResult<()> {
        if self.child.is_some() {
            return Err(LumacutError::export("Encoder already started"));
        }

        let mut child = Command::new("ffmpeg")
            .args(["-hide_banner", "-loglevel", "error"])
            .args(["-f", "rawvideo", "-pix_fmt", "rgba"])
            .args(["-s", &format!("{width}x{height}")])
            .args(["-r", &fps.max(1).to_string()])
            .args(["-i", "-"])
            .args(["-c:v", "libvpx", "-b:v", "4M", "-deadline", "realtime"])
            .args(["-cpu-used", "8", "-pix_fmt", "yuv420p"])
            .args(["-f", "webm", "-"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| LumacutError::export(format!("Failed to start ffmpeg: {e}")))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| LumacutError::export("Failed to open ffmpeg stdin"))?;
        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| LumacutError::export("Failed to capture ffmpeg stdout"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| LumacutError::export("Failed to capture ffmpeg stderr"))?;

        let chunks = self.chunks.clone();
        let reader = std::thread::spawn(move || -> std::io::Result<()> {
            let mut buf = vec![0u8; CHUNK_SIZE];
            loop {
                let n = stdout.read(&mut buf)?;
                if n == 0 {
                    return Ok(());
                }
                match chunks.lock() {
                    Ok(mut chunks) => chunks.push(buf[..n].to_vec()),
                    Err(poisoned) => poisoned.into_inner().push(buf[..n].to_vec()),
                }
            }
        });

        // Drain stderr concurrently so ffmpeg never blocks on a full pipe.
        let stderr_task = std::thread::spawn(move || -> String {
            let mut out = String::new();
            let mut stderr = stderr;
            match stderr.read_to_string(&mut out) {
                Ok(_) => out,
                Err(err) => format!("<failed to read ffmpeg stderr: {err}>"),
            }
        });

        tracing::debug!(width, height, fps, "ffmpeg encoder started");
        self.child = Some(child);
        self.stdin = Some(stdin);
        self.reader = Some(reader);
        self.stderr = Some(stderr_task);
        self.size = (width, height);
        self.stats = EncoderStats::default();
        Ok(())
    }

    fn encode(&mut self, frame: &RgbaImage) -> LumacutResult<()> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| LumacutError::export("Encoder is not running"))?;
        if frame.dimensions() != self.size {
            return Err(LumacutError::export(format!(
                "Frame is {}x{}, encoder expects {}x{}",
                frame.width(),
                frame.height(),
                self.size.0,
                self.size.1
            )));
        }
        stdin
            .write_all(frame.as_raw())
            .map_err(|e| LumacutError::export(format!("ffmpeg rejected a frame: {e}")))?;
        self.stats.frames_encoded += 1;
        Ok(())
    }

    fn take_chunks(&mut self) -> Vec<Vec<u8>> {
        self.drain_chunks()
    }

    fn finish(&mut self) -> LumacutResult<Vec<Vec<u8>>> {
        // Closing stdin signals end of input.
        drop(self.stdin.take());
        let mut child = self
            .child
            .take()
            .ok_or_else(|| LumacutError::export("Encoder is not running"))?;
        let status = child
            .wait()
            .map_err(|e| LumacutError::export(format!("Failed to wait for ffmpeg: {e}")))?;

        if let Some(reader) = self.reader.take() {
            match reader.join() {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::warn!(error = %e, "ffmpeg output read failed"),
                Err(_) => tracing::warn!("ffmpeg output reader panicked"),
            }
        }
        let stderr_output = self.join_stderr();

        if !status.success() {
            return Err(LumacutError::export(format!(
                "ffmpeg exited with {status}: {}",
                stderr_output.trim()
            )));
        }

        tracing::debug!(frames = self.stats.frames_encoded, "ffmpeg encoder finished");
        Ok(self.drain_chunks())
    }

    fn abort(&mut self) {
        drop(self.stdin.take());
        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.kill() {
                tracing::debug!(error = %e, "ffmpeg already exited");
            }
            let _ = child.wait();
        }
        if let Some(reader) = self.reader.take() {
            let _ = reader.join();
        }
        let _ = self.join_stderr();
        let _ = self.drain_chunks();
        tracing::debug!("ffmpeg encoder aborted");
    }

    fn container(&self) -> ContainerFormat {
        ContainerFormat::WebM
    }

    fn stats(&self) -> EncoderStats {
        self.stats.clone()
    }
}

impl Drop for FfmpegEncoder {
    fn drop(&mut self) {
        if self.child.is_some() {
            self.abort();
        }
    }
}
